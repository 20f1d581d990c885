//! Engine configuration.

use std::time::Duration;

use canopy_formula::FormulaConfig;

/// Tunables for one evaluation run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Aggregate-function allow-list handed to the formula parser.
    pub formula: FormulaConfig,
    /// Wall-clock ceiling per formula/instance evaluation.
    pub eval_timeout: Duration,
    /// Evaluate a level's instances across the thread pool.
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            formula: FormulaConfig::default(),
            eval_timeout: Duration::from_secs(5),
            parallel: true,
        }
    }
}
