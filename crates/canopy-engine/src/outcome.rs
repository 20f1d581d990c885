//! Per-instance results and the run report.

use canopy_tree::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// Result of one formula×instance evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormulaOutcome {
    /// Coded output path of the formula.
    pub output_path: String,
    pub instance_id: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success { value: Value },
    Error { message: String },
}

impl FormulaOutcome {
    pub fn success(output_path: &str, instance_id: &str, value: Value) -> Self {
        Self {
            output_path: output_path.to_string(),
            instance_id: instance_id.to_string(),
            status: OutcomeStatus::Success { value },
        }
    }

    pub fn error(output_path: &str, instance_id: &str, message: impl Into<String>) -> Self {
        Self {
            output_path: output_path.to_string(),
            instance_id: instance_id.to_string(),
            status: OutcomeStatus::Error {
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }
}

/// Everything a run produced: one outcome per attempted formula×instance,
/// the level assignment, and any cycle diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<FormulaOutcome>,
    pub levels: IndexMap<u32, Vec<String>>,
    pub cycles: Vec<String>,
}

impl RunReport {
    pub fn outcome_for(&self, output_path: &str, instance_id: &str) -> Option<&FormulaOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.output_path == output_path && o.instance_id == instance_id)
    }
}
