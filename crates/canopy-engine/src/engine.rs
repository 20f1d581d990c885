//! Level-synchronous run loop.
//!
//! Formulas are parsed once, leveled by the classifier, then executed one
//! level at a time: sequential resolve against the current tree, parallel
//! evaluation of the resolved instances, and a single-writer commit of
//! results back into the tree before the next level reads it.

use canopy_eval::{EvalValue, Interpreter, Scope};
use canopy_formula::{ExecutionClassifier, FormulaGroup, FormulaParser, FormulaSpec, ParsedFormula};
use canopy_query::QueryEngine;
use canopy_tree::{Tree, Value};
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::bind::BindCounter;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::outcome::{FormulaOutcome, RunReport};
use crate::resolve::resolve;

/// One formula ready to run, with its owning group context.
struct PlannedFormula<'a> {
    group: &'a FormulaGroup,
    spec: &'a FormulaSpec,
    parsed: ParsedFormula,
}

/// One resolved formula×instance awaiting evaluation.
struct ResolvedTask {
    output_path: String,
    group_path: String,
    instance_id: String,
    text: String,
    scope: Scope,
}

/// The formula evaluation engine.
pub struct Engine {
    config: EngineConfig,
    parser: FormulaParser,
    interpreter: Interpreter,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let parser = FormulaParser::new(config.formula.clone());
        let interpreter = Interpreter::new().with_max_time(config.eval_timeout);
        Self {
            config,
            parser,
            interpreter,
        }
    }

    /// Execute every formula group against the tree.
    ///
    /// Always yields one outcome per attempted formula×instance pair;
    /// only malformed input aborts the run.
    #[instrument(skip_all, fields(groups = groups.len()))]
    pub fn run(&self, tree: &mut Tree, groups: &[FormulaGroup]) -> Result<RunReport> {
        if tree.roots.is_empty() {
            return Err(EngineError::MalformedTree("tree has no roots".to_string()));
        }
        for group in groups {
            if group.path.trim().is_empty() {
                return Err(EngineError::MissingConfig(
                    "formula group without a tree path".to_string(),
                ));
            }
            for spec in &group.formulas {
                if spec.path.trim().is_empty() {
                    return Err(EngineError::MissingConfig(format!(
                        "formula without an output path in group {}",
                        group.path
                    )));
                }
            }
        }

        let mut outcomes = Vec::new();

        // parse every formula once; failures become per-instance outcomes
        // and the formula is excluded from scheduling
        let mut planned: IndexMap<&str, PlannedFormula<'_>> = IndexMap::new();
        for group in groups {
            for spec in &group.formulas {
                match self.parser.parse(&spec.value) {
                    Ok(parsed) => {
                        planned.insert(
                            spec.path.as_str(),
                            PlannedFormula {
                                group,
                                spec,
                                parsed,
                            },
                        );
                    }
                    Err(e) => {
                        warn!(path = %spec.path, error = %e, "formula skipped");
                        for record_id in &group.records {
                            outcomes.push(FormulaOutcome::error(
                                &spec.path,
                                record_id,
                                e.to_string(),
                            ));
                        }
                    }
                }
            }
        }

        let dag: IndexMap<String, Vec<String>> = planned
            .values()
            .map(|p| (p.spec.path.clone(), p.parsed.dag_paths.clone()))
            .collect();
        let classifier = ExecutionClassifier::new(dag);
        let levels = classifier.execution_order();
        let cycles = classifier.validate();
        if !cycles.is_empty() {
            warn!(?cycles, "dependency cycles, final level is best-effort");
        }

        let mut query = QueryEngine::new();
        let mut counter = BindCounter::new();

        for (level, paths) in &levels {
            debug!(level, formulas = paths.len(), "level start");

            let mut tasks: Vec<ResolvedTask> = Vec::new();
            for path in paths {
                let Some(plan) = planned.get(path.as_str()) else {
                    continue;
                };
                for record_id in &plan.group.records {
                    match resolve(
                        tree,
                        &mut query,
                        &mut counter,
                        &plan.parsed,
                        &plan.spec.value,
                        record_id,
                    ) {
                        Ok((text, scope)) => tasks.push(ResolvedTask {
                            output_path: plan.spec.path.clone(),
                            group_path: plan.group.path.clone(),
                            instance_id: record_id.clone(),
                            text,
                            scope,
                        }),
                        Err(message) => {
                            outcomes.push(FormulaOutcome::error(path, record_id, message));
                        }
                    }
                }
            }

            let results: Vec<std::result::Result<EvalValue, canopy_eval::EvalError>> =
                if self.config.parallel {
                    tasks
                        .par_iter()
                        .map(|task| self.interpreter.evaluate(&task.text, &task.scope))
                        .collect()
                } else {
                    tasks
                        .iter()
                        .map(|task| self.interpreter.evaluate(&task.text, &task.scope))
                        .collect()
                };

            // single-writer commit before the next level's readers run
            for (task, result) in tasks.iter().zip(results) {
                match result {
                    Ok(value) => {
                        let stored = store_value(value);
                        let written = tree.write_field(
                            &task.group_path,
                            &task.instance_id,
                            &task.output_path,
                            stored.clone(),
                        );
                        if !written {
                            debug!(
                                path = %task.output_path,
                                instance = %task.instance_id,
                                "no field to receive result"
                            );
                        }
                        outcomes.push(FormulaOutcome::success(
                            &task.output_path,
                            &task.instance_id,
                            stored,
                        ));
                    }
                    Err(e) => {
                        outcomes.push(FormulaOutcome::error(
                            &task.output_path,
                            &task.instance_id,
                            e.to_string(),
                        ));
                    }
                }
            }
            query.invalidate();
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            outcomes = outcomes.len(),
            failed,
            levels = levels.len(),
            "run complete"
        );
        Ok(RunReport {
            outcomes,
            levels,
            cycles,
        })
    }
}

/// Flatten an evaluation result into a storable field value.
fn store_value(value: EvalValue) -> Value {
    match value {
        EvalValue::Number(n) => Value::Number(n),
        EvalValue::Bool(b) => Value::Bool(b),
        EvalValue::Str(s) => Value::Text(s),
        EvalValue::Array(v) => Value::Series(v),
    }
}
