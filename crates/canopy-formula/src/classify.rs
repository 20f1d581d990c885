//! Dependency leveling of formulas into execution groups.
//!
//! Nodes are formula output paths; an edge exists only when a formula's
//! dependency list names another formula's output path. References to
//! plain data fields never constrain ordering.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

/// Layered topological sort over formula cross-references.
#[derive(Debug, Clone)]
pub struct ExecutionClassifier {
    /// Output path -> the formula output paths it depends on.
    deps: IndexMap<String, Vec<String>>,
}

impl ExecutionClassifier {
    /// Build the classifier from each formula's declared dependency list.
    ///
    /// `dag_paths` entries that are not themselves formula output paths
    /// are dropped here.
    pub fn new(dag_paths: IndexMap<String, Vec<String>>) -> Self {
        let known: IndexSet<&String> = dag_paths.keys().collect();
        let deps = dag_paths
            .iter()
            .map(|(path, deps)| {
                let internal: Vec<String> = deps
                    .iter()
                    .filter(|d| known.contains(d))
                    .cloned()
                    .collect();
                (path.clone(), internal)
            })
            .collect();
        Self { deps }
    }

    /// Assign each formula path an execution level, lowest first.
    ///
    /// When a cycle blocks progress, every still-unassigned formula lands
    /// in one final best-effort level; `validate` reports the membership.
    pub fn classify(&self) -> IndexMap<String, u32> {
        let mut levels: IndexMap<String, u32> = IndexMap::new();
        let mut level = 1u32;
        while levels.len() < self.deps.len() {
            let ready: Vec<String> = self
                .deps
                .iter()
                .filter(|(path, _)| !levels.contains_key(*path))
                .filter(|(path, deps)| {
                    deps.iter()
                        .all(|d| d == *path || levels.contains_key(d))
                        && !deps.contains(path)
                })
                .map(|(path, _)| path.clone())
                .collect();
            if ready.is_empty() {
                let remaining: Vec<String> = self
                    .deps
                    .keys()
                    .filter(|p| !levels.contains_key(*p))
                    .cloned()
                    .collect();
                warn!(level, formulas = ?remaining, "cyclic dependencies, forcing final level");
                for path in remaining {
                    levels.insert(path, level);
                }
                break;
            }
            for path in ready {
                levels.insert(path, level);
            }
            level += 1;
        }
        debug!(formulas = levels.len(), levels = level, "classified");
        levels
    }

    /// Levels in ascending order, each with its formula paths.
    pub fn execution_order(&self) -> IndexMap<u32, Vec<String>> {
        let mut order: IndexMap<u32, Vec<String>> = IndexMap::new();
        let classified = self.classify();
        let mut levels: Vec<u32> = classified.values().copied().collect();
        levels.sort_unstable();
        levels.dedup();
        for level in levels {
            let paths = classified
                .iter()
                .filter(|(_, l)| **l == level)
                .map(|(p, _)| p.clone())
                .collect();
            order.insert(level, paths);
        }
        order
    }

    /// Describe every dependency cycle. Diagnostic only; execution still
    /// proceeds with the best-effort ordering.
    pub fn validate(&self) -> Vec<String> {
        let mut cycles = Vec::new();
        let mut done: IndexSet<String> = IndexSet::new();
        for start in self.deps.keys() {
            if !done.contains(start) {
                let mut trail = Vec::new();
                self.visit(start, &mut trail, &mut done, &mut cycles);
            }
        }
        cycles
    }

    fn visit(
        &self,
        node: &str,
        trail: &mut Vec<String>,
        done: &mut IndexSet<String>,
        cycles: &mut Vec<String>,
    ) {
        if let Some(pos) = trail.iter().position(|p| p == node) {
            let mut description = trail[pos..].join(" -> ");
            description.push_str(" -> ");
            description.push_str(node);
            if !cycles.contains(&description) {
                cycles.push(description);
            }
            return;
        }
        if done.contains(node) {
            return;
        }
        trail.push(node.to_string());
        for dep in self.deps.get(node).into_iter().flatten() {
            self.visit(dep, trail, done, cycles);
        }
        trail.pop();
        done.insert(node.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(p, ds)| {
                (
                    p.to_string(),
                    ds.iter().map(|d| d.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn dependent_formula_runs_strictly_later() {
        // A reads B's output; B reads only data fields
        let classifier = ExecutionClassifier::new(deps(&[
            ("e00010v", &["e00020v", "e00099v"]),
            ("e00020v", &["e00099v"]),
        ]));
        let levels = classifier.classify();
        assert_eq!(levels["e00020v"], 1);
        assert_eq!(levels["e00010v"], 2);

        let order = classifier.execution_order();
        assert_eq!(order[&1], vec!["e00020v"]);
        assert_eq!(order[&2], vec!["e00010v"]);
    }

    #[test]
    fn data_field_references_do_not_constrain() {
        let classifier =
            ExecutionClassifier::new(deps(&[("e00010v", &["e00099v"]), ("e00020v", &[])]));
        let levels = classifier.classify();
        assert_eq!(levels["e00010v"], 1);
        assert_eq!(levels["e00020v"], 1);
    }

    #[test]
    fn classification_is_deterministic() {
        let input = deps(&[
            ("e00010v", &["e00020v"]),
            ("e00020v", &["e00030v"]),
            ("e00030v", &[]),
            ("e00040v", &["e00030v"]),
        ]);
        let a = ExecutionClassifier::new(input.clone()).classify();
        let b = ExecutionClassifier::new(input).classify();
        assert_eq!(a, b);
        // no formula depends on its own or a later level
        let classifier = ExecutionClassifier::new(deps(&[
            ("e00010v", &["e00020v"]),
            ("e00020v", &["e00030v"]),
            ("e00030v", &[]),
            ("e00040v", &["e00030v"]),
        ]));
        let levels = classifier.classify();
        for (path, deps) in &classifier.deps {
            for dep in deps {
                assert!(levels[dep] < levels[path]);
            }
        }
    }

    #[test]
    fn cycles_land_in_one_final_level_and_validate_reports_them() {
        let classifier = ExecutionClassifier::new(deps(&[
            ("e00010v", &["e00020v"]),
            ("e00020v", &["e00010v"]),
            ("e00030v", &[]),
        ]));
        let levels = classifier.classify();
        assert_eq!(levels["e00030v"], 1);
        assert_eq!(levels["e00010v"], 2);
        assert_eq!(levels["e00020v"], 2);

        let cycles = classifier.validate();
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].contains("e00010v"));
        assert!(cycles[0].contains("e00020v"));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let classifier = ExecutionClassifier::new(deps(&[("e00010v", &["e00010v"])]));
        let levels = classifier.classify();
        assert_eq!(levels["e00010v"], 1);
        assert!(!classifier.validate().is_empty());
    }
}
