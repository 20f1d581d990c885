//! Formula specifications and their parsed form.

use serde::{Deserialize, Serialize};

/// External persistence target for a computed result.
///
/// The result sink maps the formula's output path back to this target;
/// the engine itself never touches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTarget {
    pub doctype: String,
    pub fieldname: String,
}

/// One user-authored formula, as handed over by the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaSpec {
    /// Coded token identifying where the result is written in the tree.
    pub path: String,
    /// Raw formula text, possibly with a leading `return `.
    pub value: String,
    pub update: UpdateTarget,
    /// Populated once at run start, never recomputed mid-run.
    #[serde(skip)]
    pub parsed: Option<ParsedFormula>,
}

/// A batch of formulas applying to one tree path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaGroup {
    /// Tag of the child group whose instances these formulas govern.
    pub path: String,
    /// Ids of the entity instances to evaluate.
    pub records: Vec<String>,
    pub formulas: Vec<FormulaSpec>,
}

/// The parser's view of one formula.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFormula {
    pub aggr: Vec<AggregateCall>,
    /// Variable tokens used outside any aggregate call.
    pub vars: Vec<String>,
    /// Order-preserving de-duplicated union of every token the formula
    /// references; the classifier's edge list.
    pub dag_paths: Vec<String>,
}

/// One aggregate-function invocation inside a formula.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    /// Full call text as it appears in the formula, for exact-text
    /// substitution.
    pub base: String,
    /// The call with its filter stripped, the shape handed to the
    /// evaluator after variable binding.
    pub eval: String,
    /// Variable tokens inside the call's argument.
    pub vars: Vec<String>,
    /// False when the function name carries the `_node` local-scope marker.
    pub global: bool,
    /// Boolean sub-expression restricting contributing instances.
    pub filter: Option<String>,
    /// Variable tokens inside the filter.
    pub filter_vars: Vec<String>,
}
