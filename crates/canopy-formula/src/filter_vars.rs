//! Variables on the right-hand side of filter comparisons.
//!
//! A filter like `e00001v == e00005v` compares a field against another
//! variable; the resolver must substitute the right-hand token with its
//! concrete value before the filter runs. Only tokens directly preceded
//! by a comparison operator qualify.

use std::sync::LazyLock;

use regex::Regex;

static RHS_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:==|!=|>=|<=|>|<)\s*(e\d{5}v)")
        .unwrap_or_else(|e| panic!("rhs pattern: {e}"))
});

/// Placeholder standing in for a highlighted variable.
pub const PLACEHOLDER: &str = "__v__";

/// Right-hand-side variable tokens, de-duplicated in occurrence order.
pub fn unique_rhs_vars(filter: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in RHS_VAR_RE.captures_iter(filter) {
        if let Some(var) = caps.get(1) {
            if !out.iter().any(|v| v == var.as_str()) {
                out.push(var.as_str().to_string());
            }
        }
    }
    out
}

/// Replace every occurrence of `var` with the placeholder.
pub fn highlight(filter: &str, var: &str) -> String {
    filter.replace(var, PLACEHOLDER)
}

/// Fill every placeholder with the rendered value text.
pub fn fill(highlighted: &str, rendered: &str) -> String {
    highlighted.replace(PLACEHOLDER, rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rhs_vars_only() {
        let vars = unique_rhs_vars("e00001v == e00005v and e00002v > e00005v");
        assert_eq!(vars, vec!["e00005v"]);
    }

    #[test]
    fn lhs_tokens_do_not_qualify() {
        assert!(unique_rhs_vars("e00001v == 'Automovel'").is_empty());
    }

    #[test]
    fn highlight_then_fill() {
        let step = highlight("e00001v == e00005v", "e00005v");
        assert_eq!(step, "e00001v == __v__");
        assert_eq!(fill(&step, "'Truck'"), "e00001v == 'Truck'");
    }
}
