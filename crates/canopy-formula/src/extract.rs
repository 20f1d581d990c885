//! Coded-token extraction and text scanning helpers.

use std::sync::LazyLock;

use regex::Regex;

/// The coded variable token: literal `e`, five decimal digits, literal `v`.
pub static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"e\d{5}v").unwrap_or_else(|e| panic!("token pattern: {e}")));

/// All coded tokens in `text`, de-duplicated in first-occurrence order.
pub fn extract_variables(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for found in TOKEN_RE.find_iter(text) {
        if !out.iter().any(|v| v == found.as_str()) {
            out.push(found.as_str().to_string());
        }
    }
    out
}

/// Rewrite bare `=` comparisons into `==`, tolerating author typos.
///
/// An `=` already part of `==`, `!=`, `<=` or `>=` is left alone.
pub fn normalize_comparisons(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '=' {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            let part_of_operator =
                matches!(prev, Some('=' | '!' | '<' | '>')) || next == Some('=');
            if !part_of_operator {
                out.push_str("==");
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Find the `)` matching the `(` at byte index `open`.
///
/// Returns the closing index and the enclosed body, or None when the
/// parentheses never balance.
pub fn balance_parentheses(text: &str, open: usize) -> Option<(usize, &str)> {
    if text.as_bytes().get(open) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    for (offset, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + offset;
                    return Some((close, &text[open + 1..close]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Byte indices of commas at parenthesis-nesting depth zero.
pub fn find_top_level_commas(body: &str) -> Vec<usize> {
    let mut depth = 0usize;
    let mut out = Vec::new();
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => out.push(i),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_dedups_in_first_occurrence_order() {
        let vars = extract_variables("e00002v + e00001v * e00002v");
        assert_eq!(vars, vec!["e00002v", "e00001v"]);
    }

    #[test]
    fn extraction_ignores_near_misses() {
        assert!(extract_variables("e001v + e1234567v + value").is_empty());
    }

    #[test]
    fn bare_equals_becomes_double() {
        assert_eq!(normalize_comparisons("a = 1"), "a == 1");
        assert_eq!(normalize_comparisons("a == 1"), "a == 1");
        assert_eq!(normalize_comparisons("a != 1 and b >= 2"), "a != 1 and b >= 2");
        assert_eq!(
            normalize_comparisons("a = 1 and b = 'x'"),
            "a == 1 and b == 'x'"
        );
    }

    #[test]
    fn balancing_finds_matching_close() {
        let text = "sum((a + b) * c, d)";
        let (close, body) = balance_parentheses(text, 3).unwrap();
        assert_eq!(close, text.len() - 1);
        assert_eq!(body, "(a + b) * c, d");
    }

    #[test]
    fn balancing_fails_soft_on_unbalanced_input() {
        assert!(balance_parentheses("sum((a + b", 3).is_none());
        assert!(balance_parentheses("sum", 0).is_none());
    }

    #[test]
    fn top_level_commas_skip_nested_ones() {
        let body = "max(a, b), c == 1, d";
        let commas = find_top_level_commas(body);
        assert_eq!(commas, vec![9, 17]);
        assert_eq!(&body[..commas[0]], "max(a, b)");
    }
}
