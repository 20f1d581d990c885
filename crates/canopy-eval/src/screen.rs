//! Pre-parse screen for constructs the sandbox forbids.
//!
//! The grammar itself cannot express these, but screening first turns
//! them into a precise blocked-construct error instead of an opaque
//! parse failure.

use crate::error::{EvalError, Result};

/// Statement keywords that grant behavior beyond expression evaluation.
const BLOCKED_KEYWORDS: &[&str] = &[
    "import", "def", "lambda", "class", "try", "except", "finally", "raise", "assert", "del",
    "with", "global", "nonlocal", "yield", "while", "for", "return",
];

/// Reject blocked constructs in `source` before it reaches the parser.
///
/// With `strict` set, assignment forms are rejected too (read-only mode).
pub fn screen(source: &str, strict: bool) -> Result<()> {
    for word in source
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
    {
        if BLOCKED_KEYWORDS.contains(&word) {
            return Err(EvalError::blocked(word));
        }
        if word.contains("__") {
            return Err(EvalError::blocked(format!("dunder name {word}")));
        }
    }

    let chars: Vec<char> = source.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '.' => {
                // a dot after anything but a digit is attribute access;
                // digits on the left make it a float literal
                let prev = i.checked_sub(1).map(|j| chars[j]);
                if matches!(prev, Some(p) if p.is_ascii_alphabetic() || p == '_' || p == ')' || p == ']') {
                    return Err(EvalError::blocked("attribute access"));
                }
            }
            '=' if strict => {
                let prev = i.checked_sub(1).map(|j| chars[j]);
                let next = chars.get(i + 1).copied();
                let comparison =
                    matches!(prev, Some('=' | '!' | '<' | '>')) || next == Some('=');
                if !comparison {
                    return Err(EvalError::blocked("assignment"));
                }
            }
            _ => {}
        }
    }
    Ok(())
}
