//! Lexical analysis for filter expressions.
//!
//! Keywords (`and`, `or`, `True`, `False`, `contains` and the four
//! positional functions) are recognized at the lexer level so the parser
//! never has to second-guess identifiers.

use logos::Logos;

use crate::error::{QueryError, Result};

/// Filter-expression token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Keywords
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("contains")]
    Contains,
    #[token("first")]
    First,
    #[token("last")]
    Last,
    #[token("firstc")]
    Firstc,
    #[token("lastc")]
    Lastc,

    // Operators
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token(">=")]
    Ge,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token("<")]
    Lt,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,

    // Literals
    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Number(i64),

    /// Single-quoted string, quotes stripped.
    #[regex(r"'[^']*'", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    Str(String),
}

/// Tokenize a filter expression, failing on the first unrecognized byte.
pub fn lex(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push(token),
            Err(()) => return Err(QueryError::Lex { pos: span.start }),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_win_over_identifiers() {
        let tokens = lex("first and firstly").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::First,
                Token::And,
                Token::Ident("firstly".to_string())
            ]
        );
    }

    #[test]
    fn operators_and_literals() {
        let tokens = lex("e00001v == 'Automovel'").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("e00001v".to_string()),
                Token::Eq,
                Token::Str("Automovel".to_string()),
            ]
        );
        let tokens = lex("e00002v >= 10").unwrap();
        assert_eq!(tokens[2], Token::Number(10));
    }

    #[test]
    fn rejects_stray_bytes() {
        assert_eq!(lex("e00001v @ 1"), Err(QueryError::Lex { pos: 8 }));
    }
}
