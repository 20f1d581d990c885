//! Recursive-descent parser over the token stream.
//!
//! Precedence, low to high: `or`, `and`, comparisons. Comparisons chain
//! left-associatively; parentheses group.

use crate::ast::{CompareOp, FilterExpr, Selector};
use crate::error::{QueryError, Result};
use crate::lexer::{lex, Token};

/// Cursor over the lexed tokens.
struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, context: &str) -> Result<()> {
        match self.next() {
            Some(ref token) if *token == expected => Ok(()),
            Some(token) => Err(QueryError::syntax(format!(
                "expected {expected:?} {context}, found {token:?}"
            ))),
            None => Err(QueryError::syntax(format!(
                "expected {expected:?} {context}, found end of input"
            ))),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

/// Parse a complete filter expression.
pub fn parse(source: &str) -> Result<FilterExpr> {
    let mut stream = TokenStream::new(lex(source)?);
    let expr = parse_or(&mut stream)?;
    if !stream.at_end() {
        return Err(QueryError::syntax(format!(
            "trailing input after expression: {:?}",
            stream.peek()
        )));
    }
    Ok(expr)
}

fn parse_or(stream: &mut TokenStream) -> Result<FilterExpr> {
    let mut lhs = parse_and(stream)?;
    while stream.eat(&Token::Or) {
        let rhs = parse_and(stream)?;
        lhs = FilterExpr::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_and(stream: &mut TokenStream) -> Result<FilterExpr> {
    let mut lhs = parse_comparison(stream)?;
    while stream.eat(&Token::And) {
        let rhs = parse_comparison(stream)?;
        lhs = FilterExpr::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn parse_comparison(stream: &mut TokenStream) -> Result<FilterExpr> {
    let mut lhs = parse_atom(stream)?;
    while let Some(op) = compare_op(stream.peek()) {
        stream.pos += 1;
        let rhs = parse_atom(stream)?;
        lhs = FilterExpr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        };
    }
    Ok(lhs)
}

fn compare_op(token: Option<&Token>) -> Option<CompareOp> {
    match token? {
        Token::Eq => Some(CompareOp::Eq),
        Token::Ne => Some(CompareOp::Ne),
        Token::Ge => Some(CompareOp::Ge),
        Token::Le => Some(CompareOp::Le),
        Token::Gt => Some(CompareOp::Gt),
        Token::Lt => Some(CompareOp::Lt),
        _ => None,
    }
}

fn parse_atom(stream: &mut TokenStream) -> Result<FilterExpr> {
    match stream.next() {
        Some(Token::LParen) => {
            let expr = parse_or(stream)?;
            stream.expect(Token::RParen, "to close group")?;
            Ok(expr)
        }
        Some(Token::Contains) => {
            stream.expect(Token::LParen, "after contains")?;
            let haystack = parse_or(stream)?;
            stream.expect(Token::Comma, "between contains arguments")?;
            let needle = parse_or(stream)?;
            stream.expect(Token::RParen, "to close contains")?;
            Ok(FilterExpr::Contains(Box::new(haystack), Box::new(needle)))
        }
        Some(Token::First) => parse_positional(stream, Selector::First),
        Some(Token::Last) => parse_positional(stream, Selector::Last),
        Some(Token::Firstc) => parse_positional(stream, Selector::FirstByCreation),
        Some(Token::Lastc) => parse_positional(stream, Selector::LastByCreation),
        Some(Token::Ident(name)) => Ok(FilterExpr::Ident(name)),
        Some(Token::Number(n)) => Ok(FilterExpr::Number(n)),
        Some(Token::Str(s)) => Ok(FilterExpr::Str(s)),
        Some(Token::True) => Ok(FilterExpr::Bool(true)),
        Some(Token::False) => Ok(FilterExpr::Bool(false)),
        Some(token) => Err(QueryError::syntax(format!("unexpected token {token:?}"))),
        None => Err(QueryError::syntax("unexpected end of input")),
    }
}

fn parse_positional(stream: &mut TokenStream, selector: Selector) -> Result<FilterExpr> {
    stream.expect(Token::LParen, &format!("after {}", selector.name()))?;
    let path = match stream.next() {
        Some(Token::Ident(name)) => name,
        other => {
            return Err(QueryError::syntax(format!(
                "{} takes one identifier argument, found {other:?}",
                selector.name()
            )));
        }
    };
    stream.expect(Token::RParen, &format!("to close {}", selector.name()))?;
    Ok(FilterExpr::Positional { selector, path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_or_under_and() {
        // a == 1 or b == 2 and c == 3  =>  or(a==1, and(b==2, c==3))
        let expr = parse("a == 1 or b == 2 and c == 3").unwrap();
        match expr {
            FilterExpr::Or(_, rhs) => assert!(matches!(*rhs, FilterExpr::And(_, _))),
            other => panic!("expected Or at top, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_groups() {
        let expr = parse("(a == 1 or b == 2) and c == 3").unwrap();
        match expr {
            FilterExpr::And(lhs, _) => assert!(matches!(*lhs, FilterExpr::Or(_, _))),
            other => panic!("expected And at top, got {other:?}"),
        }
    }

    #[test]
    fn contains_and_positional() {
        let expr = parse("contains(e00001v, 'Truck') and firstc(e00002v)").unwrap();
        match expr {
            FilterExpr::And(lhs, rhs) => {
                assert!(matches!(*lhs, FilterExpr::Contains(_, _)));
                assert_eq!(
                    *rhs,
                    FilterExpr::Positional {
                        selector: Selector::FirstByCreation,
                        path: "e00002v".to_string()
                    }
                );
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_are_reported_not_raised() {
        assert!(parse("e00001v ==").is_err());
        assert!(parse("(e00001v == 1").is_err());
        assert!(parse("first(1)").is_err());
        assert!(parse("e00001v == 1 e00002v").is_err());
    }
}
