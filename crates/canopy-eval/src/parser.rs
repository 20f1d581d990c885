//! Restricted expression grammar.
//!
//! Precedence, low to high: conditional (`a if c else b`), `or`, `and`,
//! `not`, comparisons, `+ -`, `* / %`, `**`, unary minus, atoms.

use chumsky::prelude::*;

use crate::ast::{BinaryOp, CompareOp, Expr, UnaryOp};
use crate::error::{EvalError, Result};

pub type ParseError<'src> = Rich<'src, char>;

/// Parse one expression, consuming all input.
pub fn parse(source: &str) -> Result<Expr> {
    let (output, errors) = expr()
        .padded_by(ws())
        .then_ignore(end())
        .parse(source)
        .into_output_errors();
    match output {
        Some(expr) if errors.is_empty() => Ok(expr),
        _ => {
            let rendered = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            Err(EvalError::Parse(if rendered.is_empty() {
                "no expression".to_string()
            } else {
                rendered
            }))
        }
    }
}

fn ws<'src>() -> impl Parser<'src, &'src str, (), extra::Err<ParseError<'src>>> + Clone {
    text::whitespace().ignored()
}

fn ident<'src>() -> impl Parser<'src, &'src str, String, extra::Err<ParseError<'src>>> + Clone {
    text::ascii::ident().map(|s: &str| s.to_string())
}

/// Unsigned float; leading minus is the unary-negation tier's job.
fn number<'src>() -> impl Parser<'src, &'src str, f64, extra::Err<ParseError<'src>>> + Clone {
    text::int(10)
        .then(just('.').then(text::digits(10)).or_not())
        .then(
            one_of("eE")
                .then(one_of("+-").or_not())
                .then(text::digits(10))
                .or_not(),
        )
        .to_slice()
        .map(|s: &str| s.parse().unwrap_or(0.0))
}

fn string_lit<'src>() -> impl Parser<'src, &'src str, String, extra::Err<ParseError<'src>>> + Clone
{
    let single = none_of("'")
        .repeated()
        .collect::<String>()
        .delimited_by(just('\''), just('\''));
    let double = none_of("\"")
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'));
    single.or(double)
}

/// Every tier is `.boxed()`: the fully inlined combinator type nests deep
/// enough to overflow a default 2 MiB thread stack at parse time.
fn expr<'src>() -> impl Parser<'src, &'src str, Expr, extra::Err<ParseError<'src>>> + Clone {
    recursive(|expr| {
        let args = expr
            .clone()
            .separated_by(just(',').padded_by(ws()))
            .collect::<Vec<_>>();

        let call = ident()
            .then(
                args.clone()
                    .delimited_by(just('(').padded_by(ws()), just(')').padded_by(ws())),
            )
            .map(|(name, args)| Expr::Call { name, args });

        let list = args
            .delimited_by(just('[').padded_by(ws()), just(']').padded_by(ws()))
            .map(Expr::List);

        let atom = choice((
            text::keyword("True").to(Expr::Bool(true)),
            text::keyword("False").to(Expr::Bool(false)),
            number().map(Expr::Number),
            string_lit().map(Expr::Str),
            list,
            call,
            ident().map(Expr::Name),
            expr.clone()
                .padded_by(ws())
                .delimited_by(just('('), just(')')),
        ))
        .padded_by(ws())
        .boxed();

        let power = atom.clone().foldl(
            just("**").padded_by(ws()).then(atom.clone()).repeated(),
            |left, (_, right)| Expr::Binary {
                op: BinaryOp::Pow,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
        .boxed();

        let unary = just('-')
            .padded_by(ws())
            .repeated()
            .foldr(power, |_, operand| Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            })
            .boxed();

        let product = unary.clone().foldl(
            choice((
                just('*').to(BinaryOp::Mul),
                just('/').to(BinaryOp::Div),
                just('%').to(BinaryOp::Mod),
            ))
            .padded_by(ws())
            .then(unary.clone())
            .repeated(),
            |left, (op, right)| Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
        .boxed();

        let sum = product.clone().foldl(
            choice((just('+').to(BinaryOp::Add), just('-').to(BinaryOp::Sub)))
                .padded_by(ws())
                .then(product.clone())
                .repeated(),
            |left, (op, right)| Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
        .boxed();

        let comparison = sum.clone().foldl(
            choice((
                just("==").to(CompareOp::Eq),
                just("!=").to(CompareOp::Ne),
                just("<=").to(CompareOp::Le),
                just(">=").to(CompareOp::Ge),
                just('<').to(CompareOp::Lt),
                just('>').to(CompareOp::Gt),
            ))
            .padded_by(ws())
            .then(sum.clone())
            .repeated(),
            |left, (op, right)| Expr::Compare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
        .boxed();

        let negation = text::keyword("not")
            .padded_by(ws())
            .repeated()
            .foldr(comparison, |_, operand| Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            })
            .boxed();

        let conjunction = negation.clone().foldl(
            text::keyword("and")
                .padded_by(ws())
                .then(negation.clone())
                .repeated(),
            |left, (_, right)| Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
        .boxed();

        let disjunction = conjunction.clone().foldl(
            text::keyword("or")
                .padded_by(ws())
                .then(conjunction.clone())
                .repeated(),
            |left, (_, right)| Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
        .boxed();

        // a if cond else b
        disjunction
            .clone()
            .then(
                text::keyword("if")
                    .padded_by(ws())
                    .ignore_then(disjunction.clone())
                    .then_ignore(text::keyword("else").padded_by(ws()))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(then, tail)| match tail {
                Some((cond, otherwise)) => Expr::Conditional {
                    then: Box::new(then),
                    cond: Box::new(cond),
                    otherwise: Box::new(otherwise),
                },
                None => then,
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            )),
            other => panic!("expected Add at top, got {other:?}"),
        }
    }

    #[test]
    fn calls_and_lists() {
        let expr = parse("sum([1, 2, 3]) / count(e00001v_1)").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Div,
                ..
            }
        ));
    }

    #[test]
    fn conditional_expression() {
        let expr = parse("1 if e00001v_1 > 0 else 2").unwrap();
        match expr {
            Expr::Conditional { then, otherwise, .. } => {
                assert_eq!(*then, Expr::Number(1.0));
                assert_eq!(*otherwise, Expr::Number(2.0));
            }
            other => panic!("expected Conditional, got {other:?}"),
        }
    }

    #[test]
    fn unary_and_power() {
        let expr = parse("-2 ** 2").unwrap();
        // unary binds outside power: -(2 ** 2)
        assert!(matches!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                ..
            }
        ));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse("1 + 2 )").is_err());
        assert!(parse("").is_err());
    }
}
