//! The allow-listed symbol table.
//!
//! Built once, shared read-only across evaluations. Unary math functions
//! apply elementwise to arrays; aggregations reduce arrays to scalars.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::{EvalError, Result};
use crate::value::EvalValue;

pub type Builtin = fn(&[EvalValue]) -> Result<EvalValue>;

pub static SYMBOLS: LazyLock<HashMap<&'static str, Builtin>> = LazyLock::new(|| {
    let mut t: HashMap<&'static str, Builtin> = HashMap::new();
    // aggregations
    t.insert("sum", agg_sum);
    t.insert("mean", agg_mean);
    t.insert("avg", agg_mean);
    t.insert("median", agg_median);
    t.insert("count", agg_count);
    t.insert("len", agg_count);
    t.insert("min", agg_min);
    t.insert("max", agg_max);
    t.insert("std", agg_std);
    t.insert("var", agg_var);
    t.insert("percentile", agg_percentile);
    t.insert("prod", agg_prod);
    t.insert("cumsum", arr_cumsum);
    // elementwise math
    t.insert("round", math_round);
    t.insert("floor", |a| map_unary("floor", a, f64::floor));
    t.insert("ceil", |a| map_unary("ceil", a, f64::ceil));
    t.insert("abs", |a| map_unary("abs", a, f64::abs));
    t.insert("sqrt", |a| map_unary("sqrt", a, f64::sqrt));
    t.insert("sin", |a| map_unary("sin", a, f64::sin));
    t.insert("cos", |a| map_unary("cos", a, f64::cos));
    t.insert("tan", |a| map_unary("tan", a, f64::tan));
    t.insert("asin", |a| map_unary("asin", a, f64::asin));
    t.insert("acos", |a| map_unary("acos", a, f64::acos));
    t.insert("atan", |a| map_unary("atan", a, f64::atan));
    t.insert("log", |a| map_unary("log", a, f64::ln));
    t.insert("log10", |a| map_unary("log10", a, f64::log10));
    t.insert("exp", |a| map_unary("exp", a, f64::exp));
    t.insert("pow", math_pow);
    t.insert("clip", math_clip);
    // array shaping
    t.insert("unique", arr_unique);
    t.insert("concatenate", arr_concatenate);
    t.insert("where", arr_where);
    t.insert("reshape", arr_reshape);
    // conversions & predicates
    t.insert("bool", conv_bool);
    t.insert("int", conv_int);
    t.insert("float", conv_float);
    t.insert("str", conv_str);
    t.insert("contains", pred_contains);
    t
});

pub fn lookup(name: &str) -> Option<Builtin> {
    SYMBOLS.get(name).copied()
}

fn arity(function: &'static str, args: &[EvalValue], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::Arity {
            function,
            expected,
            got: args.len(),
        })
    }
}

fn one_array(function: &'static str, args: &[EvalValue]) -> Result<Vec<f64>> {
    arity(function, args, 1)?;
    args[0].as_array()
}

fn non_empty(function: &'static str, values: Vec<f64>) -> Result<Vec<f64>> {
    if values.is_empty() {
        Err(EvalError::numeric(format!("{function} of empty array")))
    } else {
        Ok(values)
    }
}

// --- aggregations ---

fn agg_sum(args: &[EvalValue]) -> Result<EvalValue> {
    Ok(EvalValue::Number(one_array("sum", args)?.iter().sum()))
}

fn agg_mean(args: &[EvalValue]) -> Result<EvalValue> {
    let values = non_empty("mean", one_array("mean", args)?)?;
    Ok(EvalValue::Number(
        values.iter().sum::<f64>() / values.len() as f64,
    ))
}

fn agg_median(args: &[EvalValue]) -> Result<EvalValue> {
    let mut values = non_empty("median", one_array("median", args)?)?;
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    Ok(EvalValue::Number(median))
}

fn agg_count(args: &[EvalValue]) -> Result<EvalValue> {
    arity("count", args, 1)?;
    let count = match &args[0] {
        EvalValue::Str(s) => s.chars().count(),
        other => other.as_array()?.len(),
    };
    Ok(EvalValue::Number(count as f64))
}

fn agg_min(args: &[EvalValue]) -> Result<EvalValue> {
    let values = non_empty("min", one_array("min", args)?)?;
    Ok(EvalValue::Number(
        values.iter().copied().fold(f64::INFINITY, f64::min),
    ))
}

fn agg_max(args: &[EvalValue]) -> Result<EvalValue> {
    let values = non_empty("max", one_array("max", args)?)?;
    Ok(EvalValue::Number(
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    ))
}

fn variance(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn agg_std(args: &[EvalValue]) -> Result<EvalValue> {
    let values = non_empty("std", one_array("std", args)?)?;
    Ok(EvalValue::Number(variance(&values).sqrt()))
}

fn agg_var(args: &[EvalValue]) -> Result<EvalValue> {
    let values = non_empty("var", one_array("var", args)?)?;
    Ok(EvalValue::Number(variance(&values)))
}

/// Linear-interpolation percentile over the sorted values.
fn agg_percentile(args: &[EvalValue]) -> Result<EvalValue> {
    arity("percentile", args, 2)?;
    let mut values = non_empty("percentile", args[0].as_array()?)?;
    let p = args[1].as_number()?;
    if !(0.0..=100.0).contains(&p) {
        return Err(EvalError::numeric(format!(
            "percentile rank {p} outside 0..=100"
        )));
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let rank = p / 100.0 * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Ok(EvalValue::Number(
        values[lower] + (values[upper] - values[lower]) * fraction,
    ))
}

fn agg_prod(args: &[EvalValue]) -> Result<EvalValue> {
    Ok(EvalValue::Number(
        one_array("prod", args)?.iter().product(),
    ))
}

fn arr_cumsum(args: &[EvalValue]) -> Result<EvalValue> {
    let values = one_array("cumsum", args)?;
    let mut running = 0.0;
    let out = values
        .into_iter()
        .map(|v| {
            running += v;
            running
        })
        .collect();
    Ok(EvalValue::Array(out))
}

// --- elementwise math ---

fn map_unary(function: &'static str, args: &[EvalValue], f: fn(f64) -> f64) -> Result<EvalValue> {
    arity(function, args, 1)?;
    match &args[0] {
        EvalValue::Array(v) => Ok(EvalValue::Array(v.iter().copied().map(f).collect())),
        other => Ok(EvalValue::Number(f(other.as_number()?))),
    }
}

/// `round(x)` or `round(x, digits)`.
fn math_round(args: &[EvalValue]) -> Result<EvalValue> {
    let digits = match args {
        [_] => 0,
        [_, d] => d.as_number()? as i32,
        _ => {
            return Err(EvalError::Arity {
                function: "round",
                expected: 2,
                got: args.len(),
            });
        }
    };
    let scale = 10f64.powi(digits);
    let round_one = move |v: f64| (v * scale).round() / scale;
    match &args[0] {
        EvalValue::Array(v) => Ok(EvalValue::Array(v.iter().copied().map(round_one).collect())),
        other => Ok(EvalValue::Number(round_one(other.as_number()?))),
    }
}

fn math_pow(args: &[EvalValue]) -> Result<EvalValue> {
    arity("pow", args, 2)?;
    Ok(EvalValue::Number(
        args[0].as_number()?.powf(args[1].as_number()?),
    ))
}

fn math_clip(args: &[EvalValue]) -> Result<EvalValue> {
    arity("clip", args, 3)?;
    let lo = args[1].as_number()?;
    let hi = args[2].as_number()?;
    if lo > hi {
        return Err(EvalError::numeric(format!("clip bounds inverted: {lo} > {hi}")));
    }
    let clip_one = move |v: f64| v.clamp(lo, hi);
    match &args[0] {
        EvalValue::Array(v) => Ok(EvalValue::Array(v.iter().copied().map(clip_one).collect())),
        other => Ok(EvalValue::Number(clip_one(other.as_number()?))),
    }
}

// --- array shaping ---

fn arr_unique(args: &[EvalValue]) -> Result<EvalValue> {
    let mut values = one_array("unique", args)?;
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    Ok(EvalValue::Array(values))
}

fn arr_concatenate(args: &[EvalValue]) -> Result<EvalValue> {
    let mut out = Vec::new();
    for arg in args {
        out.extend(arg.as_array()?);
    }
    Ok(EvalValue::Array(out))
}

/// `where(cond, a, b)`: elementwise select when cond is an array, plain
/// branch otherwise.
fn arr_where(args: &[EvalValue]) -> Result<EvalValue> {
    arity("where", args, 3)?;
    match &args[0] {
        EvalValue::Array(cond) => {
            let pick = |source: &EvalValue, i: usize| -> Result<f64> {
                let values = source.as_array()?;
                match values.len() {
                    1 => Ok(values[0]),
                    n if n == cond.len() => Ok(values[i]),
                    n => Err(EvalError::type_mismatch(format!(
                        "where branch length {n} does not match condition length {}",
                        cond.len()
                    ))),
                }
            };
            let mut out = Vec::with_capacity(cond.len());
            for (i, c) in cond.iter().enumerate() {
                let source = if *c != 0.0 { &args[1] } else { &args[2] };
                out.push(pick(source, i)?);
            }
            Ok(EvalValue::Array(out))
        }
        cond => Ok(if cond.truthy() {
            args[1].clone()
        } else {
            args[2].clone()
        }),
    }
}

/// Results are stored flattened, so reshape degenerates to a flatten.
fn arr_reshape(args: &[EvalValue]) -> Result<EvalValue> {
    if args.is_empty() {
        return Err(EvalError::Arity {
            function: "reshape",
            expected: 2,
            got: 0,
        });
    }
    Ok(EvalValue::Array(args[0].as_array()?))
}

// --- conversions & predicates ---

fn conv_bool(args: &[EvalValue]) -> Result<EvalValue> {
    arity("bool", args, 1)?;
    Ok(EvalValue::Bool(args[0].truthy()))
}

fn conv_int(args: &[EvalValue]) -> Result<EvalValue> {
    arity("int", args, 1)?;
    let n = match &args[0] {
        EvalValue::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| EvalError::numeric(format!("cannot convert {s:?} to int")))?,
        other => other.as_number()?,
    };
    Ok(EvalValue::Number(n.trunc()))
}

fn conv_float(args: &[EvalValue]) -> Result<EvalValue> {
    arity("float", args, 1)?;
    let n = match &args[0] {
        EvalValue::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| EvalError::numeric(format!("cannot convert {s:?} to float")))?,
        other => other.as_number()?,
    };
    Ok(EvalValue::Number(n))
}

fn conv_str(args: &[EvalValue]) -> Result<EvalValue> {
    arity("str", args, 1)?;
    Ok(EvalValue::Str(args[0].to_string()))
}

fn pred_contains(args: &[EvalValue]) -> Result<EvalValue> {
    arity("contains", args, 2)?;
    match (&args[0], &args[1]) {
        (EvalValue::Str(haystack), needle) => {
            Ok(EvalValue::Bool(haystack.contains(&needle.to_string())))
        }
        (EvalValue::Array(values), needle) => {
            let n = needle.as_number()?;
            Ok(EvalValue::Bool(values.contains(&n)))
        }
        (other, _) => Err(EvalError::type_mismatch(format!(
            "contains over {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arr(v: &[f64]) -> EvalValue {
        EvalValue::Array(v.to_vec())
    }

    #[test]
    fn aggregations() {
        assert_eq!(
            agg_sum(&[arr(&[1.0, 2.0, 3.0])]).unwrap(),
            EvalValue::Number(6.0)
        );
        assert_eq!(
            agg_median(&[arr(&[3.0, 1.0, 2.0, 4.0])]).unwrap(),
            EvalValue::Number(2.5)
        );
        assert_eq!(
            agg_std(&[arr(&[2.0, 2.0, 2.0])]).unwrap(),
            EvalValue::Number(0.0)
        );
        assert!(matches!(
            agg_min(&[arr(&[])]),
            Err(EvalError::Numeric { .. })
        ));
    }

    #[test]
    fn percentile_interpolates() {
        let result = agg_percentile(&[arr(&[1.0, 2.0, 3.0, 4.0]), EvalValue::Number(50.0)])
            .unwrap();
        assert_eq!(result, EvalValue::Number(2.5));
    }

    #[test]
    fn rounding_with_digits() {
        assert_eq!(
            math_round(&[EvalValue::Number(2.345), EvalValue::Number(2.0)]).unwrap(),
            EvalValue::Number(2.35)
        );
        assert_eq!(
            math_round(&[arr(&[1.4, 1.6])]).unwrap(),
            arr(&[1.0, 2.0])
        );
    }

    #[test]
    fn where_selects_elementwise() {
        let result = arr_where(&[
            arr(&[1.0, 0.0, 1.0]),
            arr(&[10.0, 20.0, 30.0]),
            EvalValue::Number(0.0),
        ])
        .unwrap();
        assert_eq!(result, arr(&[10.0, 0.0, 30.0]));
    }

    #[test]
    fn conversions() {
        assert_eq!(
            conv_int(&[EvalValue::Str("12.7".to_string())]).unwrap(),
            EvalValue::Number(12.0)
        );
        assert_eq!(
            conv_str(&[EvalValue::Number(3.0)]).unwrap(),
            EvalValue::Str("3".to_string())
        );
        assert!(conv_float(&[EvalValue::Str("abc".to_string())]).is_err());
    }

    #[test]
    fn containment() {
        assert_eq!(
            pred_contains(&[
                EvalValue::Str("Automovel".to_string()),
                EvalValue::Str("Auto".to_string())
            ])
            .unwrap(),
            EvalValue::Bool(true)
        );
        assert_eq!(
            pred_contains(&[arr(&[1.0, 2.0]), EvalValue::Number(3.0)]).unwrap(),
            EvalValue::Bool(false)
        );
    }
}
