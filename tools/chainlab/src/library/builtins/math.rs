use super::{arg, array_items, def, iteratee, map_items, FunctionDef, Kind};
use crate::library::iteratee::Iteratee;
use crate::library::{FluentLibrary, LibraryError};
use crate::value::{compare_values, Value};
use std::cmp::Ordering;

pub(super) const FUNCTIONS: &[FunctionDef] = &[
    def("add", Kind::Terminal, add),
    def("divide", Kind::Terminal, divide),
    def("max", Kind::Terminal, max),
    def("maxBy", Kind::Terminal, max_by),
    def("mean", Kind::Terminal, mean),
    def("meanBy", Kind::Terminal, mean_by),
    def("min", Kind::Terminal, min),
    def("minBy", Kind::Terminal, min_by),
    def("multiply", Kind::Terminal, multiply),
    def("round", Kind::Terminal, round),
    def("subtract", Kind::Terminal, subtract),
    def("sum", Kind::Terminal, sum),
    def("sumBy", Kind::Terminal, sum_by),
];

type Res = Result<Value, LibraryError>;

/// Binary arithmetic: a missing operand yields the other one, both missing
/// yield `default`.
fn arithmetic(args: &[Value], default: f64, op: fn(f64, f64) -> f64) -> Value {
    match (args.first(), args.get(1)) {
        (None, None) => Value::Number(default),
        (Some(only), None) | (None, Some(only)) => Value::Number(only.to_number()),
        (Some(a), Some(b)) => Value::Number(op(a.to_number(), b.to_number())),
    }
}

fn add(_lib: &FluentLibrary, args: &[Value]) -> Res {
    if let (Some(a), Some(b)) = (args.first(), args.get(1)) {
        if matches!(a, Value::String(_)) || matches!(b, Value::String(_)) {
            return Ok(Value::String(format!("{}{}", a.to_key(), b.to_key())));
        }
    }
    Ok(arithmetic(args, 0.0, |a, b| a + b))
}

fn subtract(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(arithmetic(args, 0.0, |a, b| a - b))
}

fn multiply(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(arithmetic(args, 1.0, |a, b| a * b))
}

fn divide(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(arithmetic(args, 1.0, |a, b| a / b))
}

fn round(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let n = arg(args, 0).to_number();
    let precision = match args.get(1) {
        None | Some(Value::Null) => 0,
        Some(p) => p.to_number().clamp(-292.0, 292.0) as i32,
    };
    let factor = 10f64.powi(precision.abs());
    let rounded = if precision >= 0 {
        (n * factor).round() / factor
    } else {
        (n / factor).round() * factor
    };
    Ok(Value::Number(rounded))
}

fn numeric(values: Vec<Value>) -> Vec<f64> {
    values
        .into_iter()
        .filter(|v| !v.is_null())
        .map(|v| v.to_number())
        .collect()
}

fn sum(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Number(numeric(array_items(arg(args, 0))).iter().sum()))
}

fn sum_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    let mapped = map_items(lib, &array_items(arg(args, 0)), &iteratee(args, 1))?;
    Ok(Value::Number(numeric(mapped).iter().sum()))
}

fn average(values: Vec<f64>) -> Value {
    if values.is_empty() {
        return Value::Number(f64::NAN);
    }
    Value::Number(values.iter().sum::<f64>() / values.len() as f64)
}

fn mean(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(average(numeric(array_items(arg(args, 0)))))
}

fn mean_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    let mapped = map_items(lib, &array_items(arg(args, 0)), &iteratee(args, 1))?;
    Ok(average(numeric(mapped)))
}

/// Picks the item whose key wins under `wanted`; null and NaN keys are skipped.
fn extremum(lib: &FluentLibrary, args: &[Value], by: bool, wanted: Ordering) -> Res {
    let iteratee = if by { iteratee(args, 1) } else { Iteratee::Identity };
    let mut best: Option<(Value, Value)> = None;
    for item in array_items(arg(args, 0)) {
        let key = iteratee.apply(lib, &item)?;
        if key.is_null() || key.as_f64().is_some_and(f64::is_nan) {
            continue;
        }
        let replace = match &best {
            None => true,
            Some((best_key, _)) => compare_values(&key, best_key) == wanted,
        };
        if replace {
            best = Some((key, item));
        }
    }
    Ok(best.map(|(_, item)| item).unwrap_or_default())
}

fn max(lib: &FluentLibrary, args: &[Value]) -> Res {
    extremum(lib, args, false, Ordering::Greater)
}

fn max_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    extremum(lib, args, true, Ordering::Greater)
}

fn min(lib: &FluentLibrary, args: &[Value]) -> Res {
    extremum(lib, args, false, Ordering::Less)
}

fn min_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    extremum(lib, args, true, Ordering::Less)
}

#[cfg(test)]
mod tests {
    use crate::library::FluentLibrary;
    use crate::value::Value;
    use serde_json::json;

    fn call(name: &str, args: Vec<Value>) -> Value {
        let lib = FluentLibrary::new();
        let def = lib.lookup(name).expect("registered");
        lib.apply(def, &args).expect("call succeeds")
    }

    #[test]
    fn arithmetic_handles_missing_operands() {
        assert_eq!(call("add", vec![Value::Number(1.0), Value::Number(2.0)]), Value::Number(3.0));
        assert_eq!(call("add", vec![Value::Number(4.0)]), Value::Number(4.0));
        assert_eq!(call("multiply", vec![]), Value::Number(1.0));
        assert_eq!(call("add", vec![Value::from("1"), Value::Number(2.0)]), Value::from("12"));
        assert_eq!(call("subtract", vec![Value::Number(6.0), Value::Number(4.0)]), Value::Number(2.0));
        assert_eq!(call("divide", vec![Value::Number(6.0), Value::Number(4.0)]), Value::Number(1.5));
    }

    #[test]
    fn aggregates_over_arrays() {
        let nums = Value::from(json!([4, 2, 8, 6]));
        assert_eq!(call("sum", vec![nums.clone()]), Value::Number(20.0));
        assert_eq!(call("mean", vec![nums.clone()]), Value::Number(5.0));
        assert_eq!(call("max", vec![nums.clone()]), Value::Number(8.0));
        assert_eq!(call("min", vec![nums]), Value::Number(2.0));
        assert_eq!(call("max", vec![Value::from(json!([]))]), Value::Null);
        assert_eq!(call("sum", vec![Value::from(json!([]))]), Value::Number(0.0));
    }

    #[test]
    fn by_variants_return_items() {
        let objects = Value::from(json!([{"n": 1}, {"n": 3}, {"n": 2}]));
        assert_eq!(call("maxBy", vec![objects.clone(), Value::from("n")]), Value::from(json!({"n": 3})));
        assert_eq!(call("minBy", vec![objects.clone(), Value::from("n")]), Value::from(json!({"n": 1})));
        assert_eq!(call("sumBy", vec![objects.clone(), Value::from("n")]), Value::Number(6.0));
        assert_eq!(call("meanBy", vec![objects, Value::from("n")]), Value::Number(2.0));
    }

    #[test]
    fn round_honours_precision() {
        assert_eq!(call("round", vec![Value::Number(4.006)]), Value::Number(4.0));
        assert_eq!(call("round", vec![Value::Number(4.006), Value::Number(2.0)]), Value::Number(4.01));
        assert_eq!(call("round", vec![Value::Number(4060.0), Value::Number(-2.0)]), Value::Number(4100.0));
    }
}
