use super::{arg, check_length, def, FunctionDef, Kind};
use crate::library::{FluentLibrary, LibraryError};
use crate::value::Value;

pub(super) const FUNCTIONS: &[FunctionDef] = &[
    def("cloneDeep", Kind::Terminal, clone_deep),
    def("identity", Kind::Terminal, identity),
    def("isArray", Kind::Terminal, is_array),
    def("isEmpty", Kind::Terminal, is_empty),
    def("isEqual", Kind::Terminal, is_equal),
    def("isNil", Kind::Terminal, is_nil),
    def("isNumber", Kind::Terminal, is_number),
    def("isString", Kind::Terminal, is_string),
    def("range", Kind::Chainable, range),
];

type Res = Result<Value, LibraryError>;

fn clone_deep(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(arg(args, 0).clone())
}

fn identity(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(arg(args, 0).clone())
}

fn is_array(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Bool(matches!(arg(args, 0), Value::Array(_))))
}

fn is_empty(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let empty = match arg(args, 0) {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => true,
    };
    Ok(Value::Bool(empty))
}

fn is_equal(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Bool(arg(args, 0).same_value_zero(arg(args, 1))))
}

fn is_nil(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Bool(arg(args, 0).is_null()))
}

fn is_number(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Bool(matches!(arg(args, 0), Value::Number(_))))
}

fn is_string(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Bool(matches!(arg(args, 0), Value::String(_))))
}

/// `range(end)`, `range(start, end)` or `range(start, end, step)`.
fn range(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let number = |i: usize| match args.get(i) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.to_number()),
    };
    let (start, end) = match (number(0), number(1)) {
        (Some(end), None) => (0.0, end),
        (start, end) => (start.unwrap_or(0.0), end.unwrap_or(0.0)),
    };
    let step = number(2).unwrap_or(if end < start { -1.0 } else { 1.0 });
    let length = if step == 0.0 {
        (end - start).abs().ceil()
    } else {
        ((end - start) / step).ceil().max(0.0)
    };
    check_length("range", length)?;
    Ok(Value::Array(
        (0..length as usize)
            .map(|i| Value::Number(start + step * i as f64))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use crate::library::{FluentLibrary, LibraryError};
    use crate::value::Value;
    use serde_json::json;

    fn try_call(name: &str, args: Vec<Value>) -> Result<Value, LibraryError> {
        let lib = FluentLibrary::new();
        let def = lib.lookup(name).expect("registered");
        lib.apply(def, &args)
    }

    #[test]
    fn range_supports_all_arities() {
        assert_eq!(try_call("range", vec![Value::Number(4.0)]), Ok(Value::from(json!([0, 1, 2, 3]))));
        assert_eq!(
            try_call("range", vec![Value::Number(1.0), Value::Number(5.0)]),
            Ok(Value::from(json!([1, 2, 3, 4])))
        );
        assert_eq!(
            try_call("range", vec![Value::Number(0.0), Value::Number(20.0), Value::Number(5.0)]),
            Ok(Value::from(json!([0, 5, 10, 15])))
        );
        assert_eq!(try_call("range", vec![Value::Number(-3.0)]), Ok(Value::from(json!([0, -1, -2]))));
        assert_eq!(
            try_call("range", vec![Value::Number(1.0), Value::Number(4.0), Value::Number(0.0)]),
            Ok(Value::from(json!([1, 1, 1])))
        );
    }

    #[test]
    fn range_refuses_huge_arrays() {
        let err = try_call("range", vec![Value::Number(0.0), Value::Number(1e9)]).expect_err("too long");
        assert!(matches!(err, LibraryError::InvalidArrayLength { .. }));
    }

    #[test]
    fn type_predicates() {
        assert_eq!(try_call("isEmpty", vec![Value::from(json!({}))]), Ok(Value::Bool(true)));
        assert_eq!(try_call("isEmpty", vec![Value::Number(1.0)]), Ok(Value::Bool(true)));
        assert_eq!(
            try_call("isEqual", vec![Value::from(json!({"a": [1]})), Value::from(json!({"a": [1]}))]),
            Ok(Value::Bool(true))
        );
        assert_eq!(try_call("isNil", vec![]), Ok(Value::Bool(true)));
    }
}
