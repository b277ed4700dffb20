use super::{arg, def, items, iteratee, FunctionDef, Kind};
use crate::library::iteratee::{get_path, path_of};
use crate::library::{FluentLibrary, LibraryError};
use crate::value::{Object, Value};

pub(super) const FUNCTIONS: &[FunctionDef] = &[
    def("assign", Kind::Chainable, assign),
    def("get", Kind::Terminal, get),
    def("has", Kind::Terminal, has),
    def("invert", Kind::Chainable, invert),
    def("keys", Kind::Chainable, keys),
    def("mapValues", Kind::Chainable, map_values),
    def("merge", Kind::Chainable, merge),
    def("omit", Kind::Chainable, omit),
    def("pick", Kind::Chainable, pick),
    def("toPairs", Kind::Chainable, to_pairs),
    def("values", Kind::Chainable, values),
];

type Res = Result<Value, LibraryError>;

/// Own enumerable entries: object fields, array indices, string positions.
fn entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Array(_) | Value::String(_) => items(value)
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

fn target(value: &Value) -> Object {
    entries(value).into_iter().collect()
}

/// Path arguments flattened one level: `pick(o, 'a', ['b', 'c'])`.
fn paths(args: &[Value]) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    for value in args {
        match value {
            Value::Array(list) => out.extend(list.iter().map(path_of)),
            other => out.push(path_of(other)),
        }
    }
    out
}

fn assign(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut out = target(arg(args, 0));
    for source in args.iter().skip(1) {
        out.extend(entries(source));
    }
    Ok(Value::Object(out))
}

fn get(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let path = path_of(arg(args, 1));
    Ok(get_path(arg(args, 0), &path).unwrap_or_else(|| arg(args, 2).clone()))
}

fn has(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let path = path_of(arg(args, 1));
    Ok(Value::Bool(
        !path.is_empty() && get_path(arg(args, 0), &path).is_some(),
    ))
}

fn invert(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Object(
        entries(arg(args, 0))
            .into_iter()
            .map(|(k, v)| (v.to_key(), Value::String(k)))
            .collect(),
    ))
}

fn keys(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Array(
        entries(arg(args, 0))
            .into_iter()
            .map(|(k, _)| Value::String(k))
            .collect(),
    ))
}

fn values(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Array(items(arg(args, 0))))
}

fn to_pairs(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Array(
        entries(arg(args, 0))
            .into_iter()
            .map(|(k, v)| Value::Array(vec![Value::String(k), v]))
            .collect(),
    ))
}

fn map_values(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    let mut out = Object::new();
    for (key, value) in entries(arg(args, 0)) {
        out.insert(key, iteratee.apply(lib, &value)?);
    }
    Ok(Value::Object(out))
}

fn merge_into(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, value) in src {
                match dst.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        dst.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => {
            for (i, value) in src.into_iter().enumerate() {
                match dst.get_mut(i) {
                    Some(existing) => merge_into(existing, value),
                    None => dst.push(value),
                }
            }
        }
        // A null source never overwrites an existing value.
        (_, Value::Null) => {}
        (slot, value) => *slot = value,
    }
}

fn merge(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut out = Value::Object(target(arg(args, 0)));
    for source in args.iter().skip(1) {
        merge_into(&mut out, source.clone());
    }
    Ok(out)
}

fn omit(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let omitted = paths(args.get(1..).unwrap_or_default());
    let mut out = target(arg(args, 0));
    for path in omitted {
        remove_path(&mut out, &path);
    }
    Ok(Value::Object(out))
}

fn remove_path(object: &mut Object, path: &[String]) {
    match path {
        [] => {}
        [key] => {
            object.shift_remove(key);
        }
        [key, rest @ ..] => {
            if let Some(Value::Object(child)) = object.get_mut(key) {
                remove_path(child, rest);
            }
        }
    }
}

fn pick(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let source = arg(args, 0);
    let mut out = Value::Object(Object::new());
    for path in paths(args.get(1..).unwrap_or_default()) {
        if let Some(found) = get_path(source, &path) {
            set_path(&mut out, &path, found);
        }
    }
    Ok(out)
}

fn set_path(target: &mut Value, path: &[String], value: Value) {
    let Some((key, rest)) = path.split_first() else {
        *target = value;
        return;
    };
    if !matches!(target, Value::Object(_)) {
        *target = Value::Object(Object::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry(key.clone()).or_insert(Value::Null);
        set_path(slot, rest, value);
    }
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

    fn object() -> Value {
        Value::from(json!({"a": 1, "b": {"c": [10, 20]}, "d": null}))
    }

    #[test]
    fn get_and_has_walk_paths() {
        assert_eq!(call("get", vec![object(), Value::from("b.c[1]")]), Value::Number(20.0));
        assert_eq!(
            call("get", vec![object(), Value::from("x.y"), Value::from("fallback")]),
            Value::from("fallback")
        );
        assert_eq!(call("has", vec![object(), Value::from(json!(["b", "c"]))]), Value::Bool(true));
        assert_eq!(call("has", vec![object(), Value::from("z")]), Value::Bool(false));
    }

    #[test]
    fn pick_and_omit_keep_insertion_order() {
        assert_eq!(
            call("pick", vec![object(), Value::from(json!(["d", "a"]))]),
            Value::from(json!({"d": null, "a": 1}))
        );
        assert_eq!(
            call("omit", vec![object(), Value::from("b"), Value::from("d")]),
            Value::from(json!({"a": 1}))
        );
        assert_eq!(
            call("pick", vec![object(), Value::from("b.c")]),
            Value::from(json!({"b": {"c": [10, 20]}}))
        );
    }

    #[test]
    fn merge_is_deep_and_assign_is_shallow() {
        let left = Value::from(json!({"a": {"x": 1}, "list": [1, 2]}));
        let right = Value::from(json!({"a": {"y": 2}, "list": [3]}));
        assert_eq!(
            call("merge", vec![left.clone(), right.clone()]),
            Value::from(json!({"a": {"x": 1, "y": 2}, "list": [3, 2]}))
        );
        assert_eq!(
            call("assign", vec![left, right]),
            Value::from(json!({"a": {"y": 2}, "list": [3]}))
        );
    }

    #[test]
    fn entry_views() {
        assert_eq!(call("keys", vec![object()]), Value::from(json!(["a", "b", "d"])));
        assert_eq!(call("keys", vec![Value::from(json!(["x", "y"]))]), Value::from(json!(["0", "1"])));
        assert_eq!(
            call("toPairs", vec![Value::from(json!({"a": 1}))]),
            Value::from(json!([["a", 1]]))
        );
        assert_eq!(
            call("invert", vec![Value::from(json!({"a": 1, "b": "x"}))]),
            Value::from(json!({"1": "a", "x": "b"}))
        );
        assert_eq!(
            call("mapValues", vec![Value::from(json!({"a": {"n": 1}})), Value::from("n")]),
            Value::from(json!({"a": 1}))
        );
    }
}
