//! Iteratee shorthands: how a non-function argument becomes a per-item
//! callback.

use super::{FluentLibrary, LibraryError};
use crate::value::{format_number, Object, Value};

#[derive(Debug, Clone)]
pub enum Iteratee<'a> {
    Identity,
    Call(&'a Value),
    Property(Vec<String>),
    Matches(&'a Object),
    MatchesProperty(Vec<String>, &'a Value),
}

impl<'a> Iteratee<'a> {
    pub fn from_arg(arg: Option<&'a Value>) -> Self {
        static NULL: Value = Value::Null;
        match arg {
            None | Some(Value::Null) => Iteratee::Identity,
            Some(callee @ Value::Function(_)) => Iteratee::Call(callee),
            Some(Value::String(path)) => Iteratee::Property(parse_path(path)),
            Some(Value::Number(n)) => Iteratee::Property(vec![format_number(*n)]),
            Some(Value::Bool(b)) => Iteratee::Property(vec![b.to_string()]),
            Some(Value::Object(source)) => Iteratee::Matches(source),
            Some(Value::Array(pair)) => Iteratee::MatchesProperty(
                pair.first().map(path_of).unwrap_or_default(),
                pair.get(1).unwrap_or(&NULL),
            ),
        }
    }

    pub fn apply(&self, library: &FluentLibrary, item: &Value) -> Result<Value, LibraryError> {
        Ok(match self {
            Iteratee::Identity => item.clone(),
            Iteratee::Call(callee) => {
                return library.call_value(callee, std::slice::from_ref(item));
            }
            Iteratee::Property(path) => get_path(item, path).unwrap_or_default(),
            Iteratee::Matches(source) => Value::Bool(is_match(item, source)),
            Iteratee::MatchesProperty(path, expected) => Value::Bool(
                get_path(item, path).is_some_and(|actual| matches_value(&actual, expected)),
            ),
        })
    }

    pub fn test(&self, library: &FluentLibrary, item: &Value) -> Result<bool, LibraryError> {
        self.apply(library, item).map(|value| value.is_truthy())
    }
}

/// Splits `a.b[0]['c']` into `["a", "b", "0", "c"]`.
pub fn parse_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
                let quote = chars.next_if(|c| *c == '\'' || *c == '"');
                let mut inner = String::new();
                for next in chars.by_ref() {
                    if Some(next) == quote {
                        continue;
                    }
                    if next == ']' {
                        break;
                    }
                    inner.push(next);
                }
                segments.push(inner);
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

pub fn path_of(value: &Value) -> Vec<String> {
    match value {
        Value::String(path) => parse_path(path),
        Value::Array(segments) => segments.iter().map(Value::to_key).collect(),
        other => vec![other.to_key()],
    }
}

pub fn get_path(value: &Value, path: &[String]) -> Option<Value> {
    let mut current = value.clone();
    for segment in path {
        current = child(&current, segment)?;
    }
    Some(current)
}

fn child(value: &Value, key: &str) -> Option<Value> {
    match value {
        Value::Object(map) => map.get(key).cloned(),
        Value::Array(items) if key == "length" => Some(Value::from(items.len())),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
        Value::String(s) if key == "length" => Some(Value::from(s.chars().count())),
        Value::String(s) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string())),
        _ => None,
    }
}

/// Partial deep comparison: every key of `source` must match in `object`.
pub fn is_match(object: &Value, source: &Object) -> bool {
    let Some(map) = object.as_object() else {
        return source.is_empty();
    };
    source
        .iter()
        .all(|(key, expected)| map.get(key).is_some_and(|actual| matches_value(actual, expected)))
}

fn matches_value(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (_, Value::Object(source)) => is_match(actual, source),
        (Value::Array(items), Value::Array(wanted)) => wanted
            .iter()
            .all(|want| items.iter().any(|item| matches_value(item, want))),
        _ => actual.same_value_zero(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_dotted_and_bracketed_paths() {
        assert_eq!(parse_path("a.b[0]['c']"), vec!["a", "b", "0", "c"]);
        assert_eq!(parse_path("city"), vec!["city"]);
    }

    #[test]
    fn shorthands_resolve_against_items() {
        let lib = FluentLibrary::new();
        let item = Value::from(json!({"user": {"name": "ada", "tags": ["x", "y"]}, "age": 36}));

        let property = Value::from("user.name");
        assert_eq!(
            Iteratee::from_arg(Some(&property)).apply(&lib, &item).expect("property"),
            Value::from("ada")
        );

        let matches = Value::from(json!({"user": {"tags": ["y"]}}));
        assert!(Iteratee::from_arg(Some(&matches)).test(&lib, &item).expect("matches"));

        let pair = Value::from(json!(["age", 36]));
        assert!(Iteratee::from_arg(Some(&pair)).test(&lib, &item).expect("matchesProperty"));

        let missing = Value::from("nope.deeper");
        assert_eq!(
            Iteratee::from_arg(Some(&missing)).apply(&lib, &item).expect("missing"),
            Value::Null
        );
    }

    #[test]
    fn function_values_are_called() {
        let lib = FluentLibrary::new();
        let callee = Value::Function("toUpper".to_string());
        let out = Iteratee::from_arg(Some(&callee))
            .apply(&lib, &Value::from("abc"))
            .expect("call");
        assert_eq!(out, Value::from("ABC"));
    }
}
