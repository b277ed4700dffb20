//! Builtin functions of the fluent library, grouped by family.
//!
//! Every builtin takes the collection (or primary value) as its first
//! argument, which is what lets a chain container prepend its own value.

mod array;
mod collection;
mod lang;
mod math;
mod object;
mod string;

use super::iteratee::Iteratee;
use super::{FluentLibrary, LibraryError};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

pub type Builtin = fn(&FluentLibrary, &[Value]) -> Result<Value, LibraryError>;

/// Upper bound on arrays and strings a builtin may allocate.
pub const MAX_ARRAY_LENGTH: f64 = 1_000_000.0;

/// Whether a function keeps an implicit chain going or unwraps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Chainable,
    Terminal,
}

#[derive(Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub kind: Kind,
    pub call: Builtin,
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

const fn def(name: &'static str, kind: Kind, call: Builtin) -> FunctionDef {
    FunctionDef { name, kind, call }
}

pub fn registry() -> BTreeMap<&'static str, FunctionDef> {
    array::FUNCTIONS
        .iter()
        .chain(collection::FUNCTIONS)
        .chain(lang::FUNCTIONS)
        .chain(math::FUNCTIONS)
        .chain(object::FUNCTIONS)
        .chain(string::FUNCTIONS)
        .map(|def| (def.name, *def))
        .collect()
}

static NULL: Value = Value::Null;

fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

fn iteratee(args: &[Value], index: usize) -> Iteratee<'_> {
    Iteratee::from_arg(args.get(index))
}

/// Elements of an array, values of an object, characters of a string.
fn items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map.values().cloned().collect(),
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
        _ => Vec::new(),
    }
}

fn array_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        _ => Vec::new(),
    }
}

/// Integer coercion with a default for a missing or null argument.
fn integer(args: &[Value], index: usize, default: i64) -> i64 {
    match args.get(index) {
        None | Some(Value::Null) => default,
        Some(value) => {
            let n = value.to_number();
            if n.is_nan() {
                0
            } else {
                n.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64
            }
        }
    }
}

/// Count coercion: negative counts become zero.
fn count(args: &[Value], index: usize, default: i64) -> usize {
    usize::try_from(integer(args, index, default).max(0)).unwrap_or(usize::MAX)
}

fn check_length(function: &str, length: f64) -> Result<(), LibraryError> {
    if length > MAX_ARRAY_LENGTH || length.is_nan() {
        return Err(LibraryError::InvalidArrayLength {
            function: function.to_string(),
            length,
        });
    }
    Ok(())
}

fn map_items(
    lib: &FluentLibrary,
    items: &[Value],
    iteratee: &Iteratee<'_>,
) -> Result<Vec<Value>, LibraryError> {
    items.iter().map(|item| iteratee.apply(lib, item)).collect()
}

fn contains(haystack: &[Value], needle: &Value) -> bool {
    haystack.iter().any(|item| item.same_value_zero(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_unique_names_across_families() {
        let total = array::FUNCTIONS.len()
            + collection::FUNCTIONS.len()
            + lang::FUNCTIONS.len()
            + math::FUNCTIONS.len()
            + object::FUNCTIONS.len()
            + string::FUNCTIONS.len();
        assert_eq!(registry().len(), total);
    }

    #[test]
    fn integer_coercion_defaults_and_truncates() {
        let args = vec![Value::Null, Value::Number(2.9), Value::from("x")];
        assert_eq!(integer(&args, 0, 5), 5);
        assert_eq!(integer(&args, 1, 5), 2);
        assert_eq!(integer(&args, 2, 5), 0);
        assert_eq!(integer(&args, 9, 1), 1);
        assert_eq!(count(&[Value::Number(-3.0)], 0, 1), 0);
    }
}
