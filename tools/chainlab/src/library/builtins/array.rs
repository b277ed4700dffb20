use super::{arg, array_items, contains, count, def, integer, iteratee, FunctionDef, Kind};
use crate::library::{FluentLibrary, LibraryError};
use crate::value::{Object, Value};

pub(super) const FUNCTIONS: &[FunctionDef] = &[
    def("chunk", Kind::Chainable, chunk),
    def("compact", Kind::Chainable, compact),
    def("concat", Kind::Chainable, concat),
    def("difference", Kind::Chainable, difference),
    def("drop", Kind::Chainable, drop),
    def("dropRight", Kind::Chainable, drop_right),
    def("first", Kind::Terminal, head),
    def("flatten", Kind::Chainable, flatten),
    def("flattenDeep", Kind::Chainable, flatten_deep),
    def("fromPairs", Kind::Chainable, from_pairs),
    def("head", Kind::Terminal, head),
    def("indexOf", Kind::Terminal, index_of),
    def("initial", Kind::Chainable, initial),
    def("intersection", Kind::Chainable, intersection),
    def("join", Kind::Terminal, join),
    def("last", Kind::Terminal, last),
    def("nth", Kind::Terminal, nth),
    def("reverse", Kind::Chainable, reverse),
    def("tail", Kind::Chainable, tail),
    def("take", Kind::Chainable, take),
    def("takeRight", Kind::Chainable, take_right),
    def("union", Kind::Chainable, union),
    def("uniq", Kind::Chainable, uniq),
    def("uniqBy", Kind::Chainable, uniq_by),
    def("without", Kind::Chainable, without),
    def("zip", Kind::Chainable, zip),
];

type Res = Result<Value, LibraryError>;

fn chunk(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let size = count(args, 1, 1);
    if size == 0 {
        return Ok(Value::Array(Vec::new()));
    }
    let items = array_items(arg(args, 0));
    Ok(Value::Array(
        items.chunks(size).map(|c| Value::Array(c.to_vec())).collect(),
    ))
}

fn compact(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Array(
        array_items(arg(args, 0))
            .into_iter()
            .filter(Value::is_truthy)
            .collect(),
    ))
}

fn concat(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut out = match arg(args, 0) {
        Value::Array(items) => items.clone(),
        Value::Null if args.is_empty() => Vec::new(),
        other => vec![other.clone()],
    };
    for value in args.iter().skip(1) {
        match value {
            Value::Array(items) => out.extend(items.iter().cloned()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::Array(out))
}

fn flatten_values(args: &[Value]) -> Vec<Value> {
    args.iter().flat_map(array_items).collect()
}

fn difference(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let excluded = flatten_values(args.get(1..).unwrap_or_default());
    Ok(Value::Array(
        array_items(arg(args, 0))
            .into_iter()
            .filter(|item| !contains(&excluded, item))
            .collect(),
    ))
}

fn drop(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let n = count(args, 1, 1);
    Ok(Value::Array(
        array_items(arg(args, 0)).into_iter().skip(n).collect(),
    ))
}

fn drop_right(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut items = array_items(arg(args, 0));
    let keep = items.len().saturating_sub(count(args, 1, 1));
    items.truncate(keep);
    Ok(Value::Array(items))
}

fn take(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let n = count(args, 1, 1);
    Ok(Value::Array(
        array_items(arg(args, 0)).into_iter().take(n).collect(),
    ))
}

fn take_right(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let items = array_items(arg(args, 0));
    let start = items.len().saturating_sub(count(args, 1, 1));
    Ok(Value::Array(items[start..].to_vec()))
}

fn flatten_into(out: &mut Vec<Value>, items: Vec<Value>, deep: bool) {
    for item in items {
        match item {
            Value::Array(inner) if deep => flatten_into(out, inner, deep),
            Value::Array(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
}

fn flatten(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut out = Vec::new();
    flatten_into(&mut out, array_items(arg(args, 0)), false);
    Ok(Value::Array(out))
}

fn flatten_deep(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut out = Vec::new();
    flatten_into(&mut out, array_items(arg(args, 0)), true);
    Ok(Value::Array(out))
}

fn from_pairs(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut map = Object::new();
    for pair in array_items(arg(args, 0)) {
        let pair = array_items(&pair);
        let key = pair.first().map(Value::to_key).unwrap_or_else(|| "undefined".to_string());
        map.insert(key, pair.get(1).cloned().unwrap_or_default());
    }
    Ok(Value::Object(map))
}

fn head(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(array_items(arg(args, 0)).into_iter().next().unwrap_or_default())
}

fn last(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(array_items(arg(args, 0)).pop().unwrap_or_default())
}

fn nth(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let items = array_items(arg(args, 0));
    let n = integer(args, 1, 0);
    let index = if n < 0 {
        i64::try_from(items.len()).unwrap_or(i64::MAX) + n
    } else {
        n
    };
    Ok(usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i).cloned())
        .unwrap_or_default())
}

fn index_of(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let items = array_items(arg(args, 0));
    let needle = arg(args, 1);
    let from = integer(args, 2, 0);
    let start = if from < 0 {
        items.len().saturating_sub(usize::try_from(-from).unwrap_or(usize::MAX))
    } else {
        usize::try_from(from).unwrap_or(usize::MAX)
    };
    let found = items
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, item)| item.same_value_zero(needle))
        .map(|(i, _)| i as f64)
        .unwrap_or(-1.0);
    Ok(Value::Number(found))
}

fn initial(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut items = array_items(arg(args, 0));
    items.pop();
    Ok(Value::Array(items))
}

fn tail(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Array(
        array_items(arg(args, 0)).into_iter().skip(1).collect(),
    ))
}

fn dedupe(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !contains(&out, &item) {
            out.push(item);
        }
    }
    out
}

fn intersection(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Value::Array(Vec::new()));
    };
    let others = rest.iter().map(array_items).collect::<Vec<_>>();
    Ok(Value::Array(dedupe(
        array_items(first)
            .into_iter()
            .filter(|item| others.iter().all(|other| contains(other, item)))
            .collect(),
    )))
}

fn join(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let separator = match arg(args, 1) {
        Value::Null => ",".to_string(),
        other => other.to_key(),
    };
    let joined = array_items(arg(args, 0))
        .iter()
        .map(|item| if item.is_null() { String::new() } else { item.to_key() })
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::String(joined))
}

fn reverse(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut items = array_items(arg(args, 0));
    items.reverse();
    Ok(Value::Array(items))
}

fn union(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Array(dedupe(flatten_values(args))))
}

fn uniq(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Array(dedupe(array_items(arg(args, 0)))))
}

fn uniq_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    let mut seen: Vec<Value> = Vec::new();
    let mut out = Vec::new();
    for item in array_items(arg(args, 0)) {
        let key = iteratee.apply(lib, &item)?;
        if !contains(&seen, &key) {
            seen.push(key);
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

fn without(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let excluded = args.get(1..).unwrap_or_default();
    Ok(Value::Array(
        array_items(arg(args, 0))
            .into_iter()
            .filter(|item| !contains(excluded, item))
            .collect(),
    ))
}

fn zip(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let arrays = args.iter().map(array_items).collect::<Vec<_>>();
    let length = arrays.iter().map(Vec::len).max().unwrap_or(0);
    Ok(Value::Array(
        (0..length)
            .map(|i| {
                Value::Array(
                    arrays
                        .iter()
                        .map(|array| array.get(i).cloned().unwrap_or_default())
                        .collect(),
                )
            })
            .collect(),
    ))
}
