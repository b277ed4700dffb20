use super::{arg, contains, def, items, iteratee, map_items, FunctionDef, Kind};
use crate::library::iteratee::Iteratee;
use crate::library::{FluentLibrary, LibraryError};
use crate::value::{compare_values, Object, Value};
use std::cmp::Ordering;

pub(super) const FUNCTIONS: &[FunctionDef] = &[
    def("countBy", Kind::Chainable, count_by),
    def("every", Kind::Terminal, every),
    def("filter", Kind::Chainable, filter),
    def("find", Kind::Terminal, find),
    def("findLast", Kind::Terminal, find_last),
    def("flatMap", Kind::Chainable, flat_map),
    def("groupBy", Kind::Chainable, group_by),
    def("includes", Kind::Terminal, includes),
    def("keyBy", Kind::Chainable, key_by),
    def("map", Kind::Chainable, map),
    def("orderBy", Kind::Chainable, order_by),
    def("partition", Kind::Chainable, partition),
    def("reduce", Kind::Terminal, reduce),
    def("reject", Kind::Chainable, reject),
    def("size", Kind::Terminal, size),
    def("some", Kind::Terminal, some),
    def("sortBy", Kind::Chainable, sort_by),
];

type Res = Result<Value, LibraryError>;

fn count_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    let mut counts = Object::new();
    for item in items(arg(args, 0)) {
        let key = iteratee.apply(lib, &item)?.to_key();
        let slot = counts.entry(key).or_insert(Value::Number(0.0));
        *slot = Value::Number(slot.to_number() + 1.0);
    }
    Ok(Value::Object(counts))
}

fn every(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    for item in items(arg(args, 0)) {
        if !iteratee.test(lib, &item)? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn some(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    for item in items(arg(args, 0)) {
        if iteratee.test(lib, &item)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn select(lib: &FluentLibrary, args: &[Value], keep: bool) -> Res {
    let iteratee = iteratee(args, 1);
    let mut out = Vec::new();
    for item in items(arg(args, 0)) {
        if iteratee.test(lib, &item)? == keep {
            out.push(item);
        }
    }
    Ok(Value::Array(out))
}

fn filter(lib: &FluentLibrary, args: &[Value]) -> Res {
    select(lib, args, true)
}

fn reject(lib: &FluentLibrary, args: &[Value]) -> Res {
    select(lib, args, false)
}

fn find(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    for item in items(arg(args, 0)) {
        if iteratee.test(lib, &item)? {
            return Ok(item);
        }
    }
    Ok(Value::Null)
}

fn find_last(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    for item in items(arg(args, 0)).into_iter().rev() {
        if iteratee.test(lib, &item)? {
            return Ok(item);
        }
    }
    Ok(Value::Null)
}

fn flat_map(lib: &FluentLibrary, args: &[Value]) -> Res {
    let mapped = map_items(lib, &items(arg(args, 0)), &iteratee(args, 1))?;
    let mut out = Vec::new();
    for value in mapped {
        match value {
            Value::Array(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    Ok(Value::Array(out))
}

fn group_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    let mut groups = Object::new();
    for item in items(arg(args, 0)) {
        let key = iteratee.apply(lib, &item)?.to_key();
        if let Value::Array(bucket) = groups
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            bucket.push(item);
        }
    }
    Ok(Value::Object(groups))
}

fn includes(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let needle = arg(args, 1);
    let found = match arg(args, 0) {
        Value::String(haystack) => haystack.contains(needle.to_key().as_str()),
        other => contains(&items(other), needle),
    };
    Ok(Value::Bool(found))
}

fn key_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    let mut keyed = Object::new();
    for item in items(arg(args, 0)) {
        let key = iteratee.apply(lib, &item)?.to_key();
        keyed.insert(key, item);
    }
    Ok(Value::Object(keyed))
}

fn map(lib: &FluentLibrary, args: &[Value]) -> Res {
    map_items(lib, &items(arg(args, 0)), &iteratee(args, 1)).map(Value::Array)
}

fn partition(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratee = iteratee(args, 1);
    let (mut pass, mut fail) = (Vec::new(), Vec::new());
    for item in items(arg(args, 0)) {
        if iteratee.test(lib, &item)? {
            pass.push(item);
        } else {
            fail.push(item);
        }
    }
    Ok(Value::Array(vec![Value::Array(pass), Value::Array(fail)]))
}

fn reduce(lib: &FluentLibrary, args: &[Value]) -> Res {
    let reducer = arg(args, 1);
    if !matches!(reducer, Value::Function(_)) {
        return Err(LibraryError::ExpectedFunction {
            function: "reduce".to_string(),
        });
    }
    let mut remaining = items(arg(args, 0)).into_iter();
    let mut acc = match args.get(2) {
        Some(seed) => seed.clone(),
        None => match remaining.next() {
            Some(first) => first,
            None => return Ok(Value::Null),
        },
    };
    for item in remaining {
        acc = lib.call_value(reducer, &[acc, item])?;
    }
    Ok(acc)
}

fn size(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let n = match arg(args, 0) {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::String(s) => s.chars().count(),
        _ => 0,
    };
    Ok(Value::from(n))
}

/// Stable multi-key sort; `descending[i]` flips the i-th key.
fn sort_with(
    lib: &FluentLibrary,
    collection: &Value,
    iteratees: &[Iteratee<'_>],
    descending: &[bool],
) -> Res {
    let mut keyed = items(collection)
        .into_iter()
        .map(|item| {
            let keys = iteratees
                .iter()
                .map(|it| it.apply(lib, &item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((keys, item))
        })
        .collect::<Result<Vec<_>, LibraryError>>()?;
    keyed.sort_by(|(left, _), (right, _)| {
        left.iter()
            .zip(right)
            .enumerate()
            .map(|(i, (l, r))| {
                let ord = compare_values(l, r);
                if descending.get(i).copied().unwrap_or(false) {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    Ok(Value::Array(keyed.into_iter().map(|(_, item)| item).collect()))
}

fn sort_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    let mut iteratees = Vec::new();
    for value in args.iter().skip(1) {
        match value {
            Value::Array(list) => iteratees.extend(list.iter().map(|v| Iteratee::from_arg(Some(v)))),
            other => iteratees.push(Iteratee::from_arg(Some(other))),
        }
    }
    if iteratees.is_empty() {
        iteratees.push(Iteratee::Identity);
    }
    sort_with(lib, arg(args, 0), &iteratees, &[])
}

fn order_by(lib: &FluentLibrary, args: &[Value]) -> Res {
    let iteratees = match arg(args, 1) {
        Value::Array(list) => list.iter().map(|v| Iteratee::from_arg(Some(v))).collect(),
        Value::Null => vec![Iteratee::Identity],
        other => vec![Iteratee::from_arg(Some(other))],
    };
    let descending = match arg(args, 2) {
        Value::Array(orders) => orders.iter().map(|o| o.as_str() == Some("desc")).collect(),
        Value::String(order) => vec![order == "desc"],
        _ => Vec::new(),
    };
    sort_with(lib, arg(args, 0), &iteratees, &descending)
}
