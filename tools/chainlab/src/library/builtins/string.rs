use super::{arg, check_length, count, def, FunctionDef, Kind};
use crate::library::{FluentLibrary, LibraryError};
use crate::value::Value;

pub(super) const FUNCTIONS: &[FunctionDef] = &[
    def("camelCase", Kind::Terminal, camel_case),
    def("capitalize", Kind::Terminal, capitalize),
    def("endsWith", Kind::Terminal, ends_with),
    def("kebabCase", Kind::Terminal, kebab_case),
    def("padStart", Kind::Terminal, pad_start),
    def("repeat", Kind::Terminal, repeat),
    def("snakeCase", Kind::Terminal, snake_case),
    def("split", Kind::Chainable, split),
    def("startsWith", Kind::Terminal, starts_with),
    def("toLower", Kind::Terminal, to_lower),
    def("toUpper", Kind::Terminal, to_upper),
    def("trim", Kind::Terminal, trim),
];

type Res = Result<Value, LibraryError>;

fn text(args: &[Value], index: usize) -> String {
    match arg(args, index) {
        Value::Null => String::new(),
        other => other.to_key(),
    }
}

/// Splits on non-alphanumerics and at case humps: `fooBar_XMLHttp` ->
/// `foo`, `Bar`, `XML`, `Http`.
fn words(input: &str) -> Vec<String> {
    let mut words = Vec::new();
    for chunk in input.split(|c: char| !c.is_alphanumeric()) {
        let chars = chunk.chars().collect::<Vec<_>>();
        let mut current = String::new();
        for (i, &ch) in chars.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let hump = match prev {
                Some(p) if ch.is_uppercase() => {
                    p.is_lowercase() || (p.is_uppercase() && next.is_some_and(char::is_lowercase))
                }
                _ => false,
            };
            if hump && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(ch);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn camel_case(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let out = words(&text(args, 0))
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i == 0 {
                lower
            } else {
                upper_first(&lower)
            }
        })
        .collect::<String>();
    Ok(Value::String(out))
}

fn joined_lower(args: &[Value], separator: &str) -> Value {
    Value::String(
        words(&text(args, 0))
            .iter()
            .map(|word| word.to_lowercase())
            .collect::<Vec<_>>()
            .join(separator),
    )
}

fn kebab_case(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(joined_lower(args, "-"))
}

fn snake_case(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(joined_lower(args, "_"))
}

fn capitalize(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::String(upper_first(&text(args, 0).to_lowercase())))
}

fn ends_with(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Bool(text(args, 0).ends_with(&text(args, 1))))
}

fn starts_with(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::Bool(text(args, 0).starts_with(&text(args, 1))))
}

fn pad_start(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let input = text(args, 0);
    let width = count(args, 1, 0);
    check_length("padStart", width as f64)?;
    let fill = match arg(args, 2) {
        Value::Null => " ".to_string(),
        other => other.to_key(),
    };
    let have = input.chars().count();
    if have >= width || fill.is_empty() {
        return Ok(Value::String(input));
    }
    let padding = fill.chars().cycle().take(width - have).collect::<String>();
    Ok(Value::String(padding + &input))
}

fn repeat(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let input = text(args, 0);
    let times = count(args, 1, 1);
    check_length("repeat", (input.chars().count() as f64) * times as f64)?;
    Ok(Value::String(input.repeat(times)))
}

fn split(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let input = text(args, 0);
    let parts: Vec<Value> = match arg(args, 1) {
        Value::Null => vec![Value::String(input)],
        separator => {
            let separator = separator.to_key();
            if separator.is_empty() {
                input.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                input.split(separator.as_str()).map(Value::from).collect()
            }
        }
    };
    let limit = match arg(args, 2) {
        Value::Null => parts.len(),
        _ => count(args, 2, 0),
    };
    Ok(Value::Array(parts.into_iter().take(limit).collect()))
}

fn to_lower(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::String(text(args, 0).to_lowercase()))
}

fn to_upper(_lib: &FluentLibrary, args: &[Value]) -> Res {
    Ok(Value::String(text(args, 0).to_uppercase()))
}

fn trim(_lib: &FluentLibrary, args: &[Value]) -> Res {
    let input = text(args, 0);
    let out = match arg(args, 1) {
        Value::Null => input.trim().to_string(),
        chars => {
            let set = chars.to_key().chars().collect::<Vec<_>>();
            input.trim_matches(|c| set.contains(&c)).to_string()
        }
    };
    Ok(Value::String(out))
}
