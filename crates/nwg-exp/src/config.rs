use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use nwg_core::errors::{ErrorInfo, NwgError};
use nwg_core::params::{ParamValue, ParameterSpec, Scalar};

/// Section whose options are inherited by every other section.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Option that receives the section name.
pub const NAME_KEY: &str = "name";

fn config_error(code: &str, message: impl Into<String>, line: usize) -> NwgError {
    NwgError::Config(ErrorInfo::new(code, message).with_context("line", line.to_string()))
}

/// Reads and parses an experiment configuration file.
///
/// A missing or unreadable file is a [`NwgError::Config`] error.
pub fn load_config(path: &Path) -> Result<Vec<ParameterSpec>, NwgError> {
    let text = fs::read_to_string(path).map_err(|err| {
        NwgError::Config(
            ErrorInfo::new("config-read", format!("config file {} not found", path.display()))
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    parse_config(&text)
}

/// Parses section-based `key = value` text into one [`ParameterSpec`] per section.
///
/// Keys are lower-cased, `#` and `;` start comment lines, indented lines
/// continue the previous value, and `[DEFAULT]` options are inherited by every
/// section that does not override them.
pub fn parse_config(text: &str) -> Result<Vec<ParameterSpec>, NwgError> {
    let mut defaults: IndexMap<String, String> = IndexMap::new();
    let mut sections: IndexMap<String, IndexMap<String, String>> = IndexMap::new();
    let mut current: Option<String> = None;
    let mut last_key: Option<String> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }
        if raw_line.starts_with(char::is_whitespace) {
            if let (Some(section), Some(key)) = (current.as_ref(), last_key.as_ref()) {
                let table = if section == DEFAULT_SECTION {
                    &mut defaults
                } else {
                    sections.entry(section.clone()).or_default()
                };
                if let Some(value) = table.get_mut(key) {
                    value.push('\n');
                    value.push_str(trimmed);
                    continue;
                }
            }
            return Err(config_error(
                "config-continuation",
                "continuation line without a preceding option",
                line_no,
            ));
        }
        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.strip_suffix(']').ok_or_else(|| {
                config_error("config-section", "unterminated section header", line_no)
            })?;
            let name = name.trim().to_string();
            if name != DEFAULT_SECTION {
                sections.entry(name.clone()).or_default();
            }
            current = Some(name);
            last_key = None;
            continue;
        }
        let Some(section) = current.as_ref() else {
            return Err(config_error(
                "config-no-section",
                "option appears before any section header",
                line_no,
            ));
        };
        let split = trimmed
            .find(|c| c == '=' || c == ':')
            .ok_or_else(|| config_error("config-option", "expected `key = value`", line_no))?;
        let key = trimmed[..split].trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(config_error("config-option", "empty option name", line_no));
        }
        let value = trimmed[split + 1..].trim().to_string();
        let table = if section == DEFAULT_SECTION {
            &mut defaults
        } else {
            sections.entry(section.clone()).or_default()
        };
        table.insert(key.clone(), value);
        last_key = Some(key);
    }

    Ok(sections
        .into_iter()
        .map(|(name, table)| {
            let mut spec = ParameterSpec::new(name.clone());
            for (key, value) in defaults.iter().filter(|(key, _)| !table.contains_key(*key)) {
                spec.options.insert(key.clone(), parse_value(value));
            }
            for (key, value) in table {
                spec.options.insert(key, parse_value(&value));
            }
            spec.options
                .insert(NAME_KEY.to_string(), ParamValue::Scalar(Scalar::Str(name)));
            spec
        })
        .collect())
}

/// Parses one configuration value.
///
/// Recognises `True`/`False`, `None`, integers, floats, quoted strings,
/// `[..]`/`(..)` collections of scalars and `range(..)`. Text that matches none
/// of these is kept verbatim as a string.
pub fn parse_value(raw: &str) -> ParamValue {
    let text = raw.trim();
    if let Some(values) = parse_collection(text) {
        return ParamValue::List(values);
    }
    if let Some(values) = parse_range(text) {
        return ParamValue::List(values);
    }
    if let Some(inner) = text.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        if let Some(value) = parse_literal(inner.trim()) {
            return ParamValue::Scalar(value);
        }
    }
    ParamValue::Scalar(parse_literal(text).unwrap_or_else(|| Scalar::Str(text.to_string())))
}

fn parse_literal(text: &str) -> Option<Scalar> {
    match text {
        "True" => return Some(Scalar::Bool(true)),
        "False" => return Some(Scalar::Bool(false)),
        "None" => return Some(Scalar::Null),
        _ => {}
    }
    if let Some(inner) = strip_quotes(text) {
        return Some(Scalar::Str(inner.to_string()));
    }
    if !looks_numeric(text) {
        return None;
    }
    if let Ok(value) = text.parse::<i64>() {
        return Some(Scalar::Int(value));
    }
    text.parse::<f64>().ok().map(Scalar::Float)
}

fn strip_quotes(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' || first == b'"') && first == last {
            let inner = &text[1..text.len() - 1];
            if !inner.contains(first as char) {
                return Some(inner);
            }
        }
    }
    None
}

fn looks_numeric(text: &str) -> bool {
    !text.is_empty()
        && text.chars().any(|c| c.is_ascii_digit())
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
}

fn parse_collection(text: &str) -> Option<Vec<Scalar>> {
    let (open, close) = match text.chars().next()? {
        '[' => ('[', ']'),
        '(' => ('(', ')'),
        _ => return None,
    };
    let inner = text.strip_prefix(open)?.strip_suffix(close)?;
    let items = split_items(inner)?;
    // `(x)` is a parenthesised scalar, `(x,)` a one-element tuple.
    if open == '(' && items.len() == 1 && !inner.trim_end().ends_with(',') {
        return None;
    }
    items.iter().map(|item| parse_literal(item)).collect()
}

fn split_items(inner: &str) -> Option<Vec<String>> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in inner.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[' | ']' | '(' | ')') => return None,
            (None, ',') => {
                items.push(current.trim().to_string());
                current.clear();
            }
            (None, c) => current.push(c),
        }
    }
    if quote.is_some() {
        return None;
    }
    let tail = current.trim();
    if !tail.is_empty() {
        items.push(tail.to_string());
    } else if items.last().is_some_and(|item| item.is_empty()) {
        return None;
    }
    if items.iter().any(String::is_empty) {
        return None;
    }
    Some(items)
}

fn parse_range(text: &str) -> Option<Vec<Scalar>> {
    let args = text.strip_prefix("range(")?.strip_suffix(')')?;
    let bounds = args
        .split(',')
        .map(|arg| arg.trim().parse::<i64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] if *step != 0 => (*start, *stop, *step),
        _ => return None,
    };
    let mut values = Vec::new();
    let mut value = start;
    while (step > 0 && value < stop) || (step < 0 && value > stop) {
        values.push(Scalar::Int(value));
        value += step;
    }
    Some(values)
}
