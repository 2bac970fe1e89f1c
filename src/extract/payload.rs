//! Embedded JSON blobs and nested-path navigation.
//!
//! SSR pages ship their state as JSON inside the HTML: a `<script id=...>`
//! tag, a `window.__STATE__ = {...}` assignment, or a bare `"key": {...}`
//! somewhere in a script. `extract_blob` cuts that region out; `navigate`
//! walks a fixed path of keys/indices down to the array of row records.
//!
//! Failures here are document-level: a missing anchor or a wrong type at any
//! hop makes the whole region unusable.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ExtractError, FieldError};

/// Where the JSON lives inside a fetched document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum BlobAnchor {
    /// Text content of `<script id="...">`.
    ScriptId(String),
    /// The JSON value right after a prefix such as `window.__STATE__ =`.
    Assignment(String),
    /// The JSON value of the first `"key":` occurrence.
    JsonKey(String),
    /// First capture group (or the whole match) of a regex.
    Pattern(String),
}

/// Cut the raw JSON text for `anchor` out of `document`.
pub fn extract_blob(document: &str, anchor: &BlobAnchor) -> Result<String, ExtractError> {
    match anchor {
        BlobAnchor::ScriptId(id) => script_by_id(document, id),
        BlobAnchor::Assignment(prefix) => {
            let start = document
                .find(prefix.as_str())
                .ok_or_else(|| ExtractError::not_found(format!("assignment '{prefix}'")))?;
            balanced_value(&document[start + prefix.len()..]).map(str::to_string)
        }
        BlobAnchor::JsonKey(key) => json_key_value(document, key).map(str::to_string),
        BlobAnchor::Pattern(pattern) => {
            let re = Regex::new(pattern)
                .map_err(|e| ExtractError::shape(format!("invalid blob pattern '{pattern}': {e}")))?;
            let caps = re
                .captures(document)
                .ok_or_else(|| ExtractError::not_found(format!("pattern '{pattern}'")))?;
            let found = caps.get(1).or_else(|| caps.get(0)).map(|m| m.as_str()).unwrap_or_default();
            Ok(found.to_string())
        }
    }
}

fn script_by_id(document: &str, id: &str) -> Result<String, ExtractError> {
    let html = Html::parse_document(document);
    let script = html
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "script" && el.value().attr("id") == Some(id))
        .ok_or_else(|| ExtractError::not_found(format!("script #{id}")))?;
    let text = script.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractError::shape(format!("script #{id} is empty")));
    }
    Ok(text.to_string())
}

fn json_key_value<'a>(document: &'a str, key: &str) -> Result<&'a str, ExtractError> {
    let needle = format!("\"{key}\"");
    let mut from = 0;
    while let Some(rel) = document[from..].find(&needle) {
        let after_key = from + rel + needle.len();
        let rest = document[after_key..].trim_start();
        if let Some(value) = rest.strip_prefix(':') {
            return balanced_value(value);
        }
        from = after_key;
    }
    Err(ExtractError::not_found(format!("JSON key '{key}'")))
}

/// The JSON value at the start of `s` (leading whitespace skipped).
///
/// Objects and arrays are matched bracket by bracket, skipping brackets inside
/// string literals; strings run to their closing quote; other scalars end at
/// the next delimiter.
fn balanced_value(s: &str) -> Result<&str, ExtractError> {
    let s = s.trim_start();
    let mut chars = s.char_indices();
    let Some((_, first)) = chars.next() else {
        return Err(ExtractError::shape("empty JSON value"));
    };

    match first {
        '{' | '[' => {
            let mut depth = 1usize;
            let mut in_string = false;
            let mut escaped = false;
            for (idx, ch) in chars {
                if in_string {
                    match ch {
                        _ if escaped => escaped = false,
                        '\\' => escaped = true,
                        '"' => in_string = false,
                        _ => {}
                    }
                    continue;
                }
                match ch {
                    '"' => in_string = true,
                    '{' | '[' => depth += 1,
                    '}' | ']' => {
                        depth -= 1;
                        if depth == 0 {
                            return Ok(&s[..idx + ch.len_utf8()]);
                        }
                    }
                    _ => {}
                }
            }
            Err(ExtractError::shape("unterminated JSON value"))
        }
        '"' => {
            let mut escaped = false;
            for (idx, ch) in chars {
                match ch {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => return Ok(&s[..idx + 1]),
                    _ => {}
                }
            }
            Err(ExtractError::shape("unterminated JSON string"))
        }
        _ => {
            let end = s
                .find(|c: char| matches!(c, ',' | '}' | ']' | ';' | '\n' | '<'))
                .unwrap_or(s.len());
            Ok(s[..end].trim_end())
        }
    }
}

/// One hop of a nested path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Key(String),
    Index(usize),
    /// First array element that is an object whose `key` equals `value`.
    Find { key: String, value: String },
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(key) => write!(f, "{key}"),
            PathStep::Index(idx) => write!(f, "[{idx}]"),
            PathStep::Find { key, value } => write!(f, "[{key}={value}]"),
        }
    }
}

/// A fixed path such as `props.pageProps.blocks[type=rates].rows[0]`.
///
/// Dots separate keys; `[n]` is an array index; `[key=value]` selects by
/// field. A bare numeric segment (`rows.0`) is a key on an object and an index
/// on an array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonPath(pub Vec<PathStep>);

impl JsonPath {
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }
}

impl FromStr for JsonPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut steps = Vec::new();
        let mut segment = String::new();
        let mut chars = s.chars();

        let flush = |segment: &mut String, steps: &mut Vec<PathStep>| {
            if segment.is_empty() {
                return;
            }
            steps.push(PathStep::Key(std::mem::take(segment)));
        };

        while let Some(ch) = chars.next() {
            match ch {
                '.' => flush(&mut segment, &mut steps),
                '[' => {
                    flush(&mut segment, &mut steps);
                    let mut selector = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(c) => selector.push(c),
                            None => return Err(format!("unclosed '[' in path '{s}'")),
                        }
                    }
                    let step = if let Some((key, value)) = selector.split_once('=') {
                        PathStep::Find {
                            key: key.trim().to_string(),
                            value: value.trim().to_string(),
                        }
                    } else {
                        let idx = selector
                            .trim()
                            .parse::<usize>()
                            .map_err(|_| format!("invalid selector '[{selector}]' in path '{s}'"))?;
                        PathStep::Index(idx)
                    };
                    steps.push(step);
                }
                _ => segment.push(ch),
            }
        }
        flush(&mut segment, &mut steps);
        Ok(JsonPath(steps))
    }
}

impl<'de> Deserialize<'de> for JsonPath {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 && matches!(step, PathStep::Key(_)) {
                f.write_str(".")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// Walk `path` from `root`; any missing key or type mismatch is a hard error.
pub fn navigate<'a>(root: &'a Value, path: &JsonPath) -> Result<&'a Value, ExtractError> {
    let mut current = root;
    for (hop, step) in path.steps().iter().enumerate() {
        let at = JsonPath(path.steps()[..=hop].to_vec());
        current = match (step, current) {
            (PathStep::Key(key), Value::Object(map)) => map
                .get(key)
                .ok_or_else(|| ExtractError::shape(format!("missing key at '{at}'")))?,
            (PathStep::Index(idx), Value::Array(items)) => items
                .get(*idx)
                .ok_or_else(|| ExtractError::shape(format!("index out of range at '{at}'")))?,
            (PathStep::Key(key), Value::Array(items)) if key.parse::<usize>().is_ok() => key
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx))
                .ok_or_else(|| ExtractError::shape(format!("index out of range at '{at}'")))?,
            (PathStep::Find { key, value }, Value::Array(items)) => items
                .iter()
                .find(|item| item.get(key).is_some_and(|v| scalar_text(v).as_deref() == Some(value.as_str())))
                .ok_or_else(|| ExtractError::shape(format!("no element matching '{at}'")))?,
            (_, other) => {
                return Err(ExtractError::shape(format!(
                    "expected {} at '{at}', found {}",
                    match step {
                        PathStep::Key(_) => "object",
                        _ => "array",
                    },
                    type_name(other)
                )));
            }
        };
    }
    Ok(current)
}

/// Parse `raw`, walk `path`, and return the object elements of the target array.
pub fn resolve_records(raw: &str, path: &JsonPath) -> Result<Vec<Map<String, Value>>, ExtractError> {
    let root: Value =
        serde_json::from_str(raw).map_err(|e| ExtractError::shape(format!("invalid JSON: {e}")))?;
    let target = navigate(&root, path)?;
    let items = target
        .as_array()
        .ok_or_else(|| ExtractError::shape(format!("'{path}' is {}, not an array", type_name(target))))?;
    Ok(items.iter().filter_map(|item| item.as_object().cloned()).collect())
}

/// Field of a row record as text; dotted keys reach into nested objects.
pub fn field_text(record: &Map<String, Value>, key: &str) -> Result<String, FieldError> {
    let mut parts = key.split('.');
    let first = parts.next().unwrap_or(key);
    let mut value = record.get(first).ok_or_else(|| FieldError::MissingField(key.to_string()))?;
    for part in parts {
        value = value.get(part).ok_or_else(|| FieldError::MissingField(key.to_string()))?;
    }
    scalar_text(value).ok_or_else(|| FieldError::MissingField(key.to_string()))
}

/// Strings and numbers as text; everything else has no text form.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
