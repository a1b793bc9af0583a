//! Variant-typed value tree for s72 scene documents.
//!
//! The document grammar is JSON-compatible, but the renderer does not need a
//! general JSON stack: interior nodes are arrays or string-keyed maps, leaves
//! are numbers or strings, and every domain concept is recognized later by
//! key lookup. The parser strips whitespace outside quoted strings and then
//! splits recursively at bracket-balanced top-level commas.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::errors::{HeliosError, Result};

/// One node of the parsed document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f32),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the string payload, if this is a string leaf.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric payload, if this is a number leaf.
    #[must_use]
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the element list, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the key/value map, if this is a map.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Map lookup shorthand; `None` for non-maps and missing keys.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Serializes the tree back to document text.
    ///
    /// The output is valid input for [`parse`]; re-parsing yields a
    /// structurally equal tree.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        match self {
            Value::String(s) => {
                out.push('"');
                for c in s.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        _ => out.push(c),
                    }
                }
                out.push('"');
            }
            Value::Number(n) => {
                let _ = write!(out, "{n}");
            }
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_to(out);
                }
                out.push(']');
            }
            Value::Map(map) => {
                out.push('{');
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "\"{key}\":");
                    value.write_to(out);
                }
                out.push('}');
            }
        }
    }
}

/// Parses a document string into a value tree.
pub fn parse(text: &str) -> Result<Value> {
    let stripped = strip_whitespace(text);
    if stripped.is_empty() {
        return Err(HeliosError::Parse("empty document".into()));
    }
    parse_slice(&stripped)
}

/// Removes whitespace everywhere except inside quoted strings.
fn strip_whitespace(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ' ' | '\t' | '\n' | '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

fn parse_slice(chars: &[char]) -> Result<Value> {
    match chars.first() {
        Some('[') => parse_array(chars),
        Some('{') => parse_map(chars),
        Some('"') => parse_string(chars),
        Some(_) => parse_number(chars),
        None => Err(HeliosError::Parse("empty token".into())),
    }
}

fn parse_array(chars: &[char]) -> Result<Value> {
    let inner = strip_delimiters(chars, '[', ']')?;
    let mut items = Vec::new();
    for piece in split_top_level(inner, ',')? {
        if piece.is_empty() {
            // Empty arrays serialize as []; a dangling comma is an error.
            if inner.is_empty() {
                break;
            }
            return Err(HeliosError::Parse("empty array element".into()));
        }
        items.push(parse_slice(piece)?);
    }
    Ok(Value::Array(items))
}

fn parse_map(chars: &[char]) -> Result<Value> {
    let inner = strip_delimiters(chars, '{', '}')?;
    let mut map = BTreeMap::new();
    for piece in split_top_level(inner, ',')? {
        if piece.is_empty() {
            if inner.is_empty() {
                break;
            }
            return Err(HeliosError::Parse("empty map entry".into()));
        }
        let colon = find_top_level(piece, ':')?
            .ok_or_else(|| HeliosError::Parse("map entry without ':'".into()))?;
        let key = match parse_string(&piece[..colon])? {
            Value::String(s) => s,
            _ => unreachable!(),
        };
        let value = parse_slice(&piece[colon + 1..])?;
        map.insert(key, value);
    }
    Ok(Value::Map(map))
}

fn parse_string(chars: &[char]) -> Result<Value> {
    if chars.len() < 2 || chars[0] != '"' || chars[chars.len() - 1] != '"' {
        return Err(HeliosError::Parse(format!(
            "malformed string literal: {}",
            chars.iter().collect::<String>()
        )));
    }
    let mut out = String::new();
    let mut escaped = false;
    for &c in &chars[1..chars.len() - 1] {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    Ok(Value::String(out))
}

fn parse_number(chars: &[char]) -> Result<Value> {
    let text: String = chars.iter().collect();
    text.parse::<f32>()
        .map(Value::Number)
        .map_err(|_| HeliosError::Parse(format!("not a number: {text}")))
}

/// Checks the outermost delimiters and returns the span between them.
fn strip_delimiters(chars: &[char], open: char, close: char) -> Result<&[char]> {
    if chars.len() < 2 || chars[0] != open || chars[chars.len() - 1] != close {
        return Err(HeliosError::Parse(format!(
            "bracket mismatch: expected {open}...{close}"
        )));
    }
    Ok(&chars[1..chars.len() - 1])
}

/// Splits at occurrences of `sep` that sit at bracket depth zero, outside
/// strings.
fn split_top_level(chars: &[char], sep: char) -> Result<Vec<&[char]>> {
    let mut pieces = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(HeliosError::Parse("bracket mismatch".into()));
                }
            }
            c if c == sep && depth == 0 => {
                pieces.push(&chars[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || in_string {
        return Err(HeliosError::Parse("bracket mismatch".into()));
    }
    pieces.push(&chars[start..]);
    Ok(pieces)
}

/// First top-level occurrence of `sep`, or `None`.
fn find_top_level(chars: &[char], sep: char) -> Result<Option<usize>> {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => depth -= 1,
            c if c == sep && depth == 0 => return Ok(Some(i)),
            _ => {}
        }
    }
    Ok(None)
}
