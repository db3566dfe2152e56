//! Properties adapter.
//!
//! `key=value` lines with `#` comments. The format has no native nesting, so
//! sections and collection values are serialized as a bracketed inline
//! encoding: `[a, b]` for sequences and `{k=v, k2=v2}` for mappings, nested
//! freely. Escaping: space, colon, equals, hash, and bang are escaped in
//! keys; backslash, newline, carriage return, tab, and form-feed in values.
//! Inside the inline encoding the structural characters (comma, brackets,
//! braces, equals) are escaped as well.
//!
//! No ecosystem crate speaks this dialect, so both directions are
//! hand-written. Scalars are read back heuristically (bool, then integer,
//! then float, then string); the coercion layer turns them into the exact
//! field type.

use crate::schema::{Doc, DocNode};
use crate::value::{Map, Value};

use super::{
    FormatAdapter, ParseError, Rendered, Style, push_hash_comments, push_heading_if_changed,
};

pub(crate) struct PropertiesAdapter;

impl FormatAdapter for PropertiesAdapter {
    fn parse(&self, text: &str) -> Result<Option<Map>, ParseError> {
        let mut map = Map::new();
        for (number, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let split = find_unescaped(line, &['=', ':'])
                .ok_or_else(|| format!("line {}: missing '=' separator", number + 1))?;
            let key = unescape(line[..split].trim());
            let value = parse_value(line[split + 1..].trim())
                .map_err(|e| format!("line {}: {e}", number + 1))?;
            map.insert(key, value);
        }
        if map.is_empty() {
            return Ok(None);
        }
        Ok(Some(map))
    }

    fn render(&self, doc: &Doc, style: Style, _stem: &str) -> Rendered {
        let mut out = String::new();
        push_hash_comments(&mut out, "", &doc.header);
        if !doc.header.is_empty() && !doc.entries.is_empty() {
            out.push('\n');
        }
        let mut prev_heading: Option<String> = None;
        for entry in &doc.entries {
            if style == Style::Annotated {
                push_heading_if_changed(&mut out, "", &mut prev_heading, &entry.heading);
                push_hash_comments(&mut out, "", &entry.comments);
            }
            match &entry.node {
                DocNode::Value(Value::Null) => {} // no null marker; key omitted
                DocNode::Value(value) => {
                    out.push_str(&escape_key(&entry.key));
                    out.push('=');
                    out.push_str(&value_text(value));
                    out.push('\n');
                }
                DocNode::Section(section) => {
                    out.push_str(&escape_key(&entry.key));
                    out.push('=');
                    out.push_str(&section_text(section));
                    out.push('\n');
                }
            }
        }
        Rendered {
            text: out,
            companion: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            ' ' | ':' | '=' | '#' | '!' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

fn escape_value(value: &str, inline: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{c}' => out.push_str("\\f"),
            ',' | '[' | ']' | '{' | '}' | '=' if inline => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{c}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Byte index of the first occurrence of any of `needles` not preceded by a
/// backslash.
fn find_unescaped(text: &str, needles: &[char]) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if needles.contains(&c) {
            return Some(i);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

fn value_text(value: &Value) -> String {
    render_value(value, false)
}

fn render_value(value: &Value, inline: bool) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            if f.is_finite() && *f == f.trunc() {
                format!("{f:.1}")
            } else {
                f.to_string()
            }
        }
        Value::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        Value::Str(s) => {
            let mut text = escape_value(s, inline);
            // A literal leading bracket would be misread as the inline
            // collection encoding.
            if !inline && (text.starts_with('[') || text.starts_with('{')) {
                text.insert(0, '\\');
            }
            text
        }
        Value::Seq(items) => format!(
            "[{}]",
            items
                .iter()
                .filter(|i| !i.is_null())
                .map(|i| render_value(i, true))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Map(map) => format!(
            "{{{}}}",
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| format!("{}={}", escape_value(k, true), render_value(v, true)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn section_text(doc: &Doc) -> String {
    let pairs: Vec<String> = doc
        .entries
        .iter()
        .filter_map(|entry| {
            let value = match &entry.node {
                DocNode::Value(Value::Null) => return None,
                DocNode::Value(v) => render_value(v, true),
                DocNode::Section(nested) => section_text(nested),
            };
            Some(format!("{}={}", escape_value(&entry.key, true), value))
        })
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_value(text: &str) -> Result<Value, String> {
    if text.starts_with('[') {
        if !text.ends_with(']') {
            return Err(format!("unterminated sequence: '{text}'"));
        }
        let inner = &text[1..text.len() - 1];
        let mut items = Vec::new();
        for piece in split_top_level(inner)? {
            items.push(parse_value(piece.trim())?);
        }
        return Ok(Value::Seq(items));
    }
    if text.starts_with('{') {
        if !text.ends_with('}') {
            return Err(format!("unterminated mapping: '{text}'"));
        }
        let inner = &text[1..text.len() - 1];
        let mut map = Map::new();
        for piece in split_top_level(inner)? {
            let piece = piece.trim();
            let split = find_unescaped(piece, &['='])
                .ok_or_else(|| format!("mapping entry without '=': '{piece}'"))?;
            let key = unescape(piece[..split].trim());
            let value = parse_value(piece[split + 1..].trim())?;
            map.insert(key, value);
        }
        return Ok(Value::Map(map));
    }
    Ok(scalar_heuristic(text))
}

/// Split on top-level commas, respecting nesting and escapes.
fn split_top_level(text: &str) -> Result<Vec<&str>, String> {
    let mut pieces = Vec::new();
    if text.trim().is_empty() {
        return Ok(pieces);
    }
    let mut depth = 0usize;
    let mut escaped = false;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced brackets in '{text}'"))?;
            }
            ',' if depth == 0 => {
                pieces.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(format!("unbalanced brackets in '{text}'"));
    }
    pieces.push(&text[start..]);
    Ok(pieces)
}

/// true/false, then integer, then float, then string.
fn scalar_heuristic(text: &str) -> Value {
    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Int(i);
    }
    if text.contains(['.', 'e', 'E']) {
        if let Ok(f) = text.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::Str(unescape(text))
}
