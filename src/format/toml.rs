//! TOML adapter.
//!
//! Parsing goes through the `toml` crate; output is assembled with
//! `toml_edit` so comments and key order are first-class. Sections and
//! map-valued fields become `[table]` headers, struct-valued list elements
//! become inline tables, and date-times use TOML's native literal. TOML has
//! no null, so null-valued keys are omitted.

use std::str::FromStr;

use crate::coerce::parse_datetime;
use crate::schema::{Doc, DocEntry, DocNode};
use crate::value::{Map, Value};

use super::{FormatAdapter, ParseError, Rendered, Style};

pub(crate) struct TomlAdapter;

impl FormatAdapter for TomlAdapter {
    fn parse(&self, text: &str) -> Result<Option<Map>, ParseError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let table: toml::Table = text.parse()?;
        if table.is_empty() {
            // Comments only — syntactically empty.
            return Ok(None);
        }
        Ok(Some(convert_table(table)))
    }

    fn render(&self, doc: &Doc, style: Style, _stem: &str) -> Rendered {
        let root = entries_to_table(&doc.entries, style);
        let mut document = toml_edit::DocumentMut::new();
        *document.as_table_mut() = root;

        let mut text = String::new();
        for line in &doc.header {
            if line.is_empty() {
                text.push_str("#\n");
            } else {
                text.push_str("# ");
                text.push_str(line);
                text.push('\n');
            }
        }
        let body = document.to_string();
        if !text.is_empty() && !body.is_empty() {
            text.push('\n');
        }
        text.push_str(&body);
        Rendered {
            text,
            companion: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn convert_table(table: toml::Table) -> Map {
    table
        .into_iter()
        .map(|(k, v)| (k, convert(v)))
        .collect()
}

fn convert(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::Str(s),
        toml::Value::Integer(i) => Value::Int(i),
        toml::Value::Float(f) => Value::Float(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => {
            let text = dt.to_string();
            match parse_datetime(&text) {
                Ok(parsed) => Value::DateTime(parsed),
                Err(_) => Value::Str(text),
            }
        }
        toml::Value::Array(items) => Value::Seq(items.into_iter().map(convert).collect()),
        toml::Value::Table(t) => Value::Map(convert_table(t)),
    }
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

fn comment_block(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        if line.is_empty() {
            out.push_str("#\n");
        } else {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Build a `toml_edit` table from doc entries, attaching comment decor when
/// annotated. Used for the root document and, recursively, for sections.
fn entries_to_table(entries: &[DocEntry], style: Style) -> toml_edit::Table {
    let mut table = toml_edit::Table::new();
    table.set_implicit(false);
    let mut prev_heading: Option<String> = None;
    let mut first = true;

    for entry in entries {
        let mut prefix = String::new();
        if style == Style::Annotated {
            if let Some(h) = &entry.heading {
                if prev_heading.as_deref() != Some(h.as_str()) {
                    if !first {
                        prefix.push('\n');
                    }
                    prefix.push_str("# ");
                    prefix.push_str(h);
                    prefix.push('\n');
                }
            }
            prev_heading.clone_from(&entry.heading);
            prefix.push_str(&comment_block(&entry.comments));
        }

        match &entry.node {
            DocNode::Section(section) => {
                let mut comments = prefix;
                if style == Style::Annotated {
                    comments.push_str(&comment_block(&section.header));
                }
                let mut sub = entries_to_table(&section.entries, style);
                sub.decor_mut().set_prefix(format!("\n{comments}"));
                table.insert(&entry.key, toml_edit::Item::Table(sub));
            }
            DocNode::Value(Value::Map(map)) if !map.is_empty() => {
                let mut sub = map_to_table(map);
                sub.decor_mut().set_prefix(format!("\n{prefix}"));
                table.insert(&entry.key, toml_edit::Item::Table(sub));
            }
            DocNode::Value(value) => {
                if value.is_null() {
                    continue;
                }
                table.insert(&entry.key, toml_edit::value(to_toml_value(value)));
                if !prefix.is_empty() {
                    if let Some(mut key) = table.key_mut(&entry.key) {
                        key.leaf_decor_mut().set_prefix(prefix);
                    }
                }
            }
        }
        first = false;
    }
    table
}

fn map_to_table(map: &Map) -> toml_edit::Table {
    let mut table = toml_edit::Table::new();
    table.set_implicit(false);
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Map(nested) if !nested.is_empty() => {
                table.insert(key, toml_edit::Item::Table(map_to_table(nested)));
            }
            other => {
                table.insert(key, toml_edit::value(to_toml_value(other)));
            }
        }
    }
    table
}

fn to_toml_value(value: &Value) -> toml_edit::Value {
    match value {
        Value::Bool(b) => (*b).into(),
        Value::Int(i) => (*i).into(),
        Value::Float(f) => (*f).into(),
        Value::Str(s) => s.as_str().into(),
        Value::DateTime(dt) => {
            let text = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
            match toml_edit::Datetime::from_str(&text) {
                Ok(native) => native.into(),
                Err(_) => text.into(),
            }
        }
        Value::Seq(items) => {
            let mut array = toml_edit::Array::new();
            for item in items.iter().filter(|i| !i.is_null()) {
                array.push(to_toml_value(item));
            }
            array.into()
        }
        Value::Map(map) => {
            let mut inline = toml_edit::InlineTable::new();
            for (k, v) in map.iter().filter(|(_, v)| !v.is_null()) {
                inline.insert(k.as_str(), to_toml_value(v));
            }
            inline.into()
        }
        // Filtered out by the callers; render an empty string if it slips by.
        Value::Null => "".into(),
    }
}
