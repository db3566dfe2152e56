//! YAML adapter.
//!
//! Parsing goes through `serde_yaml`; emission is hand-built because the
//! ecosystem emitter cannot carry comments. Root keys sit at column 0 with a
//! two-space indent per nesting level, sequences are block style (`- item`)
//! except for empties (`[]`), and null renders as YAML's `null` literal —
//! YAML is the one format here whose syntax can say "explicitly empty".

use crate::schema::{Doc, DocEntry, DocNode};
use crate::value::{Map, Value};

use super::{
    FormatAdapter, ParseError, Rendered, Style, push_hash_comments, push_heading_if_changed,
};

pub(crate) struct YamlAdapter;

impl FormatAdapter for YamlAdapter {
    fn parse(&self, text: &str) -> Result<Option<Map>, ParseError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let parsed: serde_yaml::Value = serde_yaml::from_str(text)?;
        match parsed {
            serde_yaml::Value::Null => Ok(None),
            serde_yaml::Value::Mapping(m) => Ok(Some(convert_mapping(m)?)),
            _ => Err("root of a YAML config file must be a mapping".into()),
        }
    }

    fn render(&self, doc: &Doc, style: Style, _stem: &str) -> Rendered {
        let mut out = String::new();
        push_hash_comments(&mut out, "", &doc.header);
        if !doc.header.is_empty() && !doc.entries.is_empty() {
            out.push('\n');
        }
        emit_entries(&mut out, &doc.entries, 0, style);
        Rendered {
            text: out,
            companion: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn convert_mapping(mapping: serde_yaml::Mapping) -> Result<Map, ParseError> {
    let mut out = Map::new();
    for (key, value) in mapping {
        out.insert(key_to_string(&key)?, convert(value)?);
    }
    Ok(out)
}

fn key_to_string(key: &serde_yaml::Value) -> Result<String, ParseError> {
    match key {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("unsupported YAML mapping key: {other:?}").into()),
    }
}

fn convert(value: serde_yaml::Value) -> Result<Value, ParseError> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Str(n.to_string())
            }
        }
        serde_yaml::Value::String(s) => Value::Str(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Seq(items.into_iter().map(convert).collect::<Result<_, _>>()?)
        }
        serde_yaml::Value::Mapping(m) => Value::Map(convert_mapping(m)?),
        serde_yaml::Value::Tagged(tagged) => convert(tagged.value)?,
    })
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

fn emit_entries(out: &mut String, entries: &[DocEntry], indent: usize, style: Style) {
    let pad = "  ".repeat(indent);
    let mut prev_heading: Option<String> = None;
    for entry in entries {
        if style == Style::Annotated {
            push_heading_if_changed(out, &pad, &mut prev_heading, &entry.heading);
            push_hash_comments(out, &pad, &entry.comments);
        }
        match &entry.node {
            DocNode::Value(value) => emit_key_value(out, &entry.key, value, indent),
            DocNode::Section(section) => {
                if section.entries.is_empty() {
                    out.push_str(&format!("{pad}{}: {{}}\n", scalar_key(&entry.key)));
                } else {
                    out.push_str(&format!("{pad}{}:\n", scalar_key(&entry.key)));
                    if style == Style::Annotated {
                        push_hash_comments(out, &"  ".repeat(indent + 1), &section.header);
                    }
                    emit_entries(out, &section.entries, indent + 1, style);
                }
            }
        }
    }
}

fn emit_key_value(out: &mut String, key: &str, value: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    let key = scalar_key(key);
    match value {
        Value::Seq(items) if !items.is_empty() => {
            out.push_str(&format!("{pad}{key}:\n"));
            for item in items {
                emit_seq_item(out, item, indent + 1);
            }
        }
        Value::Map(map) if !map.is_empty() => {
            out.push_str(&format!("{pad}{key}:\n"));
            for (k, v) in map {
                emit_key_value(out, k, v, indent + 1);
            }
        }
        other => {
            out.push_str(&format!("{pad}{key}: {}\n", scalar_text(other)));
        }
    }
}

fn emit_seq_item(out: &mut String, item: &Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match item {
        Value::Map(map) if !map.is_empty() => {
            // First pair inline after the dash, remaining pairs aligned.
            let mut first = true;
            for (k, v) in map {
                if first {
                    out.push_str(&format!("{pad}- "));
                    first = false;
                } else {
                    out.push_str(&format!("{pad}  "));
                }
                match v {
                    Value::Seq(items) if !items.is_empty() => {
                        out.push_str(&format!("{}:\n", scalar_key(k)));
                        for nested in items {
                            emit_seq_item(out, nested, indent + 2);
                        }
                    }
                    Value::Map(m) if !m.is_empty() => {
                        out.push_str(&format!("{}:\n", scalar_key(k)));
                        for (kk, vv) in m {
                            emit_key_value(out, kk, vv, indent + 2);
                        }
                    }
                    scalar => {
                        out.push_str(&format!("{}: {}\n", scalar_key(k), scalar_text(scalar)));
                    }
                }
            }
        }
        Value::Seq(items) if !items.is_empty() => {
            out.push_str(&format!("{pad}-\n"));
            for nested in items {
                emit_seq_item(out, nested, indent + 1);
            }
        }
        other => {
            out.push_str(&format!("{pad}- {}\n", scalar_text(other)));
        }
    }
}

fn scalar_key(key: &str) -> String {
    if needs_quoting(key) {
        quote(key)
    } else {
        key.to_owned()
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_text(*f),
        Value::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        Value::Str(s) => {
            if needs_quoting(s) {
                quote(s)
            } else {
                s.clone()
            }
        }
        Value::Seq(_) => "[]".to_owned(),
        Value::Map(_) => "{}".to_owned(),
    }
}

fn float_text(f: f64) -> String {
    if f.is_finite() && f == f.trunc() {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// Whether a plain scalar would be misread by a YAML parser.
fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if s.trim() != s {
        return true;
    }
    let lowered = s.to_ascii_lowercase();
    if matches!(
        lowered.as_str(),
        "true" | "false" | "null" | "~" | "yes" | "no" | "on" | "off"
    ) {
        return true;
    }
    if s.parse::<f64>().is_ok() {
        return true;
    }
    let first = s.chars().next().unwrap_or(' ');
    if "!&*?|>%@`\"'#-{}[],".contains(first) {
        return true;
    }
    s.contains(": ")
        || s.ends_with(':')
        || s.contains(" #")
        || s.contains('\n')
        || s.contains('\t')
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    #[derive(Default)]
    struct Web {
        host: String,
        port: u16,
        tags: Vec<String>,
        retry: Retry,
    }

    #[derive(Default)]
    struct Retry {
        attempts: u8,
    }

    fn schema() -> Schema<Web> {
        let retry = Schema::builder()
            .field("attempts", |r: &Retry| r.attempts, |r, v| r.attempts = v)
            .comment("How many times to retry")
            .build()
            .unwrap();
        Schema::builder()
            .header("Web server settings")
            .field("host", |w: &Web| w.host.clone(), |w, v| w.host = v)
            .comment("Bind address")
            .heading("Network")
            .field("port", |w: &Web| w.port, |w, v| w.port = v)
            .field("tags", |w: &Web| w.tags.clone(), |w, v| w.tags = v)
            .section("retry", retry, |w| &w.retry, |w| &mut w.retry)
            .build()
            .unwrap()
    }

    fn sample() -> Web {
        Web {
            host: "localhost".into(),
            port: 8080,
            tags: vec!["a".into(), "b".into()],
            retry: Retry { attempts: 3 },
        }
    }

    #[test]
    fn annotated_output_shape() {
        let doc = schema().render(&sample());
        let text = YamlAdapter.render(&doc, Style::Annotated, "web").text;
        let expected = "\
# Web server settings

# Network
# Bind address
host: localhost
port: 8080
tags:
  - a
  - b
retry:
  # How many times to retry
  attempts: 3
";
        assert_eq!(text, expected);
    }

    #[test]
    fn plain_output_keeps_header_drops_comments() {
        let doc = schema().render(&sample());
        let text = YamlAdapter.render(&doc, Style::Plain, "web").text;
        assert!(text.starts_with("# Web server settings\n\nhost: localhost\n"));
        assert!(!text.contains("Bind address"));
        assert!(!text.contains("# Network"));
    }

    #[test]
    fn round_trip() {
        let doc = schema().render(&sample());
        let text = YamlAdapter.render(&doc, Style::Annotated, "web").text;
        let map = YamlAdapter.parse(&text).unwrap().unwrap();

        let mut loaded = Web::default();
        let mut warnings = Vec::new();
        schema().apply(&mut loaded, &map, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(loaded.host, "localhost");
        assert_eq!(loaded.port, 8080);
        assert_eq!(loaded.tags, vec!["a", "b"]);
        assert_eq!(loaded.retry.attempts, 3);
    }

    #[test]
    fn empty_collections_inline() {
        let mut web = sample();
        web.tags.clear();
        let doc = schema().render(&web);
        let text = YamlAdapter.render(&doc, Style::Annotated, "web").text;
        assert!(text.contains("tags: []\n"));
    }

    #[test]
    fn empty_file_is_not_an_error() {
        assert_eq!(YamlAdapter.parse("").unwrap(), None);
        assert_eq!(YamlAdapter.parse("   \n\n").unwrap(), None);
        assert_eq!(YamlAdapter.parse("# only comments\n").unwrap(), None);
    }

    #[test]
    fn malformed_is_hard_error() {
        assert!(YamlAdapter.parse("key: [unclosed\n").is_err());
        assert!(YamlAdapter.parse("- just\n- a list\n").is_err());
    }

    #[test]
    fn ambiguous_strings_are_quoted() {
        assert_eq!(scalar_text(&Value::Str("true".into())), "\"true\"");
        assert_eq!(scalar_text(&Value::Str("8080".into())), "\"8080\"");
        assert_eq!(scalar_text(&Value::Str("".into())), "\"\"");
        assert_eq!(scalar_text(&Value::Str("plain".into())), "plain");
        assert_eq!(scalar_text(&Value::Str("a: b".into())), "\"a: b\"");
    }

    #[test]
    fn floats_keep_a_decimal_point() {
        assert_eq!(scalar_text(&Value::Float(2.0)), "2.0");
        assert_eq!(scalar_text(&Value::Float(1.5)), "1.5");
    }

    #[test]
    fn null_renders_as_literal() {
        let doc = Doc {
            header: vec![],
            entries: vec![DocEntry {
                key: "maybe".into(),
                comments: vec![],
                heading: None,
                node: DocNode::Value(Value::Null),
            }],
        };
        let text = YamlAdapter.render(&doc, Style::Plain, "x").text;
        assert_eq!(text, "maybe: null\n");
    }

    #[test]
    fn seq_of_maps_round_trips() {
        let mut inner = Map::new();
        inner.insert("url".into(), Value::Str("a".into()));
        inner.insert("weight".into(), Value::Int(1));
        let doc = Doc {
            header: vec![],
            entries: vec![DocEntry {
                key: "servers".into(),
                comments: vec![],
                heading: None,
                node: DocNode::Value(Value::Seq(vec![Value::Map(inner.clone())])),
            }],
        };
        let text = YamlAdapter.render(&doc, Style::Plain, "x").text;
        let parsed = YamlAdapter.parse(&text).unwrap().unwrap();
        assert_eq!(parsed["servers"], Value::Seq(vec![Value::Map(inner)]));
    }
}
