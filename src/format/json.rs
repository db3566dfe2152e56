//! JSON adapter.
//!
//! JSON has no comment syntax, so the annotated render cannot decorate the
//! file itself. Instead it produces a companion documentation file
//! (`<basename>-config-documentation.md`) listing the header, section
//! headings, per-field comments, and current values. Null-valued keys are
//! omitted from the main file, so "unset" and "absent" collapse to the same
//! state on reload.

use crate::schema::{Doc, DocNode};
use crate::value::{Map, Value};

use super::{Companion, FormatAdapter, ParseError, Rendered, Style};

pub(crate) struct JsonAdapter;

impl FormatAdapter for JsonAdapter {
    fn parse(&self, text: &str) -> Result<Option<Map>, ParseError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let parsed: serde_json::Value = serde_json::from_str(text)?;
        match parsed {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Object(obj) => Ok(Some(convert_object(obj))),
            _ => Err("root of a JSON config file must be an object".into()),
        }
    }

    fn render(&self, doc: &Doc, style: Style, stem: &str) -> Rendered {
        let object = doc_to_json(doc);
        let mut text =
            serde_json::to_string_pretty(&object).unwrap_or_else(|_| "{}".to_owned());
        text.push('\n');
        let companion = match style {
            Style::Annotated => Some(Companion {
                file_name: format!("{stem}-config-documentation.md"),
                text: documentation(doc, stem),
            }),
            Style::Plain => None,
        };
        Rendered { text, companion }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn convert_object(obj: serde_json::Map<String, serde_json::Value>) -> Map {
    obj.into_iter().map(|(k, v)| (k, convert(v))).collect()
}

fn convert(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                // Above i64::MAX; carried as a decimal string for lossless
                // 64-bit round trips.
                Value::Str(u.to_string())
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(items) => Value::Seq(items.into_iter().map(convert).collect()),
        serde_json::Value::Object(obj) => Value::Map(convert_object(obj)),
    }
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

fn doc_to_json(doc: &Doc) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for entry in &doc.entries {
        let value = match &entry.node {
            DocNode::Value(v) => value_to_json(v),
            DocNode::Section(section) => doc_to_json(section),
        };
        // Null keys are dropped rather than written as `null`.
        if !value.is_null() {
            out.insert(entry.key.clone(), value);
        }
    }
    serde_json::Value::Object(out)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::DateTime(dt) => {
            serde_json::Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        }
        Value::Seq(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

/// The human-readable companion document for a JSON config.
fn documentation(doc: &Doc, stem: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {stem} configuration\n"));
    for line in &doc.header {
        out.push('\n');
        out.push_str(line);
        out.push('\n');
    }
    document_entries(&mut out, doc, 0);
    out
}

fn document_entries(out: &mut String, doc: &Doc, depth: usize) {
    let mut prev_heading: Option<String> = None;
    for entry in &doc.entries {
        if let Some(h) = &entry.heading {
            if prev_heading.as_deref() != Some(h.as_str()) {
                out.push_str(&format!("\n## {h}\n"));
            }
        }
        prev_heading.clone_from(&entry.heading);

        let indent = "  ".repeat(depth);
        match &entry.node {
            DocNode::Value(value) => {
                out.push_str(&format!("\n{indent}- `{}`", entry.key));
                for line in &entry.comments {
                    out.push_str(&format!("\n{indent}  {line}"));
                }
                out.push_str(&format!("\n{indent}  current value: `{}`\n", value_summary(value)));
            }
            DocNode::Section(section) => {
                out.push_str(&format!("\n{indent}- `{}` (section)", entry.key));
                for line in &entry.comments {
                    out.push_str(&format!("\n{indent}  {line}"));
                }
                out.push('\n');
                document_entries(out, section, depth + 1);
            }
        }
    }
}

fn value_summary(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        Value::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
        Value::Seq(items) => format!(
            "[{}]",
            items
                .iter()
                .map(value_summary)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Map(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{k}={}", value_summary(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DocEntry, Schema};

    #[derive(Default)]
    struct App {
        name: String,
        workers: u32,
        label: Option<String>,
        limits: Limits,
    }

    #[derive(Default)]
    struct Limits {
        max_conns: u32,
    }

    fn schema() -> Schema<App> {
        let limits = Schema::builder()
            .field("max_conns", |l: &Limits| l.max_conns, |l, v| l.max_conns = v)
            .comment("Upper bound on open connections")
            .build()
            .unwrap();
        Schema::builder()
            .header("Application settings")
            .field("name", |a: &App| a.name.clone(), |a, v| a.name = v)
            .comment("Display name")
            .field("workers", |a: &App| a.workers, |a, v| a.workers = v)
            .heading("Tuning")
            .field("label", |a: &App| a.label.clone(), |a, v| a.label = v)
            .section("limits", limits, |a| &a.limits, |a| &mut a.limits)
            .build()
            .unwrap()
    }

    fn sample() -> App {
        App {
            name: "demo".into(),
            workers: 4,
            label: None,
            limits: Limits { max_conns: 100 },
        }
    }

    #[test]
    fn renders_pretty_object_in_key_order() {
        let doc = schema().render(&sample());
        let text = JsonAdapter.render(&doc, Style::Plain, "app").text;
        let name_pos = text.find("\"name\"").unwrap();
        let workers_pos = text.find("\"workers\"").unwrap();
        let limits_pos = text.find("\"limits\"").unwrap();
        assert!(name_pos < workers_pos && workers_pos < limits_pos);
        assert!(text.contains("  \"workers\": 4"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn null_keys_are_omitted() {
        let doc = schema().render(&sample());
        let text = JsonAdapter.render(&doc, Style::Plain, "app").text;
        assert!(!text.contains("label"));
    }

    #[test]
    fn plain_style_has_no_companion() {
        let doc = schema().render(&sample());
        assert!(JsonAdapter.render(&doc, Style::Plain, "app").companion.is_none());
    }

    #[test]
    fn annotated_style_emits_companion_doc() {
        let doc = schema().render(&sample());
        let rendered = JsonAdapter.render(&doc, Style::Annotated, "app");
        let companion = rendered.companion.unwrap();
        assert_eq!(companion.file_name, "app-config-documentation.md");
        assert!(companion.text.contains("# app configuration"));
        assert!(companion.text.contains("Application settings"));
        assert!(companion.text.contains("## Tuning"));
        assert!(companion.text.contains("`name`"));
        assert!(companion.text.contains("Display name"));
        assert!(companion.text.contains("Upper bound on open connections"));
        assert!(companion.text.contains("current value: `demo`"));
    }

    #[test]
    fn round_trip() {
        let doc = schema().render(&sample());
        let text = JsonAdapter.render(&doc, Style::Plain, "app").text;
        let map = JsonAdapter.parse(&text).unwrap().unwrap();

        let mut loaded = App::default();
        let mut warnings = Vec::new();
        schema().apply(&mut loaded, &map, &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(loaded.name, "demo");
        assert_eq!(loaded.workers, 4);
        assert_eq!(loaded.label, None);
        assert_eq!(loaded.limits.max_conns, 100);
    }

    #[test]
    fn empty_and_null_files_parse_as_empty() {
        assert_eq!(JsonAdapter.parse("").unwrap(), None);
        assert_eq!(JsonAdapter.parse("null").unwrap(), None);
    }

    #[test]
    fn malformed_is_hard_error() {
        assert!(JsonAdapter.parse("{ \"a\": ").is_err());
        assert!(JsonAdapter.parse("[1, 2]").is_err());
    }

    #[test]
    fn huge_unsigned_numbers_become_strings() {
        let text = format!("{{\"big\": {}}}", u64::MAX);
        let map = JsonAdapter.parse(&text).unwrap().unwrap();
        assert_eq!(map["big"], Value::Str(u64::MAX.to_string()));
    }

    #[test]
    fn empty_collections_render_inline() {
        let doc = Doc {
            header: vec![],
            entries: vec![DocEntry {
                key: "tags".into(),
                comments: vec![],
                heading: None,
                node: DocNode::Value(Value::Seq(vec![])),
            }],
        };
        let text = JsonAdapter.render(&doc, Style::Plain, "x").text;
        assert!(text.contains("\"tags\": []"));
    }
}
