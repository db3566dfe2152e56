//! The field-binding schema: an ordered descriptor table per config type.
//!
//! There is no reflection here. A [`Schema`] is built once per config type
//! through [`SchemaBuilder`], registering each persisted field explicitly
//! with a getter and a setter. The schema is then the single source of truth
//! for key order, comments, section grouping, and nesting — every format
//! adapter renders from the [`Doc`] it produces, and every load applies the
//! parsed map back through it field by field.
//!
//! Persistence is opt-in: a struct field that is never registered simply
//! does not exist as far as the config file is concerned.

use std::collections::HashSet;

use crate::coerce::{CoerceError, FromValue, IntoValue};
use crate::error::{ConfbindError, Warning};
use crate::value::{Map, Value};

/// An ordered, comment-annotated document derived from a live object.
/// This is what format adapters render; they never see the object itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Doc {
    pub header: Vec<String>,
    pub entries: Vec<DocEntry>,
}

/// One key in a [`Doc`]: its comment lines, the section-group heading it
/// belongs to (if any), and its value or nested section body.
#[derive(Debug, Clone, PartialEq)]
pub struct DocEntry {
    pub key: String,
    pub comments: Vec<String>,
    pub heading: Option<String>,
    pub node: DocNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocNode {
    Value(Value),
    Section(Doc),
}

fn dotted(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

trait Binding<T> {
    fn key(&self) -> &str;
    fn push_comment(&mut self, line: String);
    fn set_heading(&mut self, text: String);
    fn entry(&self, obj: &T) -> DocEntry;
    fn apply(&self, obj: &mut T, value: &Value, prefix: &str, warnings: &mut Vec<Warning>);
}

struct FieldBinding<T> {
    key: String,
    comments: Vec<String>,
    heading: Option<String>,
    read: Box<dyn Fn(&T) -> Value>,
    write: Box<dyn Fn(&mut T, &Value) -> Result<(), CoerceError>>,
    passes_null: bool,
}

impl<T> Binding<T> for FieldBinding<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn push_comment(&mut self, line: String) {
        self.comments.push(line);
    }

    fn set_heading(&mut self, text: String) {
        self.heading = Some(text);
    }

    fn entry(&self, obj: &T) -> DocEntry {
        DocEntry {
            key: self.key.clone(),
            comments: self.comments.clone(),
            heading: self.heading.clone(),
            node: DocNode::Value((self.read)(obj)),
        }
    }

    fn apply(&self, obj: &mut T, value: &Value, prefix: &str, warnings: &mut Vec<Warning>) {
        // An explicit null means "keep the in-memory default" unless the
        // target opts in (Option fields).
        if value.is_null() && !self.passes_null {
            return;
        }
        if let Err(e) = (self.write)(obj, value) {
            let key = dotted(prefix, &self.key);
            tracing::warn!(key = %key, "skipping field: {e}");
            warnings.push(Warning {
                key,
                message: e.to_string(),
            });
        }
    }
}

struct SectionBinding<T, S> {
    key: String,
    comments: Vec<String>,
    heading: Option<String>,
    schema: Schema<S>,
    get: Box<dyn for<'a> Fn(&'a T) -> &'a S>,
    get_mut: Box<dyn for<'a> Fn(&'a mut T) -> &'a mut S>,
}

impl<T, S> Binding<T> for SectionBinding<T, S> {
    fn key(&self) -> &str {
        &self.key
    }

    fn push_comment(&mut self, line: String) {
        self.comments.push(line);
    }

    fn set_heading(&mut self, text: String) {
        self.heading = Some(text);
    }

    fn entry(&self, obj: &T) -> DocEntry {
        DocEntry {
            key: self.key.clone(),
            comments: self.comments.clone(),
            heading: self.heading.clone(),
            node: DocNode::Section(self.schema.render((self.get)(obj))),
        }
    }

    fn apply(&self, obj: &mut T, value: &Value, prefix: &str, warnings: &mut Vec<Warning>) {
        match value {
            Value::Map(map) => {
                let nested = dotted(prefix, &self.key);
                self.schema
                    .apply_at((self.get_mut)(obj), map, &nested, warnings);
            }
            Value::Null => {}
            other => {
                let key = dotted(prefix, &self.key);
                tracing::warn!(key = %key, "skipping section: expected a mapping");
                warnings.push(Warning {
                    key,
                    message: format!("expected a mapping, found {}", other.type_name()),
                });
            }
        }
    }
}

/// The ordered binding table for one config type.
///
/// Build with [`Schema::builder`]; duplicate keys are rejected at build
/// time.
pub struct Schema<T> {
    header: Vec<String>,
    bindings: Vec<Box<dyn Binding<T>>>,
    hooks: Vec<Box<dyn Fn(&mut T)>>,
}

impl<T> Schema<T> {
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder {
            header: Vec::new(),
            bindings: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Derive the ordered document from a live object.
    pub fn render(&self, obj: &T) -> Doc {
        Doc {
            header: self.header.clone(),
            entries: self.bindings.iter().map(|b| b.entry(obj)).collect(),
        }
    }

    /// Copy parsed values into an existing object, field by field.
    ///
    /// Keys missing from `map` leave their fields untouched; keys in `map`
    /// with no binding are ignored (they vanish on the next save). Coercion
    /// failures become warnings, never errors.
    pub fn apply(&self, obj: &mut T, map: &Map, warnings: &mut Vec<Warning>) {
        self.apply_at(obj, map, "", warnings);
    }

    fn apply_at(&self, obj: &mut T, map: &Map, prefix: &str, warnings: &mut Vec<Warning>) {
        for binding in &self.bindings {
            if let Some(value) = map.get(binding.key()) {
                binding.apply(obj, value, prefix, warnings);
            }
        }
    }

    /// Run the registered post-load hooks, in registration order.
    pub(crate) fn run_hooks(&self, obj: &mut T) {
        for hook in &self.hooks {
            hook(obj);
        }
    }
}

/// Fluent registration of bindings for one config type.
///
/// `comment` and `heading` attach to the most recently registered field or
/// section, mirroring how annotations sit on the field they describe:
///
/// ```ignore
/// let schema = Schema::builder()
///     .header("Server configuration")
///     .field("host", |c: &ServerConfig| c.host.clone(), |c, v| c.host = v)
///     .comment("Bind address for the listener")
///     .heading("Network")
///     .section("database", db_schema(), |c| &c.database, |c| &mut c.database)
///     .build()?;
/// ```
pub struct SchemaBuilder<T> {
    header: Vec<String>,
    bindings: Vec<Box<dyn Binding<T>>>,
    hooks: Vec<Box<dyn Fn(&mut T)>>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Add a header comment line, rendered at the top of the file.
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.header.push(line.into());
        self
    }

    /// Register a scalar/collection field under `key`.
    ///
    /// `get` reads the current value (typically a clone); `set` stores a
    /// coerced value back. The value type drives coercion through
    /// [`FromValue`]/[`IntoValue`].
    pub fn field<V, G, S>(mut self, key: impl Into<String>, get: G, set: S) -> Self
    where
        V: IntoValue + FromValue + 'static,
        G: Fn(&T) -> V + 'static,
        S: Fn(&mut T, V) + 'static,
    {
        self.bindings.push(Box::new(FieldBinding {
            key: key.into(),
            comments: Vec::new(),
            heading: None,
            read: Box::new(move |obj| get(obj).into_value()),
            write: Box::new(move |obj, value| {
                set(obj, V::from_value(value)?);
                Ok(())
            }),
            passes_null: V::accepts_null(),
        }));
        self
    }

    /// Register a nested section under `key`, serialized as a format-native
    /// sub-structure and walked by its own schema.
    pub fn section<S>(
        mut self,
        key: impl Into<String>,
        schema: Schema<S>,
        get: impl for<'a> Fn(&'a T) -> &'a S + 'static,
        get_mut: impl for<'a> Fn(&'a mut T) -> &'a mut S + 'static,
    ) -> Self
    where
        S: 'static,
    {
        self.bindings.push(Box::new(SectionBinding {
            key: key.into(),
            comments: Vec::new(),
            heading: None,
            schema,
            get: Box::new(get),
            get_mut: Box::new(get_mut),
        }));
        self
    }

    /// Attach a comment line to the last registered field or section.
    ///
    /// # Panics
    ///
    /// Panics if no field has been registered yet — a misuse of the builder,
    /// not a runtime condition.
    pub fn comment(mut self, line: impl Into<String>) -> Self {
        let binding = self
            .bindings
            .last_mut()
            .expect("comment() called before any field was registered");
        binding.push_comment(line.into());
        self
    }

    /// Start a section-group heading at the last registered field.
    /// Consecutive fields that share a heading are rendered under one
    /// heading block.
    ///
    /// # Panics
    ///
    /// Panics if no field has been registered yet.
    pub fn heading(mut self, text: impl Into<String>) -> Self {
        let binding = self
            .bindings
            .last_mut()
            .expect("heading() called before any field was registered");
        binding.set_heading(text.into());
        self
    }

    /// Register a hook invoked after every successful load and reload, for
    /// validation or derived-field computation. Multiple hooks are allowed.
    pub fn on_load(mut self, hook: impl Fn(&mut T) + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Validate the table and produce the schema. Two bindings resolving to
    /// the same key are rejected here rather than silently last-write-wins.
    pub fn build(self) -> Result<Schema<T>, ConfbindError> {
        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if !seen.insert(binding.key().to_owned()) {
                return Err(ConfbindError::DuplicateKey {
                    key: binding.key().to_owned(),
                });
            }
        }
        Ok(Schema {
            header: self.header,
            bindings: self.bindings,
            hooks: self.hooks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        host: String,
        port: u16,
        note: Option<String>,
        inner: Inner,
    }

    #[derive(Default)]
    struct Inner {
        size: u32,
    }

    fn sample_schema() -> Schema<Sample> {
        let inner = Schema::builder()
            .field("size", |i: &Inner| i.size, |i, v| i.size = v)
            .comment("Buffer size")
            .build()
            .unwrap();
        Schema::builder()
            .header("Sample config")
            .field("host", |s: &Sample| s.host.clone(), |s, v| s.host = v)
            .comment("Bind address")
            .heading("Network")
            .field("port", |s: &Sample| s.port, |s, v| s.port = v)
            .field("note", |s: &Sample| s.note.clone(), |s, v| s.note = v)
            .section("inner", inner, |s| &s.inner, |s| &mut s.inner)
            .build()
            .unwrap()
    }

    #[test]
    fn render_preserves_registration_order() {
        let mut obj = Sample::default();
        obj.host = "0.0.0.0".into();
        obj.port = 80;
        let doc = sample_schema().render(&obj);
        assert_eq!(doc.header, vec!["Sample config"]);
        let keys: Vec<&str> = doc.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["host", "port", "note", "inner"]);
        assert_eq!(doc.entries[0].heading.as_deref(), Some("Network"));
        assert_eq!(doc.entries[0].comments, vec!["Bind address"]);
        assert_eq!(doc.entries[0].node, DocNode::Value(Value::Str("0.0.0.0".into())));
        assert!(matches!(doc.entries[3].node, DocNode::Section(_)));
    }

    #[test]
    fn duplicate_keys_rejected_at_build() {
        let result = Schema::builder()
            .field("port", |s: &Sample| s.port, |s, v| s.port = v)
            .field("port", |s: &Sample| s.port, |s, v| s.port = v)
            .build();
        assert!(matches!(
            result,
            Err(ConfbindError::DuplicateKey { key }) if key == "port"
        ));
    }

    #[test]
    fn apply_sets_present_keys_and_skips_absent() {
        let schema = sample_schema();
        let mut obj = Sample {
            host: "default-host".into(),
            port: 1,
            ..Sample::default()
        };
        let mut map = Map::new();
        map.insert("port".into(), Value::Int(9000));
        let mut warnings = Vec::new();
        schema.apply(&mut obj, &map, &mut warnings);
        assert_eq!(obj.port, 9000);
        assert_eq!(obj.host, "default-host"); // absent key → default kept
        assert!(warnings.is_empty());
    }

    #[test]
    fn bad_value_warns_and_keeps_prior() {
        let schema = sample_schema();
        let mut obj = Sample {
            port: 8080,
            ..Sample::default()
        };
        let mut map = Map::new();
        map.insert("port".into(), Value::Str("not a port".into()));
        map.insert("host".into(), Value::Str("new-host".into()));
        let mut warnings = Vec::new();
        schema.apply(&mut obj, &map, &mut warnings);
        assert_eq!(obj.port, 8080);
        assert_eq!(obj.host, "new-host"); // other fields load normally
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "port");
    }

    #[test]
    fn null_preserves_default_unless_optional() {
        let schema = sample_schema();
        let mut obj = Sample {
            host: "kept".into(),
            note: Some("present".into()),
            ..Sample::default()
        };
        let mut map = Map::new();
        map.insert("host".into(), Value::Null);
        map.insert("note".into(), Value::Null);
        let mut warnings = Vec::new();
        schema.apply(&mut obj, &map, &mut warnings);
        assert_eq!(obj.host, "kept");
        assert_eq!(obj.note, None);
        assert!(warnings.is_empty());
    }

    #[test]
    fn section_applies_recursively_with_dotted_warnings() {
        let schema = sample_schema();
        let mut obj = Sample::default();

        let mut inner = Map::new();
        inner.insert("size".into(), Value::Int(64));
        let mut map = Map::new();
        map.insert("inner".into(), Value::Map(inner));
        let mut warnings = Vec::new();
        schema.apply(&mut obj, &map, &mut warnings);
        assert_eq!(obj.inner.size, 64);

        let mut bad_inner = Map::new();
        bad_inner.insert("size".into(), Value::Str("huge".into()));
        let mut map = Map::new();
        map.insert("inner".into(), Value::Map(bad_inner));
        schema.apply(&mut obj, &map, &mut warnings);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "inner.size");
    }

    #[test]
    fn non_map_for_section_warns() {
        let schema = sample_schema();
        let mut obj = Sample::default();
        let mut map = Map::new();
        map.insert("inner".into(), Value::Int(5));
        let mut warnings = Vec::new();
        schema.apply(&mut obj, &map, &mut warnings);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "inner");
    }

    #[test]
    fn hooks_run_in_registration_order() {
        let schema = Schema::builder()
            .field("port", |s: &Sample| s.port, |s, v| s.port = v)
            .on_load(|s| s.port += 1)
            .on_load(|s| s.port *= 2)
            .build()
            .unwrap();
        let mut obj = Sample {
            port: 10,
            ..Sample::default()
        };
        schema.run_hooks(&mut obj);
        assert_eq!(obj.port, 22);
    }

    #[test]
    fn bindings_may_capture_owned_state() {
        let default_host = String::from("fallback.example");
        let schema = Schema::builder()
            .field(
                "host",
                |s: &Sample| s.host.clone(),
                |s, v: String| s.host = v,
            )
            .on_load(move |s| {
                if s.host.is_empty() {
                    s.host = default_host.clone();
                }
            })
            .build()
            .unwrap();
        let mut obj = Sample::default();
        schema.run_hooks(&mut obj);
        assert_eq!(obj.host, "fallback.example");
    }

    #[test]
    fn unregistered_keys_are_ignored() {
        let schema = sample_schema();
        let mut obj = Sample::default();
        let mut map = Map::new();
        map.insert("obsolete".into(), Value::Bool(true));
        let mut warnings = Vec::new();
        schema.apply(&mut obj, &map, &mut warnings);
        assert!(warnings.is_empty());
    }
}
