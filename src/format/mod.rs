//! Format adapters: one parse/render implementation per file format behind a
//! single contract, selected by file extension.
//!
//! Each adapter converts between its format's native structures and the
//! shared [`Value`](crate::value::Value) model, and renders the ordered
//! [`Doc`](crate::schema::Doc) two ways: a plain structural dump, and an
//! annotated dump carrying comments and section-group headings. Formats
//! without native comments (JSON) return a companion documentation file
//! instead.

use std::path::Path;

use crate::error::ConfbindError;
use crate::schema::Doc;
use crate::value::Map;

mod json;
mod properties;
mod toml;
mod yaml;

/// How a document should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Style {
    /// Structural dump only. The header comment is still emitted where the
    /// format's syntax tolerates leading comments.
    Plain,
    /// Comment-annotated dump: per-field comments, section-group headings,
    /// keys in registration order.
    Annotated,
}

/// A side-effect file produced alongside the main render (JSON's
/// human-readable documentation file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Companion {
    pub file_name: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Rendered {
    pub text: String,
    pub companion: Option<Companion>,
}

pub(crate) type ParseError = Box<dyn std::error::Error + Send + Sync>;

/// The per-format contract. Implementations are stateless.
pub(crate) trait FormatAdapter {
    /// Parse file text into the generic structure. `Ok(None)` means the file
    /// is syntactically empty — not an error. Malformed syntax is an error.
    fn parse(&self, text: &str) -> Result<Option<Map>, ParseError>;

    /// Render the document. `stem` is the target file's basename without
    /// extension, used for companion file naming.
    fn render(&self, doc: &Doc, style: Style, stem: &str) -> Rendered;
}

/// Select an adapter from the file extension. No content sniffing: an
/// unrecognized extension is a hard configuration error.
pub(crate) fn adapter_for(path: &Path) -> Result<Box<dyn FormatAdapter>, ConfbindError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("yaml" | "yml") => Ok(Box::new(yaml::YamlAdapter)),
        Some("json") => Ok(Box::new(json::JsonAdapter)),
        Some("toml") => Ok(Box::new(toml::TomlAdapter)),
        Some("properties") => Ok(Box::new(properties::PropertiesAdapter)),
        _ => Err(ConfbindError::UnsupportedExtension {
            path: path.to_path_buf(),
        }),
    }
}

/// Append `# `-prefixed comment lines (shared by the YAML and Properties
/// emitters).
pub(crate) fn push_hash_comments(out: &mut String, indent: &str, lines: &[String]) {
    for line in lines {
        out.push_str(indent);
        if line.is_empty() {
            out.push_str("#\n");
        } else {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
}

/// Emit a section-group heading when it differs from the previous entry's.
/// A blank separator line precedes the heading unless it is the first thing
/// after the header comment.
pub(crate) fn push_heading_if_changed(
    out: &mut String,
    indent: &str,
    prev: &mut Option<String>,
    heading: &Option<String>,
) {
    if let Some(h) = heading {
        if prev.as_deref() != Some(h.as_str()) {
            if !out.is_empty() && !out.ends_with("\n\n") {
                out.push('\n');
            }
            out.push_str(indent);
            out.push_str("# ");
            out.push_str(h);
            out.push('\n');
        }
    }
    prev.clone_from(heading);
}
