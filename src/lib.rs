//! Bind plain structs to human-editable configuration files. Define the
//! struct, register its fields once, and go.
//!
//! ```ignore
//! let mut config = confbind::load(path, schema, true)?;
//! config.port = 9000;
//! config.save()?;
//! ```
//!
//! Confbind keeps one struct and one file in sync across YAML, JSON, TOML,
//! and Java-style Properties, chosen by file extension. Comments registered
//! alongside each field are written into the file (or, for JSON, into a
//! companion documentation file), so the config a user opens in an editor
//! explains itself.
//!
//! # Design: the schema is the source of truth
//!
//! A [`Schema`] is an explicit, ordered table of field bindings built once
//! per config type:
//!
//! - **Key order** in the file is registration order, always.
//! - **Comments and section headings** live on the bindings, so generated
//!   files never drift from the code.
//! - **Persistence is opt-in**: a struct field that is never registered is
//!   invisible to the file layer.
//! - **Sections** bind a nested struct with its own schema, serialized as a
//!   format-native sub-structure (YAML nested map, TOML `[table]`, JSON
//!   nested object, a bracketed inline encoding for Properties).
//!
//! # Smart merge
//!
//! `save()` always re-derives the file from the live object:
//!
//! - Keys in the file with no binding are dropped on the next save.
//! - Fields missing from the file keep their in-memory defaults and appear
//!   in the file after the next save.
//! - A value the user edited on disk lands in the object on `reload()` —
//!   into the *same* object, field by field, so existing references observe
//!   the update.
//!
//! # Degradation over failure
//!
//! The initial [`load`] never fails on bad content: a missing, empty, or
//! malformed file falls back to the caller's defaults (with a `tracing`
//! warning) and the file is rewritten from them. A single unconvertible
//! field — a word where a number should be, an unparsable date — is skipped
//! with a per-field [`Warning`], never an abort. Once the object is live,
//! `save()` and `reload()` surface real I/O and parse problems as
//! [`ConfbindError`].
//!
//! Saves are atomic: content goes to a sibling temp file which is renamed
//! over the target, so readers never observe a half-written config.
//!
//! # Threading
//!
//! Everything is synchronous on the caller's thread. Concurrent writers to
//! the same path race at the rename; each rename is atomic, last one wins.
//! A `Managed` value is single-owner; synchronize externally if you share
//! it.

pub mod error;

mod coerce;
mod format;
mod handle;
mod schema;
mod store;
mod value;

#[cfg(test)]
mod fixtures;

use std::path::Path;

pub use coerce::{CoerceError, FromValue, IntoValue};
pub use error::{ConfbindError, Warning};
pub use handle::Managed;
pub use schema::{Doc, DocEntry, DocNode, Schema, SchemaBuilder};
pub use value::{Map, Value};

/// Load-or-create a configuration file and return the bound handle.
///
/// If the file does not exist it is created from `T::default()` before this
/// returns. `with_comments` selects the annotated rendering (per-field
/// comments and section headings) for this handle's saves.
pub fn load<T: Default>(
    path: impl AsRef<Path>,
    schema: Schema<T>,
    with_comments: bool,
) -> Result<Managed<T>, ConfbindError> {
    load_with(path, schema, with_comments, T::default)
}

/// Like [`load`], with an explicit zero-argument factory instead of
/// `Default`.
pub fn load_with<T>(
    path: impl AsRef<Path>,
    schema: Schema<T>,
    with_comments: bool,
    factory: impl FnOnce() -> T,
) -> Result<Managed<T>, ConfbindError> {
    let store = store::Store::open(path.as_ref().to_path_buf(), with_comments)?;
    let (value, warnings) = store.load_initial(&schema, factory());
    Ok(Managed::new(value, schema, store, warnings))
}
