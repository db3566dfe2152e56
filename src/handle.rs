//! The configuration handle: a wrapper owning the live value together with
//! its schema and persistence delegate.
//!
//! This is composition, not inheritance: config types stay plain structs,
//! and [`Managed`] closes over them with `save`/`reload`. Because a handle
//! cannot exist without its delegate, there is no "called before attachment"
//! failure state to guard against.

use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::error::{ConfbindError, Warning};
use crate::schema::Schema;
use crate::store::Store;

/// A live configuration object bound to its backing file.
///
/// Dereferences to the config value; mutate it freely between saves.
pub struct Managed<T> {
    value: T,
    schema: Schema<T>,
    store: Store,
    warnings: Vec<Warning>,
}

impl<T> Managed<T> {
    pub(crate) fn new(value: T, schema: Schema<T>, store: Store, warnings: Vec<Warning>) -> Self {
        Managed {
            value,
            schema,
            store,
            warnings,
        }
    }

    /// Re-derive the file content from the current field values and
    /// atomically replace the backing file. Obsolete keys vanish, new fields
    /// appear with their current values.
    pub fn save(&self) -> Result<(), ConfbindError> {
        self.store.save(&self.schema, &self.value)
    }

    /// Re-read the backing file into this same value, field by field.
    /// References held to the `Managed` observe the update. A missing file
    /// is a no-op; a malformed one is an error.
    pub fn reload(&mut self) -> Result<(), ConfbindError> {
        self.warnings = self.store.reload(&self.schema, &mut self.value)?;
        Ok(())
    }

    /// Per-field warnings from the most recent load or reload.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Detach the value from its file. Dropping the handle ends persistence;
    /// the value itself is caller-owned either way.
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Managed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Managed<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}
