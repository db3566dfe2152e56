//! The persistence delegate: one config file's load/save/reload lifecycle.
//!
//! `load_initial` is deliberately infallible from the caller's point of view
//! — a missing, empty, or unparseable file degrades to the supplied defaults
//! with a warning, and the file is (re)created from them. Once live, `save`
//! and `reload` surface real problems instead.
//!
//! Saves are all-or-nothing: the rendered text goes to a sibling temporary
//! file which is atomically renamed over the target, so a crash mid-write
//! never leaves a truncated file behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ConfbindError, Warning};
use crate::format::{self, FormatAdapter, Style};
use crate::schema::Schema;

pub(crate) struct Store {
    path: PathBuf,
    adapter: Box<dyn FormatAdapter>,
    style: Style,
}

impl Store {
    /// Select the adapter from the path's extension. Fails only for an
    /// unrecognized extension — a programmer error, not a runtime state.
    pub fn open(path: PathBuf, with_comments: bool) -> Result<Self, ConfbindError> {
        let adapter = format::adapter_for(&path)?;
        let style = if with_comments {
            Style::Annotated
        } else {
            Style::Plain
        };
        Ok(Store {
            path,
            adapter,
            style,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("config")
            .to_owned()
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// First load. Populates `obj` from the file when possible, otherwise
    /// keeps the defaults and persists them so the file exists afterwards.
    pub fn load_initial<T>(&self, schema: &Schema<T>, mut obj: T) -> (T, Vec<Warning>) {
        let mut warnings = Vec::new();
        match fs::read_to_string(&self.path) {
            Ok(text) => match self.adapter.parse(&text) {
                Ok(Some(map)) => {
                    schema.apply(&mut obj, &map, &mut warnings);
                }
                Ok(None) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        "config file is empty; writing defaults"
                    );
                    self.save_best_effort(schema, &obj);
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "config file is unparseable; falling back to defaults"
                    );
                    self.save_best_effort(schema, &obj);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    path = %self.path.display(),
                    "config file missing; creating it with defaults"
                );
                self.save_best_effort(schema, &obj);
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "cannot read config file; falling back to defaults"
                );
            }
        }
        schema.run_hooks(&mut obj);
        (obj, warnings)
    }

    fn save_best_effort<T>(&self, schema: &Schema<T>, obj: &T) {
        if let Err(e) = self.save(schema, obj) {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "could not persist defaults"
            );
        }
    }

    /// Render and atomically replace the target file. The companion
    /// documentation file (JSON, annotated style) is written afterwards.
    pub fn save<T>(&self, schema: &Schema<T>, obj: &T) -> Result<(), ConfbindError> {
        let rendered = self
            .adapter
            .render(&schema.render(obj), self.style, &self.stem());

        let parent = self.parent_dir();
        fs::create_dir_all(&parent).map_err(|e| ConfbindError::Io {
            path: parent.clone(),
            source: e,
        })?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&parent).map_err(|e| ConfbindError::Io {
                path: parent.clone(),
                source: e,
            })?;
        tmp.write_all(rendered.text.as_bytes())
            .and_then(|()| tmp.flush())
            .map_err(|e| ConfbindError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        // Temp file is removed automatically if persist never happens.
        tmp.persist(&self.path).map_err(|e| ConfbindError::Io {
            path: self.path.clone(),
            source: e.error,
        })?;

        if let Some(companion) = rendered.companion {
            let companion_path = parent.join(&companion.file_name);
            fs::write(&companion_path, companion.text).map_err(|e| ConfbindError::Io {
                path: companion_path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Re-read the file into the *same* object, field by field, so callers
    /// holding a reference observe the update. Missing file is a no-op.
    pub fn reload<T>(&self, schema: &Schema<T>, obj: &mut T) -> Result<Vec<Warning>, ConfbindError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    path = %self.path.display(),
                    "config file missing on reload; keeping in-memory state"
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ConfbindError::Io {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        let map = self
            .adapter
            .parse(&text)
            .map_err(|e| ConfbindError::Parse {
                path: self.path.clone(),
                source: e,
            })?;
        match map {
            Some(map) => {
                let mut warnings = Vec::new();
                schema.apply(obj, &map, &mut warnings);
                schema.run_hooks(obj);
                Ok(warnings)
            }
            None => {
                tracing::warn!(
                    path = %self.path.display(),
                    "config file empty on reload; keeping in-memory state"
                );
                Ok(Vec::new())
            }
        }
    }
}
