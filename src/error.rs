use std::path::PathBuf;
use thiserror::Error;

/// The single error family for every fallible confbind operation.
///
/// Format adapters raise format-specific parse errors; they are carried here
/// as the boxed `source` so callers have one type to match on regardless of
/// which adapter was in play.
#[derive(Debug, Error)]
pub enum ConfbindError {
    #[error("Unrecognized config extension for {} (expected .yaml/.yml, .json, .toml, or .properties)", path.display())]
    UnsupportedExtension { path: PathBuf },

    #[error("Failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Duplicate key '{key}' in binding schema")]
    DuplicateKey { key: String },
}

/// A recoverable per-field problem encountered during load or reload.
///
/// Warnings never abort a load: the affected field keeps its prior value and
/// the remaining fields are processed normally. `key` is the dotted path of
/// the field (`database.pool_size`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub key: String,
    pub message: String,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}
