use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced at the import/export boundary.
///
/// Material channels without a texture or factor are not errors; they are
/// resolved to documented defaults inside [`crate::import::material`].
#[derive(Error, Debug)]
pub enum PackError {
    #[error("virtual or unsupported path form rejected: {path}")]
    InvalidPath { path: String },
    #[error("failed to import scene {path}: {reason}")]
    ImportFailure { path: PathBuf, reason: String },
    #[error("could not open {path} for writing: {source}")]
    ExportOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error while writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to produce export metadata: {0}")]
    Metadata(String),
}

impl PackError {
    pub(crate) fn import_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PackError::ImportFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
