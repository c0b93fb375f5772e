//! Store errors.
//!
//! Every failure is fatal to the current run. Callers are expected to surface
//! the message and abort rather than continue with a partial dataset.
//!
//! # Error Categories
//!
//! - **Format errors**: [`StoreError::Format`], [`StoreError::MissingKeys`]
//! - **Data errors**: [`StoreError::Validation`], [`StoreError::ShapeMismatch`]
//! - **I/O and codec errors**: [`StoreError::Io`], [`StoreError::Encode`],
//!   [`StoreError::Compression`]
//!
//! A payload that fails to decompress or deserialize is a format error.

use std::path::PathBuf;

use thiserror::Error;

/// Store result type alias.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors produced while reading, writing or validating containers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure while reading or writing a container.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a container, or its contents are structurally invalid.
    #[error("format error: {0}")]
    Format(String),

    /// Keys that a dataset requires are absent from the container.
    #[error("format error: missing required keys [{}]", .0.join(", "))]
    MissingKeys(Vec<String>),

    /// Loaded numeric data violates a value constraint (NaN, non-integral).
    #[error("validation error: {0}")]
    Validation(String),

    /// Array shapes disagree with what the caller asked for.
    #[error("shape mismatch for '{key}': expected {expected}, got {actual:?}")]
    ShapeMismatch {
        key: String,
        expected: String,
        actual: Vec<usize>,
    },

    /// A requested key does not exist or has the wrong entry kind.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    #[error("serialization error: {0}")]
    Encode(String),

    #[error("compression error: {0}")]
    Compression(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
