//! Error types for pipeline tooling.

use std::path::PathBuf;

use coeval_halos::HalosError;
use coeval_store::StoreError;
use thiserror::Error;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised while loading pipeline documents or running a pipeline step.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Failed to read a pipeline file or scan a directory.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the pipeline YAML.
    #[error("failed to parse pipeline YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid apiVersion: expected 'coeval/v1', got '{0}'")]
    InvalidApiVersion(String),

    #[error("invalid kind: expected 'Pipeline', got '{0}'")]
    InvalidKind(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Inputs that must agree on shape do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Halos(#[from] HalosError),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
