//! Halo classification errors.

use coeval_store::StoreError;
use thiserror::Error;

/// Result type for halo operations.
pub type Result<T> = std::result::Result<T, HalosError>;

/// Errors produced while building fields, catalogs or classifications.
#[derive(Debug, Error)]
pub enum HalosError {
    /// Underlying container I/O or validation failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Arrays that must agree in shape or length do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A halo mass is negative or not finite.
    #[error("invalid mass {mass} for halo {halo}")]
    InvalidMass { halo: usize, mass: f64 },

    /// Downsampling factor must be a positive integer.
    #[error("invalid scale {0}: must be positive")]
    InvalidScale(i64),

    /// A halo's low-resolution coordinate falls outside the field.
    #[error("halo {halo} at low-res coordinate {coord:?} is outside field of shape {shape:?}")]
    IndexOutOfBounds {
        halo: usize,
        coord: [i64; 3],
        shape: [usize; 3],
    },

    /// Configuration values are out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
