//! Coeval Halos
//!
//! Cross-references halo catalogs against ionization fields.
//!
//! 1. [`binarize`] turns continuous ionization-fraction fields into boolean
//!    [`OccupancyField`]s (neutral = 1, ionized = 0).
//! 2. [`HaloCatalog`] holds halo coordinates on the high-resolution grid and
//!    their masses.
//! 3. [`classify`] places every halo in a predicted-region subset and a
//!    ground-truth-region subset, producing a [`ClassificationResult`] that
//!    can be saved as a container.

pub mod binarize;
pub mod catalog;
pub mod classify;
pub mod error;
pub mod grid;

pub use binarize::{binarize, occupancy_batch, OccupancyField, DEFAULT_CUTOFF};
pub use catalog::HaloCatalog;
pub use classify::{classify, ClassificationResult, RegionSubset};
pub use error::{HalosError, Result};
pub use grid::GridConfig;
