//! Coeval Store
//!
//! Reads and writes named N-dimensional arrays, scalar metadata and string
//! attributes to a single self-describing container file.
//!
//! - [`Container`] is the untyped view: every entry as stored.
//! - [`CoevalDataset`] is the validated view of a coeval box dataset: required
//!   keys present, no NaN values, every array coerced to `f32`.
//!
//! ```no_run
//! use coeval_store::{Container, CoevalDataset};
//!
//! # fn main() -> coeval_store::Result<()> {
//! let dataset = CoevalDataset::load("boxes.cbx")?;
//! let redshifts = dataset.redshifts()?;
//!
//! Container::new()
//!     .with_array("redshifts", redshifts.to_owned())
//!     .with_attr("seed", 42)
//!     .save("redshifts.cbx")?;
//! # Ok(())
//! # }
//! ```

pub mod array;
pub mod container;
pub mod dataset;
pub mod error;
pub mod format;
pub mod seeds;

pub use array::{ArrayData, DType, ScalarValue, StoredArray};
pub use container::{load, save, Container, SaveOptions};
pub use dataset::{CoevalDataset, LoadOptions};
pub use error::{Result, StoreError};
pub use format::FILE_EXTENSION;
pub use seeds::parse_seed_list;
