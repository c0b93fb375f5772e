//! Coeval Tools
//!
//! Pipeline configuration and the CLI workflows built on top of
//! `coeval-store` and `coeval-halos`:
//!
//! - [`sort::sort_halos`] classifies cached halo catalogs against the ground
//!   truth and predicted ionization fields of a coeval dataset.
//! - [`training_set::assemble`] merges simulation outputs into one shuffled
//!   training set.

use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod digest;
pub mod error;
pub mod sort;
pub mod training_set;

pub use config::{AssemblyMode, ClassifyConfig, PipelineConfig, TrainingInput, TrainingSetConfig};
pub use error::{PipelineError, Result};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,coeval_store=debug,coeval_halos=debug,coeval_tools=debug")
    });

    fmt().with_env_filter(filter).with_target(false).init();
}
