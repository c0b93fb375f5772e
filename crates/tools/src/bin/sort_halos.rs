//! Halo Sorting Tool
//!
//! Classify cached halo catalogs by the ionization state of their cells in
//! the ground-truth and predicted fields of a coeval dataset.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin sort-halos -- pipelines/rseed_variable_128.yaml
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info, warn};

use coeval_tools::sort::sort_halos;
use coeval_tools::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "sort-halos")]
#[command(about = "Sort halos into neutral and ionized regions")]
struct Args {
    /// Pipeline document with a `classify` step
    pipeline: PathBuf,

    /// Override the binarization cutoff
    #[arg(long)]
    cutoff: Option<f32>,
}

fn main() {
    coeval_tools::init_logging();

    let args = Args::parse();

    let mut config = match PipelineConfig::load(&args.pipeline) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load pipeline '{}': {}", args.pipeline.display(), e);
            process::exit(1);
        }
    };
    if let Some(cutoff) = args.cutoff {
        if !(cutoff > 0.0 && cutoff <= 1.0) {
            error!("Cutoff must be in (0, 1], got {}", cutoff);
            process::exit(1);
        }
        config.cutoff = cutoff;
    }

    info!("Running pipeline '{}'", config.metadata.name);
    match sort_halos(&config) {
        Ok(report) => {
            info!("Sorted {} halo catalogs", report.classified.len());
            for path in &report.classified {
                info!("  - {}", path.display());
            }
            if !report.skipped.is_empty() {
                warn!("Skipped {} catalogs with no matching box", report.skipped.len());
            }
        }
        Err(e) => {
            error!("Halo sorting failed: {}", e);
            process::exit(1);
        }
    }
}
