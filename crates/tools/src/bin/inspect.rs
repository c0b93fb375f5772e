//! Container Inspection Tool
//!
//! Print the entries, metadata and attributes of a container together with a
//! SHA256 digest of every array.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin inspect -- --strict out/training.cbx
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use coeval_store::{CoevalDataset, Container, LoadOptions};
use coeval_tools::digest::{array_digest, fmt_value};

#[derive(Parser, Debug)]
#[command(name = "inspect")]
#[command(about = "Summarize a container and digest its arrays")]
struct Args {
    /// Container file
    file: PathBuf,

    /// Also validate the file as a coeval dataset (required keys, no NaN)
    #[arg(long)]
    strict: bool,

    /// Validate as a simulation output (no predicted field required)
    #[arg(long, requires = "strict")]
    simulation: bool,
}

fn main() {
    coeval_tools::init_logging();

    let args = Args::parse();

    let container = match Container::load(&args.file) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load '{}': {}", args.file.display(), e);
            process::exit(1);
        }
    };

    if args.strict {
        let options = if args.simulation {
            LoadOptions::simulation()
        } else {
            LoadOptions::default()
        };
        match CoevalDataset::from_container(&args.file, &container, &options) {
            Ok(dataset) => {
                info!("Valid coeval dataset with {} boxes", dataset.len());
                match dataset.random_seeds() {
                    Ok(seeds) => info!("  - Seeds: {:?}", seeds),
                    Err(e) => info!("  - Seeds: unavailable ({})", e),
                }
            }
            Err(e) => {
                error!("'{}' is not a valid coeval dataset: {}", args.file.display(), e);
                process::exit(1);
            }
        }
    }

    println!("{}", container.summary());
    println!("Digests:");
    for (key, array) in container.arrays() {
        let mean = array
            .to_f64()
            .ok()
            .and_then(|a| a.mean())
            .map(fmt_value)
            .unwrap_or_else(|| "-".to_string());
        println!("\t{key}: {} (mean {mean})", array_digest(array));
    }
}
