//! Training Set Assembly Tool
//!
//! Merge simulation outputs into a single shuffled training set.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin make-training-set -- pipelines/rseed_exclusive.yaml
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use coeval_tools::training_set::make_training_set;
use coeval_tools::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "make-training-set")]
#[command(about = "Assemble a training set from simulation outputs")]
struct Args {
    /// Pipeline document with a `trainingSet` step
    pipeline: PathBuf,

    /// Override the output path
    #[arg(short, long)]
    output: Option<PathBuf>,
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
    if let (Some(output), Some(step)) = (args.output, config.training_set.as_mut()) {
        step.output = output;
    }

    match make_training_set(&config) {
        Ok(report) => {
            info!(
                "Assembled {} boxes ({} training, {} validation)",
                report.boxes,
                report.num_train,
                report.boxes - report.num_train
            );
            println!("Training set breakdown:");
            for (z, n) in &report.train_redshifts {
                println!("\tz = {z}: {n}");
            }
            println!("Validation set breakdown:");
            for (z, n) in &report.val_redshifts {
                println!("\tz = {z}: {n}");
            }
        }
        Err(e) => {
            error!("Training set assembly failed: {}", e);
            process::exit(1);
        }
    }
}
