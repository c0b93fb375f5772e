//! Halo sorting against a coeval dataset.
//!
//! Each halo catalog in the halos directory records the redshift and random
//! seed of the snapshot it was found in. The catalog is classified against
//! the dataset box with the same redshift and seed; catalogs with no matching
//! box are skipped.

use std::path::{Path, PathBuf};

use coeval_halos::{classify, occupancy_batch, HaloCatalog};
use coeval_store::{CoevalDataset, Container, FILE_EXTENSION};
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

pub const REDSHIFT: &str = "redshift";
pub const RANDOM_SEED: &str = "random_seed";

/// A halo catalog tagged with the snapshot it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedHaloField {
    pub redshift: f64,
    pub seed: i64,
    pub catalog: HaloCatalog,
}

impl CachedHaloField {
    pub fn new(redshift: f64, seed: i64, catalog: HaloCatalog) -> Self {
        Self {
            redshift,
            seed,
            catalog,
        }
    }

    /// Read the catalog plus `redshift` and `random_seed` scalars.
    pub fn from_container(container: &Container) -> Result<Self> {
        let catalog = HaloCatalog::from_container(container)?;
        let redshift = container
            .scalar(REDSHIFT)
            .and_then(|v| v.as_float())
            .ok_or_else(|| PipelineError::MissingField(REDSHIFT.to_string()))?;
        let seed = container
            .scalar(RANDOM_SEED)
            .and_then(|v| v.as_int())
            .ok_or_else(|| PipelineError::MissingField(RANDOM_SEED.to_string()))?;
        Ok(Self::new(redshift, seed, catalog))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_container(&Container::load(path)?)
    }

    pub fn to_container(&self) -> Container {
        self.catalog
            .to_container()
            .with_scalar(REDSHIFT, self.redshift)
            .with_scalar(RANDOM_SEED, self.seed)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(self.to_container().save(path)?)
    }
}

/// Outcome of a sorting run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortReport {
    /// Classification files written.
    pub classified: Vec<PathBuf>,
    /// Catalogs with no matching box.
    pub skipped: Vec<PathBuf>,
}

/// Container files in `dir`, sorted by name.
pub fn find_halo_fields(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == FILE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// File name of the classification for one snapshot.
pub fn output_name(name: &str, redshift: f64, seed: i64) -> String {
    format!("{name}_z_{redshift}_rseed_{seed}_halos.{FILE_EXTENSION}")
}

/// Classify every cached halo catalog of the pipeline's `classify` step.
///
/// `ionized_boxes` is the ground truth and `predicted_brightness_temp_boxes`
/// the prediction; both are binarized with the pipeline cutoff.
pub fn sort_halos(config: &PipelineConfig) -> Result<SortReport> {
    let step = config.classify_step()?;
    let scale = config.scale()?;

    let dataset = CoevalDataset::load(&step.dataset)?;
    let ground_truth = occupancy_batch(dataset.ionized_boxes()?, config.cutoff)?;
    let predicted = occupancy_batch(dataset.predicted_brightness_temp_boxes()?, config.cutoff)?;

    let paths = find_halo_fields(&step.halos)?;
    info!(
        dataset = %step.dataset.display(),
        boxes = dataset.len(),
        catalogs = paths.len(),
        scale,
        "sorting halos"
    );

    let mut report = SortReport::default();
    for path in paths {
        let field = CachedHaloField::load(&path)?;

        // Redshifts are held as f32 once loaded.
        let Some(index) = dataset.box_index(field.redshift as f32, field.seed)? else {
            warn!(
                path = %path.display(),
                redshift = field.redshift,
                seed = field.seed,
                "no matching box, skipping"
            );
            report.skipped.push(path);
            continue;
        };

        let (Some(gt), Some(pred)) = (ground_truth.get(index), predicted.get(index)) else {
            return Err(PipelineError::ShapeMismatch(format!(
                "box {index} is missing from the ionization fields ({} ground truth, {} predicted)",
                ground_truth.len(),
                predicted.len()
            )));
        };

        let result = classify(&field.catalog, gt, pred, scale)?;
        let output = step
            .output
            .join(output_name(&config.metadata.name, field.redshift, field.seed));
        result.save(&output, field.seed)?;

        info!(
            redshift = field.redshift,
            seed = field.seed,
            halos = result.total_halos(),
            output = %output.display(),
            "halos sorted"
        );
        report.classified.push(output);
    }

    Ok(report)
}
