//! Integration test harness for the coeval pipeline.
//!
//! This crate writes synthetic inputs into a scratch directory so tests can
//! drive the full pipeline: Write fixtures → Load → Binarize → Classify or
//! Assemble → Verify.

use std::path::{Path, PathBuf};

use coeval_halos::{GridConfig, HaloCatalog};
use coeval_store::dataset::{
    BRIGHTNESS_TEMP_BOXES, IONIZED_BOXES, PREDICTED_BRIGHTNESS_TEMP_BOXES, RANDOM_SEEDS,
    REDSHIFTS, WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES,
};
use coeval_store::Container;
use coeval_tools::sort::CachedHaloField;
use coeval_tools::PipelineConfig;
use ndarray::{stack, Array3, Array4, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

/// One box of a synthetic coeval dataset.
#[derive(Debug, Clone)]
pub struct SyntheticBox {
    pub redshift: f32,
    pub seed: i64,
    pub ground_truth: Array3<f32>,
    pub predicted: Array3<f32>,
}

/// Field of side `n` whose cells are neutral (1.0) below `x = neutral_below`
/// and ionized (0.0) elsewhere.
pub fn slab_field(n: usize, neutral_below: usize) -> Array3<f32> {
    Array3::from_shape_fn((n, n, n), |(x, _, _)| if x < neutral_below { 1.0 } else { 0.0 })
}

/// `count` halos uniformly placed on a `dim`-cell grid, masses in
/// `[1e8, 1e12)`.
pub fn random_catalog(seed: u64, count: usize, dim: i64) -> HaloCatalog {
    let mut rng = StdRng::seed_from_u64(seed);
    let coords = (0..count)
        .map(|_| {
            [
                rng.gen_range(0..dim),
                rng.gen_range(0..dim),
                rng.gen_range(0..dim),
            ]
        })
        .collect();
    let masses = (0..count).map(|_| rng.gen_range(1.0e8..1.0e12)).collect();
    match HaloCatalog::new(coords, masses) {
        Ok(catalog) => catalog,
        Err(e) => panic!("synthetic catalog rejected: {e}"),
    }
}

/// Scratch directory plus the grid its fixtures are built on.
pub struct TestHarness {
    dir: TempDir,
    grid: GridConfig,
}

impl TestHarness {
    /// Create a harness in a fresh temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created or the grid is invalid.
    pub fn new(grid: GridConfig) -> Self {
        if let Err(e) = grid.validate() {
            panic!("invalid test grid: {e}");
        }
        let dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => panic!("failed to create scratch directory: {e}"),
        };
        Self { dir, grid }
    }

    pub fn grid(&self) -> GridConfig {
        self.grid
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `relative` inside the scratch directory.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Save `container` at `relative`.
    ///
    /// # Panics
    ///
    /// Panics if the save fails.
    pub fn write_container(&self, relative: impl AsRef<Path>, container: &Container) -> PathBuf {
        let path = self.path(relative);
        if let Err(e) = container.save(&path) {
            panic!("failed to write {}: {e}", path.display());
        }
        path
    }

    /// Write a coeval dataset holding `boxes` in order.
    ///
    /// Brightness temperature fields are copies of the ground truth scaled
    /// by 30 so that they differ from the ionization field.
    pub fn write_coeval_dataset(
        &self,
        relative: impl AsRef<Path>,
        boxes: &[SyntheticBox],
    ) -> PathBuf {
        let gt = stack_fields(boxes.iter().map(|b| &b.ground_truth));
        let predicted = stack_fields(boxes.iter().map(|b| &b.predicted));
        let brightness = gt.mapv(|v| v * 30.0);

        let container = Container::new()
            .with_array(IONIZED_BOXES, gt)
            .with_array(BRIGHTNESS_TEMP_BOXES, brightness.clone())
            .with_array(WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES, brightness)
            .with_array(PREDICTED_BRIGHTNESS_TEMP_BOXES, predicted)
            .with_array(REDSHIFTS, boxes.iter().map(|b| b.redshift).collect::<Vec<_>>())
            .with_array(RANDOM_SEEDS, boxes.iter().map(|b| b.seed).collect::<Vec<_>>());
        self.write_container(relative, &container)
    }

    /// Write one simulation output: a box per redshift, each filled with
    /// `seed * 100 + redshift`.
    pub fn write_simulation(
        &self,
        relative: impl AsRef<Path>,
        seed: u64,
        redshifts: &[f32],
    ) -> PathBuf {
        let n = self.grid.hii_dim as usize;
        let boxes = Array4::from_shape_fn((redshifts.len(), n, n, n), |(i, _, _, _)| {
            seed as f32 * 100.0 + redshifts[i]
        });
        let container = Container::new()
            .with_array(BRIGHTNESS_TEMP_BOXES, boxes.clone())
            .with_array(IONIZED_BOXES, boxes.clone())
            .with_array(WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES, boxes)
            .with_array(REDSHIFTS, redshifts.to_vec())
            .with_attr("random_seed", seed);
        self.write_container(relative, &container)
    }

    /// Write a cached halo catalog tagged with `redshift` and `seed`.
    pub fn write_halo_field(
        &self,
        relative: impl AsRef<Path>,
        redshift: f64,
        seed: i64,
        catalog: HaloCatalog,
    ) -> PathBuf {
        let path = self.path(relative);
        if let Err(e) = CachedHaloField::new(redshift, seed, catalog).save(&path) {
            panic!("failed to write {}: {e}", path.display());
        }
        path
    }

    /// Write `yaml` to `relative` and load it as a pipeline.
    ///
    /// # Panics
    ///
    /// Panics if the document does not validate.
    pub fn write_pipeline(&self, relative: impl AsRef<Path>, yaml: &str) -> PipelineConfig {
        let path = self.path(relative);
        if let Err(e) = std::fs::write(&path, yaml) {
            panic!("failed to write {}: {e}", path.display());
        }
        match PipelineConfig::load(&path) {
            Ok(config) => config,
            Err(e) => panic!("pipeline rejected: {e}"),
        }
    }
}

fn stack_fields<'a>(fields: impl Iterator<Item = &'a Array3<f32>>) -> Array4<f32> {
    let views: Vec<_> = fields.map(|f| f.view()).collect();
    match stack(Axis(0), &views) {
        Ok(stacked) => stacked,
        Err(e) => panic!("synthetic fields differ in shape: {e}"),
    }
}
