//! Coeval box datasets.
//!
//! A [`CoevalDataset`] is a validated, read-only view over a container holding
//! batches of coeval boxes (leading dimension = box index) and the redshift of
//! each box. It is constructed once at load time and never mutated; to write
//! a different dataset, build a fresh [`Container`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use ndarray::{Array1, ArrayD, ArrayView1, Ix1};
use tracing::{debug, info};

use crate::array::ScalarValue;
use crate::container::Container;
use crate::error::{Result, StoreError};
use crate::seeds::parse_seed_list;

pub const IONIZED_BOXES: &str = "ionized_boxes";
pub const BRIGHTNESS_TEMP_BOXES: &str = "brightness_temp_boxes";
pub const WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES: &str = "wedge_filtered_brightness_temp_boxes";
pub const PREDICTED_BRIGHTNESS_TEMP_BOXES: &str = "predicted_brightness_temp_boxes";
pub const REDSHIFTS: &str = "redshifts";
pub const RANDOM_SEEDS: &str = "random_seeds";
pub const RANDOM_SEEDS_VAL: &str = "random_seeds_val";
pub const RANDOM_SEED: &str = "random_seed";

/// Keys every model-output dataset must carry.
pub const REQUIRED_KEYS: [&str; 5] = [
    WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES,
    BRIGHTNESS_TEMP_BOXES,
    PREDICTED_BRIGHTNESS_TEMP_BOXES,
    IONIZED_BOXES,
    REDSHIFTS,
];

/// Keys of a simulation-only dataset (no model prediction yet).
pub const SIMULATION_KEYS: [&str; 4] = [
    WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES,
    BRIGHTNESS_TEMP_BOXES,
    IONIZED_BOXES,
    REDSHIFTS,
];

/// Load-time validation settings.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Keys that must be present.
    pub required_keys: Vec<String>,
    /// Reject arrays containing NaN.
    pub strict: bool,
}

impl LoadOptions {
    /// Options for simulation-only inputs, such as training-set sources.
    pub fn simulation() -> Self {
        Self {
            required_keys: SIMULATION_KEYS.iter().map(|k| k.to_string()).collect(),
            strict: true,
        }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            required_keys: REQUIRED_KEYS.iter().map(|k| k.to_string()).collect(),
            strict: true,
        }
    }
}

/// Validated coeval box dataset with every array coerced to `f32`.
#[derive(Debug, Clone)]
pub struct CoevalDataset {
    path: PathBuf,
    data: IndexMap<String, ArrayD<f32>>,
    seeds: Option<Vec<i64>>,
    metadata: IndexMap<String, ScalarValue>,
    attrs: IndexMap<String, String>,
}

impl CoevalDataset {
    /// Load with the default (strict, all keys) options.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, &LoadOptions::default())
    }

    pub fn load_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        let container = Container::load(path)?;
        let dataset = Self::from_container(path, &container, options)?;
        info!(
            path = %path.display(),
            boxes = dataset.len(),
            arrays = dataset.data.len(),
            "coeval dataset loaded"
        );
        Ok(dataset)
    }

    /// Validate and convert an already loaded container.
    pub fn from_container(
        path: impl Into<PathBuf>,
        container: &Container,
        options: &LoadOptions,
    ) -> Result<Self> {
        let required: Vec<&str> = options.required_keys.iter().map(String::as_str).collect();
        container.require_keys(&required)?;

        if options.strict {
            container.check_finite()?;
        }

        // Seeds above 2^24 do not survive f32, so keep them exact.
        let seeds = [RANDOM_SEEDS, RANDOM_SEEDS_VAL]
            .into_iter()
            .find_map(|key| container.array(key))
            .map(|array| array.to_i64().map(|a| a.iter().copied().collect::<Vec<i64>>()))
            .transpose()?;

        let mut data = IndexMap::new();
        for (key, array) in container.arrays() {
            let mut values = array.to_f32()?;
            if key == REDSHIFTS {
                values = Array1::from_iter(values.iter().copied()).into_dyn();
            }
            debug!(key, shape = ?values.shape(), "coerced to f32");
            data.insert(key.to_string(), values);
        }

        let metadata = container
            .scalars()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        Ok(Self {
            path: path.into(),
            data,
            seeds,
            metadata,
            attrs: container.attrs().clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &IndexMap<String, ArrayD<f32>> {
        &self.data
    }

    pub fn metadata(&self) -> &IndexMap<String, ScalarValue> {
        &self.metadata
    }

    pub fn attrs(&self) -> &IndexMap<String, String> {
        &self.attrs
    }

    /// Named array.
    pub fn array(&self, key: &str) -> Result<&ArrayD<f32>> {
        self.data
            .get(key)
            .ok_or_else(|| StoreError::EntryNotFound(key.to_string()))
    }

    pub fn ionized_boxes(&self) -> Result<&ArrayD<f32>> {
        self.array(IONIZED_BOXES)
    }

    pub fn brightness_temp_boxes(&self) -> Result<&ArrayD<f32>> {
        self.array(BRIGHTNESS_TEMP_BOXES)
    }

    pub fn wedge_filtered_brightness_temp_boxes(&self) -> Result<&ArrayD<f32>> {
        self.array(WEDGE_FILTERED_BRIGHTNESS_TEMP_BOXES)
    }

    pub fn predicted_brightness_temp_boxes(&self) -> Result<&ArrayD<f32>> {
        self.array(PREDICTED_BRIGHTNESS_TEMP_BOXES)
    }

    /// Redshift of each box, flattened to one dimension.
    pub fn redshifts(&self) -> Result<ArrayView1<'_, f32>> {
        let redshifts = self.array(REDSHIFTS)?;
        redshifts
            .view()
            .into_dimensionality::<Ix1>()
            .map_err(|_| StoreError::ShapeMismatch {
                key: REDSHIFTS.to_string(),
                expected: "1-D".to_string(),
                actual: redshifts.shape().to_vec(),
            })
    }

    /// Number of boxes (length of the redshift vector).
    pub fn len(&self) -> usize {
        self.data.get(REDSHIFTS).map_or(0, |r| r.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Random seed of each box.
    ///
    /// Taken from the `random_seeds` or `random_seeds_val` arrays when present,
    /// otherwise from a `random_seed` scalar or stringified-list attribute.
    pub fn random_seeds(&self) -> Result<Vec<i64>> {
        if let Some(seeds) = &self.seeds {
            return Ok(seeds.clone());
        }

        if let Some(seed) = self.metadata.get(RANDOM_SEED).and_then(ScalarValue::as_int) {
            return Ok(vec![seed]);
        }

        match self.attrs.get(RANDOM_SEED) {
            Some(text) => parse_seed_list(text),
            None => Err(StoreError::EntryNotFound(RANDOM_SEED.to_string())),
        }
    }

    /// Index of the box with the given redshift and seed.
    ///
    /// Returns `None` when no box matches and a validation error when several
    /// do. A dataset with a single seed applies it to every box.
    pub fn box_index(&self, redshift: f32, seed: i64) -> Result<Option<usize>> {
        let redshifts = self.redshifts()?;
        let mut seeds = self.random_seeds()?;
        // A single seed covers every box of a one-realization dataset.
        if let [only] = seeds[..] {
            seeds = vec![only; redshifts.len()];
        }
        if seeds.len() != redshifts.len() {
            return Err(StoreError::ShapeMismatch {
                key: RANDOM_SEEDS.to_string(),
                expected: format!("{} seeds", redshifts.len()),
                actual: vec![seeds.len()],
            });
        }

        let mut matches = redshifts
            .iter()
            .zip(&seeds)
            .enumerate()
            .filter(|(_, (z, s))| **z == redshift && **s == seed)
            .map(|(i, _)| i);

        let first = matches.next();
        if matches.next().is_some() {
            return Err(StoreError::Validation(format!(
                "more than one box at redshift {redshift} with seed {seed}"
            )));
        }
        Ok(first)
    }
}
