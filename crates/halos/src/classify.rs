//! Halo region classification.
//!
//! Each halo is placed on the ionization grid by floor-dividing its
//! high-resolution coordinate by the grid scale, then looked up in both the
//! ground-truth and the predicted occupancy fields:
//!
//! | predicted   | ground truth | predicted subset | ground-truth subset |
//! |-------------|--------------|------------------|---------------------|
//! | neutral     | neutral      | pred-neutral     | gt-neutral          |
//! | neutral     | ionized      | pred-neutral     | gt-ionized          |
//! | ionized     | neutral      | pred-ionized     | gt-neutral          |
//! | ionized     | ionized      | pred-ionized     | gt-ionized          |
//!
//! The table is two independent binary partitions done in one pass: predicted
//! membership depends only on the predicted field and ground-truth membership
//! only on the ground-truth field. Every halo lands in exactly one predicted
//! subset and exactly one ground-truth subset, in catalog order.

use std::path::Path;

use coeval_store::Container;
use ndarray::{Array1, Ix2};
use tracing::{debug, info};

use crate::binarize::OccupancyField;
use crate::catalog::{coords_array, HaloCatalog};
use crate::error::{HalosError, Result};

pub const PRED_NEUTRAL_HALO_MASSES: &str = "pred_neutral_halo_masses";
pub const PRED_IONIZED_HALO_MASSES: &str = "pred_ionized_halo_masses";
pub const PRED_NEUTRAL_HALO_COORDS: &str = "pred_neutral_halo_coords";
pub const PRED_IONIZED_HALO_COORDS: &str = "pred_ionized_halo_coords";
pub const GT_NEUTRAL_HALO_MASSES: &str = "gt_neutral_halo_masses";
pub const GT_IONIZED_HALO_MASSES: &str = "gt_ionized_halo_masses";
pub const GT_NEUTRAL_HALO_COORDS: &str = "gt_neutral_halo_coords";
pub const GT_IONIZED_HALO_COORDS: &str = "gt_ionized_halo_coords";
pub const RANDOM_SEED: &str = "random_seed";

/// Halos assigned to one region, as parallel coordinate and mass lists.
///
/// Coordinates are on the low-resolution (ionization) grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSubset {
    coords: Vec<[i64; 3]>,
    masses: Vec<f64>,
}

impl RegionSubset {
    fn push(&mut self, coord: [i64; 3], mass: f64) {
        self.coords.push(coord);
        self.masses.push(mass);
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    pub fn coords(&self) -> &[[i64; 3]] {
        &self.coords
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn total_mass(&self) -> f64 {
        self.masses.iter().sum()
    }

    fn read(container: &Container, coords_key: &str, masses_key: &str) -> Result<Self> {
        let raw_coords = container.array_i64(coords_key)?;
        let coords = raw_coords.view().into_dimensionality::<Ix2>().map_err(|_| {
            HalosError::ShapeMismatch(format!(
                "'{coords_key}' must be (n, 3), got {:?}",
                raw_coords.shape()
            ))
        })?;
        let masses = Array1::from_iter(container.array_f64(masses_key)?.iter().copied());

        let catalog = HaloCatalog::from_arrays(&coords, &masses)?;
        Ok(Self {
            coords: catalog.coords().to_vec(),
            masses: catalog.masses().to_vec(),
        })
    }
}

/// Predicted and ground-truth partitions of one halo catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationResult {
    pub pred_neutral: RegionSubset,
    pub pred_ionized: RegionSubset,
    pub gt_neutral: RegionSubset,
    pub gt_ionized: RegionSubset,
}

impl ClassificationResult {
    /// Number of classified halos.
    pub fn total_halos(&self) -> usize {
        self.pred_neutral.len() + self.pred_ionized.len()
    }

    /// Container with the eight subset arrays and the originating seed.
    pub fn to_container(&self, seed: i64) -> Container {
        Container::new()
            .with_array(PRED_NEUTRAL_HALO_MASSES, self.pred_neutral.masses.clone())
            .with_array(PRED_IONIZED_HALO_MASSES, self.pred_ionized.masses.clone())
            .with_array(PRED_NEUTRAL_HALO_COORDS, coords_array(&self.pred_neutral.coords))
            .with_array(PRED_IONIZED_HALO_COORDS, coords_array(&self.pred_ionized.coords))
            .with_array(GT_NEUTRAL_HALO_MASSES, self.gt_neutral.masses.clone())
            .with_array(GT_IONIZED_HALO_MASSES, self.gt_ionized.masses.clone())
            .with_array(GT_NEUTRAL_HALO_COORDS, coords_array(&self.gt_neutral.coords))
            .with_array(GT_IONIZED_HALO_COORDS, coords_array(&self.gt_ionized.coords))
            .with_scalar(RANDOM_SEED, seed)
            .with_attr(RANDOM_SEED, seed)
    }

    /// Read a result written by [`ClassificationResult::to_container`].
    pub fn from_container(container: &Container) -> Result<Self> {
        container.require_keys(&[
            PRED_NEUTRAL_HALO_MASSES,
            PRED_IONIZED_HALO_MASSES,
            PRED_NEUTRAL_HALO_COORDS,
            PRED_IONIZED_HALO_COORDS,
            GT_NEUTRAL_HALO_MASSES,
            GT_IONIZED_HALO_MASSES,
            GT_NEUTRAL_HALO_COORDS,
            GT_IONIZED_HALO_COORDS,
        ])?;

        let result = Self {
            pred_neutral: RegionSubset::read(
                container,
                PRED_NEUTRAL_HALO_COORDS,
                PRED_NEUTRAL_HALO_MASSES,
            )?,
            pred_ionized: RegionSubset::read(
                container,
                PRED_IONIZED_HALO_COORDS,
                PRED_IONIZED_HALO_MASSES,
            )?,
            gt_neutral: RegionSubset::read(
                container,
                GT_NEUTRAL_HALO_COORDS,
                GT_NEUTRAL_HALO_MASSES,
            )?,
            gt_ionized: RegionSubset::read(
                container,
                GT_IONIZED_HALO_COORDS,
                GT_IONIZED_HALO_MASSES,
            )?,
        };

        let gt_total = result.gt_neutral.len() + result.gt_ionized.len();
        if gt_total != result.total_halos() {
            return Err(HalosError::ShapeMismatch(format!(
                "predicted subsets hold {} halos but ground-truth subsets hold {gt_total}",
                result.total_halos()
            )));
        }
        Ok(result)
    }

    /// Persist to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>, seed: i64) -> Result<()> {
        let path = path.as_ref();
        self.to_container(seed).save(path)?;
        info!(
            path = %path.display(),
            seed,
            halos = self.total_halos(),
            "classified halos saved"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_container(&Container::load(path)?)
    }
}

/// Partition `catalog` by the predicted and ground-truth fields.
///
/// `scale` converts high-resolution halo coordinates to field indices. Every
/// low-resolution coordinate must fall inside the fields; the first one that
/// does not aborts the classification.
pub fn classify(
    catalog: &HaloCatalog,
    ground_truth: &OccupancyField,
    predicted: &OccupancyField,
    scale: i64,
) -> Result<ClassificationResult> {
    if scale <= 0 {
        return Err(HalosError::InvalidScale(scale));
    }
    if ground_truth.shape() != predicted.shape() {
        return Err(HalosError::ShapeMismatch(format!(
            "ground-truth field {:?} and predicted field {:?} differ",
            ground_truth.shape(),
            predicted.shape()
        )));
    }
    let shape = predicted.shape();

    let mut result = ClassificationResult::default();
    for (halo, &mass) in catalog.masses().iter().enumerate() {
        let low = catalog
            .low_res_coord(halo, scale)
            .ok_or(HalosError::InvalidScale(scale))?;
        let (Some(pred_neutral), Some(gt_neutral)) =
            (predicted.is_neutral(low), ground_truth.is_neutral(low))
        else {
            return Err(HalosError::IndexOutOfBounds {
                halo,
                coord: low,
                shape,
            });
        };

        let pred_subset = if pred_neutral {
            &mut result.pred_neutral
        } else {
            &mut result.pred_ionized
        };
        pred_subset.push(low, mass);

        let gt_subset = if gt_neutral {
            &mut result.gt_neutral
        } else {
            &mut result.gt_ionized
        };
        gt_subset.push(low, mass);
    }

    debug!(
        halos = catalog.len(),
        pred_neutral = result.pred_neutral.len(),
        pred_ionized = result.pred_ionized.len(),
        gt_neutral = result.gt_neutral.len(),
        gt_ionized = result.gt_ionized.len(),
        pred_neutral_fraction = predicted.neutral_fraction(),
        gt_neutral_fraction = ground_truth.neutral_fraction(),
        "halos classified"
    );
    Ok(result)
}
