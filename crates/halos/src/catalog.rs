//! Halo catalogs.
//!
//! Catalogs come from an external halo finder and are stored as two arrays:
//! `halo_coords` (N × 3 integer high-resolution voxel coordinates) and
//! `halo_masses` (N masses).

use std::path::Path;

use coeval_store::Container;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};
use tracing::info;

use crate::error::{HalosError, Result};

pub const HALO_COORDS: &str = "halo_coords";
pub const HALO_MASSES: &str = "halo_masses";

/// Ordered list of halos.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HaloCatalog {
    coords: Vec<[i64; 3]>,
    masses: Vec<f64>,
}

impl HaloCatalog {
    /// Build a catalog from parallel coordinate and mass lists.
    pub fn new(coords: Vec<[i64; 3]>, masses: Vec<f64>) -> Result<Self> {
        if coords.len() != masses.len() {
            return Err(HalosError::ShapeMismatch(format!(
                "{} halo coordinates but {} masses",
                coords.len(),
                masses.len()
            )));
        }
        if let Some((halo, &mass)) = masses
            .iter()
            .enumerate()
            .find(|(_, m)| !m.is_finite() || **m < 0.0)
        {
            return Err(HalosError::InvalidMass { halo, mass });
        }
        Ok(Self { coords, masses })
    }

    /// Build a catalog from an `(N, 3)` coordinate array and `N` masses.
    pub fn from_arrays<S1, S2>(
        coords: &ArrayBase<S1, Ix2>,
        masses: &ArrayBase<S2, Ix1>,
    ) -> Result<Self>
    where
        S1: Data<Elem = i64>,
        S2: Data<Elem = f64>,
    {
        if coords.ncols() != 3 {
            return Err(HalosError::ShapeMismatch(format!(
                "halo coordinates must be (N, 3), got {:?}",
                coords.shape()
            )));
        }
        let coords = coords
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1], row[2]])
            .collect();
        Self::new(coords, masses.to_vec())
    }

    /// Read `halo_coords` and `halo_masses` from a container.
    pub fn from_container(container: &Container) -> Result<Self> {
        container.require_keys(&[HALO_COORDS, HALO_MASSES])?;

        let raw_coords = container.array_i64(HALO_COORDS)?;
        let coords = raw_coords.view().into_dimensionality::<Ix2>().map_err(|_| {
            HalosError::ShapeMismatch(format!(
                "halo coordinates must be (N, 3), got {:?}",
                raw_coords.shape()
            ))
        })?;

        let masses = Array1::from_iter(container.array_f64(HALO_MASSES)?.iter().copied());

        Self::from_arrays(&coords, &masses)
    }

    /// Load a catalog container from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let catalog = Self::from_container(&Container::load(path)?)?;
        info!(path = %path.display(), halos = catalog.len(), "halo catalog loaded");
        Ok(catalog)
    }

    /// Container holding this catalog.
    pub fn to_container(&self) -> Container {
        Container::new()
            .with_array(HALO_COORDS, coords_array(&self.coords))
            .with_array(HALO_MASSES, self.masses.clone())
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

    /// Low-resolution coordinate of halo `index`.
    ///
    /// `None` past the end of the catalog or for a non-positive scale.
    pub fn low_res_coord(&self, index: usize, scale: i64) -> Option<[i64; 3]> {
        if scale <= 0 {
            return None;
        }
        self.coords.get(index).map(|&c| downsample(c, scale))
    }
}

/// Floor-divide each axis by a positive `scale`.
pub(crate) fn downsample(coord: [i64; 3], scale: i64) -> [i64; 3] {
    coord.map(|c| c.div_euclid(scale))
}

/// Pack coordinates into an `(N, 3)` array.
pub(crate) fn coords_array(coords: &[[i64; 3]]) -> Array2<i64> {
    Array2::from_shape_fn((coords.len(), 3), |(i, axis)| coords[i][axis])
}
