//! Field binarization and boolean occupancy fields.
//!
//! Ionization-fraction fields are continuous. Thresholding maps every voxel at
//! or above the cutoff to 1 (neutral) and every other voxel, NaN included, to
//! 0 (ionized).

use ndarray::{Array, Array3, ArrayBase, ArrayD, Axis, Data, Dimension, Ix3, Ix4};

use crate::error::{HalosError, Result};

/// Default binarization cutoff.
pub const DEFAULT_CUTOFF: f32 = 0.9;

/// Threshold every element: `>= cutoff` → 1.0, otherwise 0.0.
///
/// Works on any rank. A batch of fields (leading batch dimension) is
/// binarized element by element with no interaction between fields.
pub fn binarize<S, D>(fields: &ArrayBase<S, D>, cutoff: f32) -> Array<f32, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    fields.mapv(|v| if v >= cutoff { 1.0 } else { 0.0 })
}

/// 3-D boolean field: `true` marks a neutral voxel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyField {
    cells: Array3<bool>,
}

impl OccupancyField {
    pub fn from_cells(cells: Array3<bool>) -> Self {
        Self { cells }
    }

    /// Threshold a probability field at `cutoff`.
    pub fn from_probabilities<S>(field: &ArrayBase<S, Ix3>, cutoff: f32) -> Self
    where
        S: Data<Elem = f32>,
    {
        Self {
            cells: field.mapv(|v| v >= cutoff),
        }
    }

    /// Interpret an already binarized field: exactly 1 is neutral.
    pub fn from_binary<S>(field: &ArrayBase<S, Ix3>) -> Self
    where
        S: Data<Elem = f32>,
    {
        Self {
            cells: field.mapv(|v| v == 1.0),
        }
    }

    pub fn cells(&self) -> &Array3<bool> {
        &self.cells
    }

    pub fn shape(&self) -> [usize; 3] {
        let (x, y, z) = self.cells.dim();
        [x, y, z]
    }

    /// Whether the voxel at `coord` is neutral, or `None` when out of range.
    pub fn is_neutral(&self, coord: [i64; 3]) -> Option<bool> {
        let [x, y, z] = coord;
        let index = (
            usize::try_from(x).ok()?,
            usize::try_from(y).ok()?,
            usize::try_from(z).ok()?,
        );
        self.cells.get(index).copied()
    }

    /// Fraction of neutral voxels.
    pub fn neutral_fraction(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let neutral = self.cells.iter().filter(|&&c| c).count();
        neutral as f64 / self.cells.len() as f64
    }
}

/// Threshold a batch of fields shaped `(boxes, x, y, z)`.
pub fn occupancy_batch(boxes: &ArrayD<f32>, cutoff: f32) -> Result<Vec<OccupancyField>> {
    let batch = boxes.view().into_dimensionality::<Ix4>().map_err(|_| {
        HalosError::ShapeMismatch(format!(
            "expected a batch of 3-D fields, got shape {:?}",
            boxes.shape()
        ))
    })?;

    Ok(batch
        .axis_iter(Axis(0))
        .map(|field| OccupancyField::from_probabilities(&field, cutoff))
        .collect())
}
