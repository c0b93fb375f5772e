//! Simulation grid parameters.

use serde::{Deserialize, Serialize};

use crate::error::{HalosError, Result};

/// Box geometry shared by the density grid and the ionization grid.
///
/// Halos are located on the high-resolution grid (`dim` cells per side);
/// ionization fields live on the low-resolution grid (`hii_dim` cells per
/// side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridConfig {
    /// Box side length in comoving Mpc.
    pub box_len: u32,
    /// Low-resolution cells per side.
    pub hii_dim: u32,
    /// High-resolution cells per side.
    pub dim: u32,
}

impl GridConfig {
    /// Validate grid values.
    pub fn validate(&self) -> Result<()> {
        if self.box_len == 0 {
            return Err(HalosError::InvalidConfig("boxLen must be > 0".to_string()));
        }
        if self.hii_dim == 0 || self.dim == 0 {
            return Err(HalosError::InvalidConfig(
                "hiiDim and dim must be > 0".to_string(),
            ));
        }
        if self.dim % self.hii_dim != 0 {
            return Err(HalosError::InvalidConfig(format!(
                "dim ({}) must be a multiple of hiiDim ({})",
                self.dim, self.hii_dim
            )));
        }
        Ok(())
    }

    /// High-resolution cells per low-resolution cell along one axis.
    pub fn scale(&self) -> Result<i64> {
        self.validate()?;
        Ok(i64::from(self.dim / self.hii_dim))
    }

    /// Low-resolution field shape.
    pub fn field_shape(&self) -> [usize; 3] {
        let n = self.hii_dim as usize;
        [n, n, n]
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            box_len: 128,
            hii_dim: 128,
            dim: 384,
        }
    }
}
