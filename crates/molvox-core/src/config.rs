use serde::{Deserialize, Serialize};

use crate::error::{GridError, GridResult};

/// Declarative grid settings, typically deserialized from a run
/// configuration file.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GridConfig {
    /// Spacing between adjacent voxel centers in Angstroms.
    #[serde(default = "default_resolution")]
    pub resolution: f32,
    /// Side length of the cubic grid in Angstroms.
    pub dimension: f32,
    /// Hard-sphere occupancy instead of smooth density.
    #[serde(default)]
    pub binary: bool,
    /// Uniform pre-multiplier applied to every input radius.
    #[serde(default = "default_unit")]
    pub radius_scale: f32,
    /// Multiple of the scaled radius at which the Gaussian core hands off
    /// to the quadratic tail.
    #[serde(default = "default_unit")]
    pub gaussian_radius_multiple: f32,
}

fn default_resolution() -> f32 {
    0.5
}

fn default_unit() -> f32 {
    1.0
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            dimension: 23.5,
            binary: false,
            radius_scale: default_unit(),
            gaussian_radius_multiple: default_unit(),
        }
    }
}

impl GridConfig {
    pub fn normalized(&self) -> GridResult<Self> {
        if !(self.resolution > 0.0) {
            return Err(GridError::Invalid(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if !(self.dimension >= 0.0) {
            return Err(GridError::Invalid(format!(
                "dimension must be non-negative, got {}",
                self.dimension
            )));
        }
        if !(self.radius_scale > 0.0) {
            return Err(GridError::Invalid(format!(
                "radius_scale must be positive, got {}",
                self.radius_scale
            )));
        }
        if !(self.gaussian_radius_multiple > 0.0) {
            return Err(GridError::Invalid(format!(
                "gaussian_radius_multiple must be positive, got {}",
                self.gaussian_radius_multiple
            )));
        }
        Ok(*self)
    }
}
