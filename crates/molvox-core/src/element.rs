use std::ops::AddAssign;

use num_traits::Float;

/// Scalar element of a density or gradient grid.
///
/// Kernel math runs in `f64` regardless of the element type and is narrowed
/// on store, so `f32` and `f64` grids see the same coefficients.
pub trait GridElement: Float + AddAssign + Send + Sync + 'static {
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl GridElement for f32 {
    fn from_f64(v: f64) -> Self {
        v as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl GridElement for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }

    fn to_f64(self) -> f64 {
        self
    }
}
