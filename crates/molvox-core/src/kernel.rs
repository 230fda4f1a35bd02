use crate::error::{GridError, GridResult};

/// Piecewise radial density profile shared by every gridding operation.
///
/// For an atom of effective radius `r' = radius_scale * radius` and
/// `x = d / r'`, the density is a Gaussian core `exp(-2 x^2)` out to
/// `x = gaussian_radius_multiple`, then a quadratic tail
/// `A x^2 + B x + C` that meets the Gaussian with matching value and slope
/// and falls to zero, with zero slope, at `x = final_radius_multiple`.
/// The tail coefficients depend only on the Gaussian multiple and are
/// refreshed whenever it changes.
#[derive(Clone, Copy, Debug)]
pub struct RadialKernel {
    radius_scale: f32,
    gaussian_radius_multiple: f32,
    final_radius_multiple: f32,
    binary: bool,
    quad_a: f64,
    quad_b: f64,
    quad_c: f64,
    grad_d: f64,
    grad_e: f64,
}

impl RadialKernel {
    pub fn new(radius_scale: f32, gaussian_radius_multiple: f32, binary: bool) -> GridResult<Self> {
        if !(radius_scale > 0.0) {
            return Err(GridError::Invalid(format!(
                "radius scale must be positive, got {radius_scale}"
            )));
        }
        if !(gaussian_radius_multiple > 0.0) {
            return Err(GridError::Invalid(format!(
                "gaussian radius multiple must be positive, got {gaussian_radius_multiple}"
            )));
        }
        let mut kernel = Self {
            radius_scale,
            gaussian_radius_multiple,
            final_radius_multiple: 0.0,
            binary,
            quad_a: 0.0,
            quad_b: 0.0,
            quad_c: 0.0,
            grad_d: 0.0,
            grad_e: 0.0,
        };
        kernel.refresh();
        Ok(kernel)
    }

    /// Re-derive the cutoff multiple and tail coefficients from the Gaussian
    /// multiple G. With e = exp(-2 G^2):
    ///
    ///   F = (1 + 2 G^2) / (2 G)
    ///   A = 4 G^2 e
    ///   B = -4 G (1 + 2 G^2) e
    ///   C = (1 + 2 G^2)^2 e
    ///
    /// which makes the quadratic match the Gaussian's value and slope at
    /// x = G and vanish together with its slope at x = F.
    fn refresh(&mut self) {
        let g = self.gaussian_radius_multiple as f64;
        let e = (-2.0 * g * g).exp();
        let m = 1.0 + 2.0 * g * g;
        self.final_radius_multiple = (m / (2.0 * g)) as f32;
        self.quad_a = 4.0 * g * g * e;
        self.quad_b = -4.0 * g * m * e;
        self.quad_c = m * m * e;
        self.grad_d = 2.0 * self.quad_a;
        self.grad_e = self.quad_b;
    }

    pub fn radius_scale(&self) -> f32 {
        self.radius_scale
    }

    pub fn set_radius_scale(&mut self, radius_scale: f32) -> GridResult<()> {
        if !(radius_scale > 0.0) {
            return Err(GridError::Invalid(format!(
                "radius scale must be positive, got {radius_scale}"
            )));
        }
        self.radius_scale = radius_scale;
        Ok(())
    }

    pub fn gaussian_radius_multiple(&self) -> f32 {
        self.gaussian_radius_multiple
    }

    pub fn set_gaussian_radius_multiple(&mut self, multiple: f32) -> GridResult<()> {
        if !(multiple > 0.0) {
            return Err(GridError::Invalid(format!(
                "gaussian radius multiple must be positive, got {multiple}"
            )));
        }
        self.gaussian_radius_multiple = multiple;
        self.refresh();
        Ok(())
    }

    /// Multiple of the scaled radius at which density reaches zero.
    /// Strictly derived from the Gaussian multiple; there is no setter.
    pub fn final_radius_multiple(&self) -> f32 {
        self.final_radius_multiple
    }

    pub fn binary(&self) -> bool {
        self.binary
    }

    pub fn set_binary(&mut self, binary: bool) {
        self.binary = binary;
    }

    /// Quadratic tail coefficients (A, B, C).
    pub fn quadratic_coefficients(&self) -> (f64, f64, f64) {
        (self.quad_a, self.quad_b, self.quad_c)
    }

    /// Scaled radius of an atom.
    pub fn effective_radius(&self, radius: f32) -> f32 {
        self.radius_scale * radius
    }

    /// Distance beyond which an atom contributes no density. This is the
    /// per-atom bounding-box half width.
    pub fn density_radius(&self, radius: f32) -> f32 {
        self.final_radius_multiple * self.radius_scale * radius
    }

    /// Density at `distance` from an atom with the given effective radius.
    pub fn density(&self, distance: f64, effective_radius: f64) -> f64 {
        let x = distance / effective_radius;
        let frm = self.final_radius_multiple as f64;
        if self.binary {
            return if x <= frm { 1.0 } else { 0.0 };
        }
        let grm = self.gaussian_radius_multiple as f64;
        if x <= grm {
            (-2.0 * x * x).exp()
        } else if x <= frm {
            (self.quad_a * x + self.quad_b) * x + self.quad_c
        } else {
            0.0
        }
    }

    /// Radial slope d(density)/d(distance) of the smooth profile. The
    /// binary profile has no derivative and never reaches this.
    pub fn slope(&self, distance: f64, effective_radius: f64) -> f64 {
        let x = distance / effective_radius;
        let grm = self.gaussian_radius_multiple as f64;
        if x <= grm {
            -4.0 * distance / (effective_radius * effective_radius) * (-2.0 * x * x).exp()
        } else if x <= self.final_radius_multiple as f64 {
            (self.grad_d * x + self.grad_e) / effective_radius
        } else {
            0.0
        }
    }
}
