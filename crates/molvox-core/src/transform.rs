use ndarray::ArrayViewMut2;
use rand::Rng;

use crate::element::GridElement;
use crate::error::{GridError, GridResult};
use crate::geom::{Rotation, Vec3};

/// Rigid rotation about a center followed by a translation.
///
/// Applied to coordinates before gridding; gradients computed against the
/// transformed coordinates are carried back through the rotation with
/// [`Transform::backward`]. The center doubles as the grid center when
/// gridding through [`crate::GridMaker::forward_transformed`].
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    center: Vec3,
    rotation: Rotation,
    translation: Vec3,
}

impl Transform {
    pub fn new(center: Vec3, rotation: Rotation, translation: Vec3) -> Self {
        Self {
            center,
            rotation,
            translation,
        }
    }

    pub fn identity(center: Vec3) -> Self {
        Self::new(center, Rotation::identity(), Vec3::ZERO)
    }

    /// Random augmentation transform: a uniform rotation when `rotate` is
    /// set and a translation drawn per axis from `[-max_translation,
    /// max_translation]`.
    pub fn random<R: Rng + ?Sized>(
        center: Vec3,
        max_translation: f32,
        rotate: bool,
        rng: &mut R,
    ) -> Self {
        let rotation = if rotate {
            Rotation::random(rng)
        } else {
            Rotation::identity()
        };
        let translation = if max_translation > 0.0 {
            Vec3::new(
                (rng.gen::<f32>() * 2.0 - 1.0) * max_translation,
                (rng.gen::<f32>() * 2.0 - 1.0) * max_translation,
                (rng.gen::<f32>() * 2.0 - 1.0) * max_translation,
            )
        } else {
            Vec3::ZERO
        };
        Self::new(center, rotation, translation)
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    fn apply_one(&self, p: Vec3) -> Vec3 {
        self.rotation.apply(p - self.center) + self.center + self.translation
    }

    /// Transform coordinates in place.
    pub fn apply(&self, coords: &mut [[f32; 3]]) {
        for c in coords.iter_mut() {
            *c = self.apply_one(Vec3::from(*c)).into();
        }
    }

    /// Transformed copy of `coords`.
    pub fn forward_coords(&self, coords: &[[f32; 3]]) -> Vec<[f32; 3]> {
        coords
            .iter()
            .map(|c| self.apply_one(Vec3::from(*c)).into())
            .collect()
    }

    /// Carry per-atom coordinate gradients back through the rotation.
    /// Translation does not act on gradient vectors.
    pub fn backward<T: GridElement>(&self, gradients: &mut ArrayViewMut2<'_, T>) -> GridResult<()> {
        if gradients.shape()[1] != 3 {
            return Err(GridError::ShapeMismatch(format!(
                "gradient rows must have 3 components, got {}",
                gradients.shape()[1]
            )));
        }
        let inverse = self.rotation.inverse();
        for mut row in gradients.rows_mut() {
            let g = Vec3::new(
                row[0].to_f64() as f32,
                row[1].to_f64() as f32,
                row[2].to_f64() as f32,
            );
            let back = inverse.apply(g);
            row[0] = T::from_f64(back.x as f64);
            row[1] = T::from_f64(back.y as f64);
            row[2] = T::from_f64(back.z as f64);
        }
        Ok(())
    }
}
