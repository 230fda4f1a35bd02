use std::f32::consts::TAU;
use std::ops::{Add, Mul, Neg, Sub};

use rand::Rng;

/// Cartesian point or displacement in Angstroms.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn norm(self) -> f32 {
        self.dot(self).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

/// Proper rotation, kept as a unit quaternion split into its scalar part
/// and vector part so the inverse is a sign flip.
#[derive(Clone, Copy, Debug)]
pub struct Rotation {
    scalar: f32,
    vector: Vec3,
}

impl Rotation {
    pub fn identity() -> Self {
        Self {
            scalar: 1.0,
            vector: Vec3::ZERO,
        }
    }

    /// Rotation drawn uniformly from SO(3): a point on the unit 3-sphere,
    /// built from two planar angles whose radii split a uniform draw.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let split: f32 = rng.gen();
        let vector_arm = (1.0 - split).sqrt();
        let scalar_arm = split.sqrt();
        let alpha = TAU * rng.gen::<f32>();
        let beta = TAU * rng.gen::<f32>();
        Self {
            scalar: scalar_arm * beta.cos(),
            vector: Vec3::new(
                vector_arm * alpha.sin(),
                vector_arm * alpha.cos(),
                scalar_arm * beta.sin(),
            ),
        }
    }

    pub fn inverse(self) -> Self {
        Self {
            scalar: self.scalar,
            vector: -self.vector,
        }
    }

    /// Rotate a point: `p + 2w (u x p) + 2 u x (u x p)` for a unit
    /// quaternion with scalar `w` and vector `u`.
    pub fn apply(self, p: Vec3) -> Vec3 {
        let twisted = self.vector.cross(p) * 2.0;
        p + twisted * self.scalar + self.vector.cross(twisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn cross_follows_the_right_hand_rule() {
        let ex = Vec3::new(1.0, 0.0, 0.0);
        let ey = Vec3::new(0.0, 1.0, 0.0);
        assert!((ex.cross(ey) - Vec3::new(0.0, 0.0, 1.0)).norm() < 1e-7);
    }

    #[test]
    fn identity_rotation_is_a_fixed_point() {
        let p = Vec3::new(0.4, -2.0, 1.5);
        assert!((Rotation::identity().apply(p) - p).norm() < 1e-7);
    }

    #[test]
    fn rotation_preserves_lengths_and_inverts() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..8 {
            let rot = Rotation::random(&mut rng);
            let p = Vec3::new(0.3, -1.2, 2.5);
            let moved = rot.apply(p);
            assert!((moved.norm() - p.norm()).abs() < 1e-5);
            assert!((rot.inverse().apply(moved) - p).norm() < 1e-5);
        }
    }

    #[test]
    fn random_rotations_preserve_angles() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = Vec3::new(1.0, 0.5, -0.25);
        let b = Vec3::new(-0.75, 2.0, 0.1);
        for _ in 0..8 {
            let rot = Rotation::random(&mut rng);
            assert!((rot.apply(a).dot(rot.apply(b)) - a.dot(b)).abs() < 1e-4);
        }
    }
}
