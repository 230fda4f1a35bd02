use crate::error::{GridError, GridResult};
use crate::geom::Vec3;

/// The two supported type encodings for an atom set.
#[derive(Clone, Debug)]
pub enum AtomTypes {
    /// One channel id per atom, stored as a float for uniform memory
    /// layout. A negative value marks the atom inactive.
    Index(Vec<f32>),
    /// Dense per-atom channel weights, row major `N x num_types`.
    Vector { weights: Vec<f32>, num_types: usize },
}

/// Three parallel arrays describing a set of atoms: coordinates in
/// Angstroms, a type encoding, and per-atom radii (before radius scaling).
#[derive(Clone, Debug)]
pub struct CoordinateSet {
    pub coords: Vec<[f32; 3]>,
    pub types: AtomTypes,
    pub radii: Vec<f32>,
}

impl CoordinateSet {
    pub fn with_index_types(
        coords: Vec<[f32; 3]>,
        type_index: Vec<f32>,
        radii: Vec<f32>,
    ) -> GridResult<Self> {
        if coords.len() != type_index.len() || coords.len() != radii.len() {
            return Err(GridError::ShapeMismatch(format!(
                "coordinate set arrays disagree: {} coords, {} type indices, {} radii",
                coords.len(),
                type_index.len(),
                radii.len()
            )));
        }
        Ok(Self {
            coords,
            types: AtomTypes::Index(type_index),
            radii,
        })
    }

    pub fn with_vector_types(
        coords: Vec<[f32; 3]>,
        weights: Vec<f32>,
        num_types: usize,
        radii: Vec<f32>,
    ) -> GridResult<Self> {
        if coords.len() != radii.len() {
            return Err(GridError::ShapeMismatch(format!(
                "coordinate set arrays disagree: {} coords, {} radii",
                coords.len(),
                radii.len()
            )));
        }
        if weights.len() != coords.len() * num_types {
            return Err(GridError::ShapeMismatch(format!(
                "type weights have {} entries, expected {} x {}",
                weights.len(),
                coords.len(),
                num_types
            )));
        }
        Ok(Self {
            coords,
            types: AtomTypes::Vector { weights, num_types },
            radii,
        })
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn has_indexed_types(&self) -> bool {
        matches!(self.types, AtomTypes::Index(_))
    }

    pub fn has_vector_types(&self) -> bool {
        matches!(self.types, AtomTypes::Vector { .. })
    }

    /// Number of channels this set spans. For index encoding this is the
    /// largest active channel id plus one.
    pub fn num_types(&self) -> usize {
        match &self.types {
            AtomTypes::Index(type_index) => type_index
                .iter()
                .filter(|t| **t >= 0.0)
                .map(|t| *t as usize + 1)
                .max()
                .unwrap_or(0),
            AtomTypes::Vector { num_types, .. } => *num_types,
        }
    }

    /// Mean of the coordinates. Used as the default grid center by the
    /// convenience forward entry points.
    pub fn center(&self) -> Vec3 {
        if self.coords.is_empty() {
            return Vec3::ZERO;
        }
        let mut sum = Vec3::ZERO;
        for c in &self.coords {
            sum = sum + Vec3::from(*c);
        }
        sum * (1.0 / self.coords.len() as f32)
    }
}
