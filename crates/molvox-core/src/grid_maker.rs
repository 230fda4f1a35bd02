use ndarray::{ArrayView4, ArrayViewMut1, ArrayViewMut2, ArrayViewMut4, ArrayViewMut5, Axis};
use rand::Rng;

use crate::bounds::{bounds_1d, grid_origin};
use crate::config::GridConfig;
use crate::coordset::{AtomTypes, CoordinateSet};
use crate::element::GridElement;
use crate::error::{GridError, GridResult};
use crate::geom::Vec3;
use crate::kernel::RadialKernel;
use crate::transform::Transform;

/// Rasterizes atoms into per-channel density grids and carries grid
/// gradients back onto atom coordinates and type weights.
///
/// The maker holds only geometry and kernel settings; atom arrays and
/// output tensors are owned by the caller, and the grid center is passed
/// per call because transforms applied to the coordinates upstream move
/// it. Density grids have shape `(channels, dim, dim, dim)` with
/// `dim = round(dimension / resolution) + 1`.
pub struct GridMaker {
    resolution: f32,
    dimension: f32,
    dim: usize,
    kernel: RadialKernel,
}

impl GridMaker {
    /// Smooth-density maker with unit radius scaling.
    pub fn new(resolution: f32, dimension: f32) -> GridResult<Self> {
        Self::from_config(&GridConfig {
            resolution,
            dimension,
            ..GridConfig::default()
        })
    }

    pub fn from_config(config: &GridConfig) -> GridResult<Self> {
        let cfg = config.normalized()?;
        Ok(Self {
            resolution: cfg.resolution,
            dimension: cfg.dimension,
            dim: derive_dim(cfg.resolution, cfg.dimension),
            kernel: RadialKernel::new(cfg.radius_scale, cfg.gaussian_radius_multiple, cfg.binary)?,
        })
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: f32) -> GridResult<()> {
        if !(resolution > 0.0) {
            return Err(GridError::Invalid(format!(
                "resolution must be positive, got {resolution}"
            )));
        }
        self.resolution = resolution;
        self.dim = derive_dim(self.resolution, self.dimension);
        Ok(())
    }

    pub fn dimension(&self) -> f32 {
        self.dimension
    }

    pub fn set_dimension(&mut self, dimension: f32) -> GridResult<()> {
        if !(dimension >= 0.0) {
            return Err(GridError::Invalid(format!(
                "dimension must be non-negative, got {dimension}"
            )));
        }
        self.dimension = dimension;
        self.dim = derive_dim(self.resolution, self.dimension);
        Ok(())
    }

    /// Number of voxel centers along each spatial axis.
    pub fn points_per_side(&self) -> usize {
        self.dim
    }

    pub fn grid_dims(&self) -> [usize; 3] {
        [self.dim, self.dim, self.dim]
    }

    pub fn binary(&self) -> bool {
        self.kernel.binary()
    }

    pub fn set_binary(&mut self, binary: bool) {
        self.kernel.set_binary(binary);
    }

    pub fn radius_scale(&self) -> f32 {
        self.kernel.radius_scale()
    }

    pub fn set_radius_scale(&mut self, radius_scale: f32) -> GridResult<()> {
        self.kernel.set_radius_scale(radius_scale)
    }

    pub fn gaussian_radius_multiple(&self) -> f32 {
        self.kernel.gaussian_radius_multiple()
    }

    pub fn set_gaussian_radius_multiple(&mut self, multiple: f32) -> GridResult<()> {
        self.kernel.set_gaussian_radius_multiple(multiple)
    }

    pub fn final_radius_multiple(&self) -> f32 {
        self.kernel.final_radius_multiple()
    }

    pub fn kernel(&self) -> &RadialKernel {
        &self.kernel
    }

    /// Center of the minimum-corner voxel for a grid centered on
    /// `grid_center`.
    pub fn grid_origin(&self, grid_center: Vec3) -> Vec3 {
        grid_origin(grid_center, self.dim, self.resolution)
    }

    /// Rasterize a coordinate set, dispatching on its type encoding.
    /// The output grid is fully overwritten.
    pub fn forward<T: GridElement>(
        &self,
        grid_center: Vec3,
        atoms: &CoordinateSet,
        out: &mut ArrayViewMut4<'_, T>,
    ) -> GridResult<()> {
        match &atoms.types {
            AtomTypes::Index(type_index) => {
                self.forward_index(grid_center, &atoms.coords, type_index, &atoms.radii, out)
            }
            AtomTypes::Vector { weights, num_types } => self.forward_vector(
                grid_center,
                &atoms.coords,
                weights,
                *num_types,
                &atoms.radii,
                out,
            ),
        }
    }

    /// Rasterize index-typed atoms: each active atom accumulates its
    /// density into the channel named by its type index.
    pub fn forward_index<T: GridElement>(
        &self,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_index: &[f32],
        radii: &[f32],
        out: &mut ArrayViewMut4<'_, T>,
    ) -> GridResult<()> {
        check_atom_arrays(coords.len(), type_index.len(), radii.len())?;
        self.check_grid_shape(out.shape(), "output grid")?;
        let n_types = out.shape()[0];
        let origin = self.grid_origin(grid_center);
        let binary = self.kernel.binary();
        out.fill(T::zero());
        for i in 0..coords.len() {
            let Some(channel) = active_channel(i, type_index[i], n_types)? else {
                continue;
            };
            let Some(atom) = self.atom_extent(origin, coords[i], radii[i]) else {
                continue;
            };
            for x in atom.xlo..atom.xhi {
                let dx = origin.x as f64 + x as f64 * self.resolution as f64 - coords[i][0] as f64;
                for y in atom.ylo..atom.yhi {
                    let dy =
                        origin.y as f64 + y as f64 * self.resolution as f64 - coords[i][1] as f64;
                    for z in atom.zlo..atom.zhi {
                        let dz = origin.z as f64
                            + z as f64 * self.resolution as f64
                            - coords[i][2] as f64;
                        let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                        let density = self.kernel.density(dist, atom.radius);
                        if density <= 0.0 {
                            continue;
                        }
                        if binary {
                            out[[channel, x, y, z]] = T::one();
                        } else {
                            out[[channel, x, y, z]] += T::from_f64(density);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Rasterize vector-typed atoms: every atom contributes to every
    /// channel, weighted by its type vector. Overlapping atoms sum; in
    /// binary mode the density factor is the 0/1 occupancy, so a voxel
    /// collects the summed weights of the atoms covering it.
    pub fn forward_vector<T: GridElement>(
        &self,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_weights: &[f32],
        num_types: usize,
        radii: &[f32],
        out: &mut ArrayViewMut4<'_, T>,
    ) -> GridResult<()> {
        check_coords_radii(coords.len(), radii.len())?;
        check_weight_rows(coords.len(), type_weights.len(), num_types)?;
        self.check_grid_shape(out.shape(), "output grid")?;
        if out.shape()[0] != num_types {
            return Err(GridError::ShapeMismatch(format!(
                "output grid has {} channels but type vectors have {num_types}",
                out.shape()[0]
            )));
        }
        let origin = self.grid_origin(grid_center);
        out.fill(T::zero());
        for i in 0..coords.len() {
            let Some(atom) = self.atom_extent(origin, coords[i], radii[i]) else {
                continue;
            };
            let weights = &type_weights[i * num_types..(i + 1) * num_types];
            for x in atom.xlo..atom.xhi {
                let dx = origin.x as f64 + x as f64 * self.resolution as f64 - coords[i][0] as f64;
                for y in atom.ylo..atom.yhi {
                    let dy =
                        origin.y as f64 + y as f64 * self.resolution as f64 - coords[i][1] as f64;
                    for z in atom.zlo..atom.zhi {
                        let dz = origin.z as f64
                            + z as f64 * self.resolution as f64
                            - coords[i][2] as f64;
                        let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                        let density = self.kernel.density(dist, atom.radius);
                        if density <= 0.0 {
                            continue;
                        }
                        for (c, w) in weights.iter().enumerate() {
                            if *w == 0.0 {
                                continue;
                            }
                            out[[c, x, y, z]] += T::from_f64(*w as f64 * density);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Rasterize each example into one slab of a batched grid. The leading
    /// extent of `out` must equal the number of examples.
    pub fn forward_batch<T: GridElement>(
        &self,
        grid_centers: &[Vec3],
        examples: &[CoordinateSet],
        out: &mut ArrayViewMut5<'_, T>,
    ) -> GridResult<()> {
        if grid_centers.len() != examples.len() {
            return Err(GridError::ShapeMismatch(format!(
                "{} grid centers for {} examples",
                grid_centers.len(),
                examples.len()
            )));
        }
        if out.shape()[0] != examples.len() {
            return Err(GridError::OutOfRange(format!(
                "batch grid holds {} examples but {} were provided",
                out.shape()[0],
                examples.len()
            )));
        }
        for (i, (center, example)) in grid_centers.iter().zip(examples).enumerate() {
            let mut slab = out.index_axis_mut(Axis(0), i);
            self.forward(*center, example, &mut slab)?;
        }
        Ok(())
    }

    /// Apply a rigid transform to the coordinates and rasterize, using the
    /// transform's center as the grid center. Keep the transform around to
    /// carry gradients back through it.
    pub fn forward_transformed<T: GridElement>(
        &self,
        atoms: &CoordinateSet,
        transform: &Transform,
        out: &mut ArrayViewMut4<'_, T>,
    ) -> GridResult<()> {
        let moved = transform.forward_coords(&atoms.coords);
        match &atoms.types {
            AtomTypes::Index(type_index) => {
                self.forward_index(transform.center(), &moved, type_index, &atoms.radii, out)
            }
            AtomTypes::Vector { weights, num_types } => self.forward_vector(
                transform.center(),
                &moved,
                weights,
                *num_types,
                &atoms.radii,
                out,
            ),
        }
    }

    /// Training-time augmentation: rasterize under a random rotation and
    /// translation. `grid_center` of `None` centers the grid on the
    /// coordinate centroid. Returns the transform that was applied.
    pub fn forward_randomized<T: GridElement, R: Rng + ?Sized>(
        &self,
        atoms: &CoordinateSet,
        out: &mut ArrayViewMut4<'_, T>,
        random_translation: f32,
        random_rotation: bool,
        grid_center: Option<Vec3>,
        rng: &mut R,
    ) -> GridResult<Transform> {
        let center = grid_center.unwrap_or_else(|| atoms.center());
        let transform = Transform::random(center, random_translation, random_rotation, rng);
        self.forward_transformed(atoms, &transform, out)?;
        Ok(transform)
    }

    /// Coordinate gradients for an index-typed set.
    pub fn backward<T: GridElement>(
        &self,
        grid_center: Vec3,
        atoms: &CoordinateSet,
        diff: &ArrayView4<'_, T>,
        atom_gradients: &mut ArrayViewMut2<'_, T>,
    ) -> GridResult<()> {
        match &atoms.types {
            AtomTypes::Index(type_index) => self.backward_index(
                grid_center,
                &atoms.coords,
                type_index,
                &atoms.radii,
                diff,
                atom_gradients,
            ),
            AtomTypes::Vector { .. } => Err(GridError::TypeEncodingMissing(
                "index types missing from coordinate set".into(),
            )),
        }
    }

    /// Coordinate and type-weight gradients for a vector-typed set.
    pub fn backward_with_type_gradients<T: GridElement>(
        &self,
        grid_center: Vec3,
        atoms: &CoordinateSet,
        diff: &ArrayView4<'_, T>,
        atom_gradients: &mut ArrayViewMut2<'_, T>,
        type_gradients: &mut ArrayViewMut2<'_, T>,
    ) -> GridResult<()> {
        match &atoms.types {
            AtomTypes::Vector { weights, num_types } => self.backward_vector(
                grid_center,
                &atoms.coords,
                weights,
                *num_types,
                &atoms.radii,
                diff,
                atom_gradients,
                type_gradients,
            ),
            AtomTypes::Index(_) => Err(GridError::TypeEncodingMissing(
                "vector types missing from coordinate set".into(),
            )),
        }
    }

    /// Coordinate gradients from raw index-typed arrays. Each atom reads
    /// the gradient grid over the same bounding box forward wrote and
    /// accumulates `diff * (-d density/d distance)` along the unit vector
    /// from atom to voxel center.
    pub fn backward_index<T: GridElement>(
        &self,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_index: &[f32],
        radii: &[f32],
        diff: &ArrayView4<'_, T>,
        atom_gradients: &mut ArrayViewMut2<'_, T>,
    ) -> GridResult<()> {
        self.reject_binary()?;
        check_atom_arrays(coords.len(), type_index.len(), radii.len())?;
        self.check_grid_shape(diff.shape(), "gradient grid")?;
        check_rows(atom_gradients.shape(), coords.len(), 3, "atom gradients")?;
        let n_types = diff.shape()[0];
        let origin = self.grid_origin(grid_center);
        atom_gradients.fill(T::zero());
        for i in 0..coords.len() {
            let Some(channel) = active_channel(i, type_index[i], n_types)? else {
                continue;
            };
            let Some(atom) = self.atom_extent(origin, coords[i], radii[i]) else {
                continue;
            };
            let mut grad = [0.0f64; 3];
            for x in atom.xlo..atom.xhi {
                let dx = origin.x as f64 + x as f64 * self.resolution as f64 - coords[i][0] as f64;
                for y in atom.ylo..atom.yhi {
                    let dy =
                        origin.y as f64 + y as f64 * self.resolution as f64 - coords[i][1] as f64;
                    for z in atom.zlo..atom.zhi {
                        let dz = origin.z as f64
                            + z as f64 * self.resolution as f64
                            - coords[i][2] as f64;
                        let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                        if dist <= 0.0 {
                            continue;
                        }
                        let slope = self.kernel.slope(dist, atom.radius);
                        if slope == 0.0 {
                            continue;
                        }
                        let g = diff[[channel, x, y, z]].to_f64();
                        if g == 0.0 {
                            continue;
                        }
                        let scale = -slope * g / dist;
                        grad[0] += scale * dx;
                        grad[1] += scale * dy;
                        grad[2] += scale * dz;
                    }
                }
            }
            atom_gradients[[i, 0]] = T::from_f64(grad[0]);
            atom_gradients[[i, 1]] = T::from_f64(grad[1]);
            atom_gradients[[i, 2]] = T::from_f64(grad[2]);
        }
        Ok(())
    }

    /// Coordinate and type gradients from raw vector-typed arrays. The
    /// coordinate gradient weighs each channel's grid gradient by the
    /// atom's weight on that channel; the type gradient against channel
    /// `c` is the correlation of the gradient grid with the atom's
    /// unweighted density.
    #[allow(clippy::too_many_arguments)]
    pub fn backward_vector<T: GridElement>(
        &self,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_weights: &[f32],
        num_types: usize,
        radii: &[f32],
        diff: &ArrayView4<'_, T>,
        atom_gradients: &mut ArrayViewMut2<'_, T>,
        type_gradients: &mut ArrayViewMut2<'_, T>,
    ) -> GridResult<()> {
        self.reject_binary()?;
        check_coords_radii(coords.len(), radii.len())?;
        check_weight_rows(coords.len(), type_weights.len(), num_types)?;
        self.check_grid_shape(diff.shape(), "gradient grid")?;
        check_rows(atom_gradients.shape(), coords.len(), 3, "atom gradients")?;
        check_rows(type_gradients.shape(), coords.len(), num_types, "type gradients")?;
        if diff.shape()[0] != num_types {
            return Err(GridError::ShapeMismatch(format!(
                "gradient grid has {} channels but type vectors have {num_types}",
                diff.shape()[0]
            )));
        }
        let origin = self.grid_origin(grid_center);
        atom_gradients.fill(T::zero());
        type_gradients.fill(T::zero());
        let mut type_grad = vec![0.0f64; num_types];
        for i in 0..coords.len() {
            let Some(atom) = self.atom_extent(origin, coords[i], radii[i]) else {
                continue;
            };
            let weights = &type_weights[i * num_types..(i + 1) * num_types];
            let mut grad = [0.0f64; 3];
            type_grad.fill(0.0);
            for x in atom.xlo..atom.xhi {
                let dx = origin.x as f64 + x as f64 * self.resolution as f64 - coords[i][0] as f64;
                for y in atom.ylo..atom.yhi {
                    let dy =
                        origin.y as f64 + y as f64 * self.resolution as f64 - coords[i][1] as f64;
                    for z in atom.zlo..atom.zhi {
                        let dz = origin.z as f64
                            + z as f64 * self.resolution as f64
                            - coords[i][2] as f64;
                        let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                        let density = self.kernel.density(dist, atom.radius);
                        let slope = self.kernel.slope(dist, atom.radius);
                        if density == 0.0 && slope == 0.0 {
                            continue;
                        }
                        for (c, w) in weights.iter().enumerate() {
                            let g = diff[[c, x, y, z]].to_f64();
                            if g == 0.0 {
                                continue;
                            }
                            type_grad[c] += g * density;
                            if *w != 0.0 && dist > 0.0 && slope != 0.0 {
                                let scale = -slope * g * *w as f64 / dist;
                                grad[0] += scale * dx;
                                grad[1] += scale * dy;
                                grad[2] += scale * dz;
                            }
                        }
                    }
                }
            }
            atom_gradients[[i, 0]] = T::from_f64(grad[0]);
            atom_gradients[[i, 1]] = T::from_f64(grad[1]);
            atom_gradients[[i, 2]] = T::from_f64(grad[2]);
            for (c, value) in type_grad.iter().enumerate() {
                type_gradients[[i, c]] = T::from_f64(*value);
            }
        }
        Ok(())
    }

    /// Distribute layer-wise relevance onto an index-typed set.
    pub fn backward_relevance<T: GridElement>(
        &self,
        grid_center: Vec3,
        atoms: &CoordinateSet,
        density: &ArrayView4<'_, T>,
        diff: &ArrayView4<'_, T>,
        relevance: &mut ArrayViewMut1<'_, T>,
    ) -> GridResult<()> {
        match &atoms.types {
            AtomTypes::Index(type_index) => self.backward_relevance_index(
                grid_center,
                &atoms.coords,
                type_index,
                &atoms.radii,
                density,
                diff,
                relevance,
            ),
            AtomTypes::Vector { .. } => Err(GridError::TypeEncodingMissing(
                "index types missing from coordinate set".into(),
            )),
        }
    }

    /// Relevance from raw index-typed arrays. Each voxel's relevance is
    /// split across contributing atoms in proportion to each atom's share
    /// of the voxel's total density, so `relevance[i]` accumulates
    /// `diff * atom_density / voxel_density` over the atom's bounding box.
    /// Voxels whose stored density is not positive contribute nothing.
    #[allow(clippy::too_many_arguments)]
    pub fn backward_relevance_index<T: GridElement>(
        &self,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_index: &[f32],
        radii: &[f32],
        density: &ArrayView4<'_, T>,
        diff: &ArrayView4<'_, T>,
        relevance: &mut ArrayViewMut1<'_, T>,
    ) -> GridResult<()> {
        self.reject_binary()?;
        check_atom_arrays(coords.len(), type_index.len(), radii.len())?;
        self.check_grid_shape(density.shape(), "density grid")?;
        self.check_grid_shape(diff.shape(), "relevance grid")?;
        if density.shape()[0] != diff.shape()[0] {
            return Err(GridError::ShapeMismatch(format!(
                "density grid has {} channels but relevance grid has {}",
                density.shape()[0],
                diff.shape()[0]
            )));
        }
        if relevance.len() != coords.len() {
            return Err(GridError::ShapeMismatch(format!(
                "relevance output has {} entries for {} atoms",
                relevance.len(),
                coords.len()
            )));
        }
        let n_types = diff.shape()[0];
        let origin = self.grid_origin(grid_center);
        relevance.fill(T::zero());
        for i in 0..coords.len() {
            let Some(channel) = active_channel(i, type_index[i], n_types)? else {
                continue;
            };
            let Some(atom) = self.atom_extent(origin, coords[i], radii[i]) else {
                continue;
            };
            let mut sum = 0.0f64;
            for x in atom.xlo..atom.xhi {
                let dx = origin.x as f64 + x as f64 * self.resolution as f64 - coords[i][0] as f64;
                for y in atom.ylo..atom.yhi {
                    let dy =
                        origin.y as f64 + y as f64 * self.resolution as f64 - coords[i][1] as f64;
                    for z in atom.zlo..atom.zhi {
                        let dz = origin.z as f64
                            + z as f64 * self.resolution as f64
                            - coords[i][2] as f64;
                        let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                        let atom_density = self.kernel.density(dist, atom.radius);
                        if atom_density <= 0.0 {
                            continue;
                        }
                        let voxel_density = density[[channel, x, y, z]].to_f64();
                        if voxel_density <= 0.0 {
                            continue;
                        }
                        let g = diff[[channel, x, y, z]].to_f64();
                        sum += g * atom_density / voxel_density;
                    }
                }
            }
            relevance[i] = T::from_f64(sum);
        }
        Ok(())
    }

    fn check_grid_shape(&self, shape: &[usize], what: &str) -> GridResult<()> {
        if shape[1] != self.dim || shape[2] != self.dim || shape[3] != self.dim {
            return Err(GridError::ShapeMismatch(format!(
                "{what} has spatial extents {}x{}x{}, expected {dim}x{dim}x{dim}",
                shape[1],
                shape[2],
                shape[3],
                dim = self.dim
            )));
        }
        Ok(())
    }

    fn reject_binary(&self) -> GridResult<()> {
        if self.kernel.binary() {
            return Err(GridError::Unsupported(
                "binary density has no usable derivative".into(),
            ));
        }
        Ok(())
    }

    /// Bounding box and scaled radius of one atom, or `None` when the atom
    /// cannot touch the grid.
    fn atom_extent(&self, origin: Vec3, coord: [f32; 3], radius: f32) -> Option<AtomExtent> {
        let effective = self.kernel.effective_radius(radius);
        if effective <= 0.0 {
            return None;
        }
        let density_radius = self.kernel.density_radius(radius);
        let (xlo, xhi) = bounds_1d(origin.x, coord[0], density_radius, self.resolution, self.dim);
        let (ylo, yhi) = bounds_1d(origin.y, coord[1], density_radius, self.resolution, self.dim);
        let (zlo, zhi) = bounds_1d(origin.z, coord[2], density_radius, self.resolution, self.dim);
        if xlo >= xhi || ylo >= yhi || zlo >= zhi {
            return None;
        }
        Some(AtomExtent {
            radius: effective as f64,
            xlo,
            xhi,
            ylo,
            yhi,
            zlo,
            zhi,
        })
    }
}

struct AtomExtent {
    radius: f64,
    xlo: usize,
    xhi: usize,
    ylo: usize,
    yhi: usize,
    zlo: usize,
    zhi: usize,
}

fn derive_dim(resolution: f32, dimension: f32) -> usize {
    (dimension / resolution).round() as usize + 1
}

fn check_atom_arrays(n_coords: usize, n_types: usize, n_radii: usize) -> GridResult<()> {
    if n_coords != n_types || n_coords != n_radii {
        return Err(GridError::ShapeMismatch(format!(
            "atom arrays disagree: {n_coords} coords, {n_types} types, {n_radii} radii"
        )));
    }
    Ok(())
}

fn check_coords_radii(n_coords: usize, n_radii: usize) -> GridResult<()> {
    if n_coords != n_radii {
        return Err(GridError::ShapeMismatch(format!(
            "atom arrays disagree: {n_coords} coords, {n_radii} radii"
        )));
    }
    Ok(())
}

fn check_weight_rows(n_atoms: usize, n_weights: usize, num_types: usize) -> GridResult<()> {
    if n_weights != n_atoms * num_types {
        return Err(GridError::ShapeMismatch(format!(
            "type weights have {n_weights} entries, expected {n_atoms} x {num_types}"
        )));
    }
    Ok(())
}

fn check_rows(shape: &[usize], rows: usize, cols: usize, what: &str) -> GridResult<()> {
    if shape[0] != rows || shape[1] != cols {
        return Err(GridError::ShapeMismatch(format!(
            "{what} shaped {}x{}, expected {rows}x{cols}",
            shape[0], shape[1]
        )));
    }
    Ok(())
}

/// Channel of an active atom, `None` for a disabled one. A channel id at
/// or beyond the grid's channel count is a caller error.
fn active_channel(atom: usize, type_index: f32, n_types: usize) -> GridResult<Option<usize>> {
    if type_index < 0.0 {
        return Ok(None);
    }
    let channel = type_index as usize;
    if channel >= n_types {
        return Err(GridError::ShapeMismatch(format!(
            "atom {atom} has channel {channel} but the grid has {n_types} channels"
        )));
    }
    Ok(Some(channel))
}
