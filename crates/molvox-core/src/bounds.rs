use crate::geom::Vec3;

/// Center of the minimum-corner voxel for a cubic grid of `dim` points per
/// side centered on `center`.
pub fn grid_origin(center: Vec3, dim: usize, resolution: f32) -> Vec3 {
    let half = 0.5 * dim.saturating_sub(1) as f32 * resolution;
    Vec3::new(center.x - half, center.y - half, center.z - half)
}

/// Clipped `[lo, hi)` range of voxel indices along one axis whose centers
/// can fall within `density_radius` of `coord`. An empty range (`lo >= hi`)
/// means the atom contributes nothing along this axis; atoms outside the
/// grid clip to empty rather than erroring.
pub fn bounds_1d(
    origin: f32,
    coord: f32,
    density_radius: f32,
    resolution: f32,
    dim: usize,
) -> (usize, usize) {
    let lo = ((coord - density_radius - origin) / resolution).ceil();
    let lo = if lo > 0.0 { lo as usize } else { 0 };
    let hi = ((coord + density_radius - origin) / resolution).floor() + 1.0;
    let hi = if hi > 0.0 { (hi as usize).min(dim) } else { 0 };
    (lo, hi)
}
