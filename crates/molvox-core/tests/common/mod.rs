#![allow(dead_code)]

use molvox_core::{CoordinateSet, GridMaker, Vec3};
use ndarray::Array4;

pub const TOL: f64 = 1e-4;

pub fn single_atom(pos: [f32; 3], channel: f32, radius: f32) -> CoordinateSet {
    CoordinateSet::with_index_types(vec![pos], vec![channel], vec![radius]).expect("atom arrays")
}

/// Unoptimized rasterizer used as the regression reference: evaluates the
/// kernel at every voxel for every atom, with no bounding boxes.
pub fn exhaustive_forward_index(
    maker: &GridMaker,
    grid_center: Vec3,
    coords: &[[f32; 3]],
    type_index: &[f32],
    radii: &[f32],
    n_types: usize,
) -> Array4<f64> {
    let dim = maker.points_per_side();
    let origin = maker.grid_origin(grid_center);
    let res = maker.resolution() as f64;
    let mut out = Array4::<f64>::zeros((n_types, dim, dim, dim));
    for i in 0..coords.len() {
        if type_index[i] < 0.0 {
            continue;
        }
        let channel = type_index[i] as usize;
        let radius = maker.kernel().effective_radius(radii[i]) as f64;
        if radius <= 0.0 {
            continue;
        }
        for x in 0..dim {
            let dx = origin.x as f64 + x as f64 * res - coords[i][0] as f64;
            for y in 0..dim {
                let dy = origin.y as f64 + y as f64 * res - coords[i][1] as f64;
                for z in 0..dim {
                    let dz = origin.z as f64 + z as f64 * res - coords[i][2] as f64;
                    let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                    out[[channel, x, y, z]] += maker.kernel().density(dist, radius);
                }
            }
        }
    }
    out
}
