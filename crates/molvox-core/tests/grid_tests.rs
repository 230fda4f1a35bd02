use molvox_core::{CoordinateSet, GridError, GridMaker, Transform, Vec3};
use ndarray::{Array1, Array2, Array4, Array5, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;

mod common;
use common::{exhaustive_forward_index, single_atom, TOL};

#[test]
fn grid_extent_follows_resolution_and_dimension() {
    let mut maker = GridMaker::new(0.5, 23.5).expect("maker");
    assert_eq!(maker.points_per_side(), 48);
    assert_eq!(maker.grid_dims(), [48, 48, 48]);

    maker.set_dimension(6.0).unwrap();
    assert_eq!(maker.points_per_side(), 13);

    maker.set_resolution(0.1).unwrap();
    assert_eq!(maker.points_per_side(), 61);
}

#[test]
fn setters_refresh_kernel_coefficients() {
    let mut maker = GridMaker::new(0.5, 6.0).unwrap();
    assert!((maker.final_radius_multiple() - 1.5).abs() < 1e-6);

    maker.set_gaussian_radius_multiple(1.5).unwrap();
    let expected = (1.0 + 2.0 * 1.5f32 * 1.5) / (2.0 * 1.5);
    assert!((maker.final_radius_multiple() - expected).abs() < 1e-6);
}

#[test]
fn forward_matches_exhaustive_reference() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let coords = [
        [0.2f32, 0.3, -0.4],
        [1.0, -1.0, 0.5],
        [-0.6, 0.8, 0.1],
        [4.0, -3.5, 2.0],
    ];
    let type_index = [0.0f32, 1.0, 0.0, -1.0];
    let radii = [1.5f32, 1.0, 1.2, 1.0];
    let center = Vec3::new(0.0, 0.0, 0.0);

    let dim = maker.points_per_side();
    let mut out = Array4::<f32>::zeros((2, dim, dim, dim));
    maker
        .forward_index(center, &coords, &type_index, &radii, &mut out.view_mut())
        .unwrap();

    let reference = exhaustive_forward_index(&maker, center, &coords, &type_index, &radii, 2);
    let mut peak = 0.0f64;
    for (a, b) in out.iter().zip(reference.iter()) {
        assert!((*a as f64 - *b).abs() < 1e-5);
        peak = peak.max(*b);
    }
    assert!(peak > 0.5, "reference grid never saw an atom");
}

#[test]
fn forward_overwrites_stale_contents() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let atoms = single_atom([0.0, 0.0, 0.0], 0.0, 1.0);
    let dim = maker.points_per_side();
    let mut out = Array4::<f32>::from_elem((1, dim, dim, dim), 7.0);
    maker
        .forward(Vec3::default(), &atoms, &mut out.view_mut())
        .unwrap();
    // a 1 A atom cannot reach the grid corner
    assert_eq!(out[[0, 0, 0, 0]], 0.0);
}

#[test]
fn overlapping_atoms_accumulate() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();

    let one = single_atom([0.0, 0.0, 0.0], 0.0, 1.5);
    let mut single = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &one, &mut single.view_mut())
        .unwrap();

    let two = CoordinateSet::with_index_types(
        vec![[0.0; 3], [0.0; 3]],
        vec![0.0, 0.0],
        vec![1.5, 1.5],
    )
    .unwrap();
    let mut doubled = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &two, &mut doubled.view_mut())
        .unwrap();

    for (a, b) in doubled.iter().zip(single.iter()) {
        assert!((*a - 2.0 * *b).abs() < TOL as f32);
    }
}

#[test]
fn binary_mode_clamps_overlap_to_unit() {
    let mut maker = GridMaker::new(0.5, 6.0).unwrap();
    maker.set_binary(true);
    let dim = maker.points_per_side();
    let atoms = CoordinateSet::with_index_types(
        vec![[0.0; 3], [0.2, 0.0, 0.0]],
        vec![0.0, 0.0],
        vec![1.5, 1.5],
    )
    .unwrap();
    let mut out = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &atoms, &mut out.view_mut())
        .unwrap();
    for v in out.iter() {
        assert!(*v == 0.0 || *v == 1.0);
    }
    let mid = dim / 2;
    assert_eq!(out[[0, mid, mid, mid]], 1.0);
}

#[test]
fn binary_vector_overlap_sums_weights() {
    let mut maker = GridMaker::new(0.5, 6.0).unwrap();
    maker.set_binary(true);
    let dim = maker.points_per_side();
    let positions = [[0.0f32, 0.0, 0.0], [0.4, 0.0, 0.0]];
    let weights = [0.5f32, 0.25];
    let atoms = CoordinateSet::with_vector_types(
        positions.to_vec(),
        weights.to_vec(),
        1,
        vec![1.5, 1.5],
    )
    .unwrap();

    let mut out = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &atoms, &mut out.view_mut())
        .unwrap();

    // both atoms cover the grid center, only the second reaches x = 2.5
    let mid = dim / 2;
    assert!((out[[0, mid, mid, mid]] - 0.75).abs() < 1e-6);
    assert!((out[[0, 11, mid, mid]] - 0.25).abs() < 1e-6);

    // every voxel collects the summed weights of the atoms covering it
    let origin = maker.grid_origin(Vec3::default());
    let res = maker.resolution() as f64;
    let radius = maker.kernel().effective_radius(1.5) as f64;
    for x in 0..dim {
        for y in 0..dim {
            for z in 0..dim {
                let mut expected = 0.0f64;
                for (pos, w) in positions.iter().zip(weights) {
                    let dx = origin.x as f64 + x as f64 * res - pos[0] as f64;
                    let dy = origin.y as f64 + y as f64 * res - pos[1] as f64;
                    let dz = origin.z as f64 + z as f64 * res - pos[2] as f64;
                    let dist = (dx * dx + dy * dy + dz * dz).sqrt();
                    expected += w as f64 * maker.kernel().density(dist, radius);
                }
                assert!((out[[0, x, y, z]] as f64 - expected).abs() < 1e-6);
            }
        }
    }
}

#[test]
fn inactive_atoms_are_skipped() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let atoms = single_atom([0.0, 0.0, 0.0], -1.0, 1.5);
    let dim = maker.points_per_side();
    let mut out = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &atoms, &mut out.view_mut())
        .unwrap();
    assert!(out.iter().all(|v| *v == 0.0));
}

#[test]
fn atoms_outside_the_grid_contribute_nothing() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let atoms = single_atom([100.0, -50.0, 80.0], 0.0, 2.0);
    let dim = maker.points_per_side();
    let mut out = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &atoms, &mut out.view_mut())
        .unwrap();
    assert!(out.iter().all(|v| *v == 0.0));
}

#[test]
fn zero_radius_atoms_contribute_nothing() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let atoms = single_atom([0.0, 0.0, 0.0], 0.0, 0.0);
    let dim = maker.points_per_side();
    let mut out = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &atoms, &mut out.view_mut())
        .unwrap();
    assert!(out.iter().all(|v| *v == 0.0));
}

#[test]
fn smooth_density_is_non_negative() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let atoms = CoordinateSet::with_index_types(
        vec![[0.4, -0.3, 0.9], [-1.1, 0.2, 0.0]],
        vec![0.0, 0.0],
        vec![1.8, 1.1],
    )
    .unwrap();
    let dim = maker.points_per_side();
    let mut out = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &atoms, &mut out.view_mut())
        .unwrap();
    assert!(out.iter().all(|v| *v >= 0.0));
}

#[test]
fn f32_and_f64_grids_agree() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let atoms = single_atom([0.3, -0.2, 0.1], 0.0, 1.5);
    let dim = maker.points_per_side();

    let mut grid32 = Array4::<f32>::zeros((1, dim, dim, dim));
    let mut grid64 = Array4::<f64>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &atoms, &mut grid32.view_mut())
        .unwrap();
    maker
        .forward(Vec3::default(), &atoms, &mut grid64.view_mut())
        .unwrap();
    for (a, b) in grid32.iter().zip(grid64.iter()) {
        assert!((*a as f64 - *b).abs() < 1e-6);
    }
}

#[test]
fn vector_weights_scale_channels() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();
    let atoms =
        CoordinateSet::with_vector_types(vec![[0.0; 3]], vec![0.5, 2.0], 2, vec![1.5]).unwrap();
    let mut out = Array4::<f32>::zeros((2, dim, dim, dim));
    maker
        .forward(Vec3::default(), &atoms, &mut out.view_mut())
        .unwrap();
    for x in 0..dim {
        for y in 0..dim {
            for z in 0..dim {
                assert!((out[[1, x, y, z]] - 4.0 * out[[0, x, y, z]]).abs() < TOL as f32);
            }
        }
    }
}

#[test]
fn unit_weight_vector_matches_index_forward() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();

    let indexed = single_atom([0.2, 0.1, -0.3], 0.0, 1.4);
    let mut expected = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &indexed, &mut expected.view_mut())
        .unwrap();

    let vectored =
        CoordinateSet::with_vector_types(vec![[0.2, 0.1, -0.3]], vec![1.0], 1, vec![1.4]).unwrap();
    let mut out = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(Vec3::default(), &vectored, &mut out.view_mut())
        .unwrap();

    for (a, b) in out.iter().zip(expected.iter()) {
        assert!((*a - *b).abs() < 1e-6);
    }
}

#[test]
fn batch_forward_equals_stacked_forwards() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();
    let examples = vec![
        single_atom([0.3, 0.0, 0.0], 0.0, 1.5),
        single_atom([-0.7, 0.4, 0.2], 0.0, 1.1),
    ];
    let centers = vec![Vec3::default(), Vec3::new(0.5, 0.0, 0.0)];

    let mut batch = Array5::<f32>::zeros((2, 1, dim, dim, dim));
    maker
        .forward_batch(&centers, &examples, &mut batch.view_mut())
        .unwrap();

    for (i, (center, example)) in centers.iter().zip(&examples).enumerate() {
        let mut single = Array4::<f32>::zeros((1, dim, dim, dim));
        maker
            .forward(*center, example, &mut single.view_mut())
            .unwrap();
        let slab = batch.index_axis(Axis(0), i);
        for (a, b) in slab.iter().zip(single.iter()) {
            assert_eq!(*a, *b);
        }
    }
}

#[test]
fn identity_transform_matches_plain_forward() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();
    let atoms = single_atom([0.4, -0.1, 0.7], 0.0, 1.3);
    let center = Vec3::new(0.2, 0.0, -0.1);

    let mut plain = Array4::<f32>::zeros((1, dim, dim, dim));
    maker.forward(center, &atoms, &mut plain.view_mut()).unwrap();

    let mut transformed = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward_transformed(
            &atoms,
            &Transform::identity(center),
            &mut transformed.view_mut(),
        )
        .unwrap();

    for (a, b) in transformed.iter().zip(plain.iter()) {
        // rotating about a non-zero center re-rounds the coordinates
        assert!((*a - *b).abs() < 1e-5);
    }
}

#[test]
fn randomized_forward_without_augmentation_centers_on_centroid() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();
    let atoms = CoordinateSet::with_index_types(
        vec![[0.5, 0.0, 0.0], [-0.5, 0.2, 0.4]],
        vec![0.0, 0.0],
        vec![1.2, 1.4],
    )
    .unwrap();

    let mut expected = Array4::<f32>::zeros((1, dim, dim, dim));
    maker
        .forward(atoms.center(), &atoms, &mut expected.view_mut())
        .unwrap();

    let mut rng = StdRng::seed_from_u64(9);
    let mut out = Array4::<f32>::zeros((1, dim, dim, dim));
    let transform = maker
        .forward_randomized(&atoms, &mut out.view_mut(), 0.0, false, None, &mut rng)
        .unwrap();
    assert!((transform.center().x - atoms.center().x).abs() < 1e-6);

    for (a, b) in out.iter().zip(expected.iter()) {
        assert!((*a - *b).abs() < 1e-5);
    }
}

#[test]
fn batch_forward_rejects_wrong_leading_extent() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();
    let examples = vec![single_atom([0.0; 3], 0.0, 1.5)];
    let centers = vec![Vec3::default()];
    let mut batch = Array5::<f32>::zeros((2, 1, dim, dim, dim));
    let err = maker
        .forward_batch(&centers, &examples, &mut batch.view_mut())
        .unwrap_err();
    assert!(matches!(err, GridError::OutOfRange(_)));
}

#[test]
fn forward_rejects_mismatched_shapes() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();
    let atoms = single_atom([0.0; 3], 0.0, 1.5);

    let mut wrong_spatial = Array4::<f32>::zeros((1, dim + 1, dim, dim));
    assert!(matches!(
        maker.forward(Vec3::default(), &atoms, &mut wrong_spatial.view_mut()),
        Err(GridError::ShapeMismatch(_))
    ));

    let mut out = Array4::<f32>::zeros((1, dim, dim, dim));
    let bad_channel = single_atom([0.0; 3], 3.0, 1.5);
    assert!(matches!(
        maker.forward(Vec3::default(), &bad_channel, &mut out.view_mut()),
        Err(GridError::ShapeMismatch(_))
    ));

    let err = maker
        .forward_index(
            Vec3::default(),
            &[[0.0; 3], [1.0; 3]],
            &[0.0],
            &[1.0, 1.0],
            &mut out.view_mut(),
        )
        .unwrap_err();
    assert!(matches!(err, GridError::ShapeMismatch(_)));
}

#[test]
fn backward_requires_index_types() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();
    let vectored =
        CoordinateSet::with_vector_types(vec![[0.0; 3]], vec![1.0], 1, vec![1.5]).unwrap();
    let diff = Array4::<f32>::zeros((1, dim, dim, dim));
    let mut grads = Array2::<f32>::zeros((1, 3));
    let err = maker
        .backward(
            Vec3::default(),
            &vectored,
            &diff.view(),
            &mut grads.view_mut(),
        )
        .unwrap_err();
    assert!(matches!(err, GridError::TypeEncodingMissing(_)));
}

#[test]
fn type_gradients_require_vector_types() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();
    let indexed = single_atom([0.0; 3], 0.0, 1.5);
    let diff = Array4::<f32>::zeros((1, dim, dim, dim));
    let mut grads = Array2::<f32>::zeros((1, 3));
    let mut type_grads = Array2::<f32>::zeros((1, 1));
    let err = maker
        .backward_with_type_gradients(
            Vec3::default(),
            &indexed,
            &diff.view(),
            &mut grads.view_mut(),
            &mut type_grads.view_mut(),
        )
        .unwrap_err();
    assert!(matches!(err, GridError::TypeEncodingMissing(_)));
}

#[test]
fn relevance_requires_index_types() {
    let maker = GridMaker::new(0.5, 6.0).unwrap();
    let dim = maker.points_per_side();
    let vectored =
        CoordinateSet::with_vector_types(vec![[0.0; 3]], vec![1.0], 1, vec![1.5]).unwrap();
    let density = Array4::<f32>::zeros((1, dim, dim, dim));
    let diff = Array4::<f32>::zeros((1, dim, dim, dim));
    let mut relevance = Array1::<f32>::zeros(1);
    let err = maker
        .backward_relevance(
            Vec3::default(),
            &vectored,
            &density.view(),
            &diff.view(),
            &mut relevance.view_mut(),
        )
        .unwrap_err();
    assert!(matches!(err, GridError::TypeEncodingMissing(_)));
}

#[test]
fn binary_mode_has_no_backward() {
    let mut maker = GridMaker::new(0.5, 6.0).unwrap();
    maker.set_binary(true);
    let dim = maker.points_per_side();
    let atoms = single_atom([0.0; 3], 0.0, 1.5);
    let diff = Array4::<f32>::zeros((1, dim, dim, dim));
    let mut grads = Array2::<f32>::zeros((1, 3));
    let err = maker
        .backward(Vec3::default(), &atoms, &diff.view(), &mut grads.view_mut())
        .unwrap_err();
    assert!(matches!(err, GridError::Unsupported(_)));
}
