use molvox_core::GridMaker;

use super::*;

const BLOCK: u32 = 256;

/// One block per BLOCK atoms, and always at least one block so empty
/// launches stay well formed.
fn atom_blocks(n_atoms: usize) -> u32 {
    n_atoms.max(1).div_ceil(BLOCK as usize) as u32
}

/// Scalar launch arguments shared by every gridding kernel.
struct LaunchParams {
    n_atoms: i32,
    origin: Float4,
    dim: i32,
    n_types: i32,
    resolution: f32,
    radius_scale: f32,
    grm: f32,
    frm: f32,
    qa: f32,
    qb: f32,
    qc: f32,
}

fn launch_params(maker: &GridMaker, grid_center: Vec3, n_atoms: usize, n_types: usize) -> LaunchParams {
    let (qa, qb, qc) = maker.kernel().quadratic_coefficients();
    LaunchParams {
        n_atoms: n_atoms as i32,
        origin: float4_from(maker.grid_origin(grid_center)),
        dim: maker.points_per_side() as i32,
        n_types: n_types as i32,
        resolution: maker.resolution(),
        radius_scale: maker.radius_scale(),
        grm: maker.gaussian_radius_multiple(),
        frm: maker.final_radius_multiple(),
        qa: qa as f32,
        qb: qb as f32,
        qc: qc as f32,
    }
}

fn check_atom_arrays(op: &str, n_coords: usize, n_types: usize, n_radii: usize) -> GridResult<()> {
    if n_coords != n_types || n_coords != n_radii {
        return Err(GridError::ShapeMismatch(format!(
            "{op} input lengths do not match"
        )));
    }
    Ok(())
}

fn check_grid_len(op: &str, len: usize, expected: usize) -> GridResult<()> {
    if len != expected {
        return Err(GridError::ShapeMismatch(format!(
            "{op} grid has {len} elements, expected {expected}"
        )));
    }
    Ok(())
}

fn reject_binary(maker: &GridMaker) -> GridResult<()> {
    if maker.binary() {
        return Err(GridError::Unsupported(
            "binary density has no usable derivative".into(),
        ));
    }
    Ok(())
}

impl GpuContext {
    pub fn new(device: usize) -> GridResult<Self> {
        let ctx = CudaContext::new(device).map_err(map_driver_err)?;
        let stream = ctx.default_stream();
        let ptx = compile_ptx(KERNELS_SRC).map_err(map_compile_err)?;
        let module = ctx.load_module(ptx).map_err(map_driver_err)?;
        let kernels = Kernels::load(&module)?;
        Ok(Self {
            inner: Arc::new(GpuContextInner {
                stream,
                module,
                kernels,
            }),
        })
    }

    /// Rasterize index-typed atoms on the device. Returns the dense
    /// `(n_types, dim, dim, dim)` grid as a flat host vector.
    pub fn forward_index(
        &self,
        maker: &GridMaker,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_index: &[f32],
        radii: &[f32],
        n_types: usize,
    ) -> GridResult<Vec<f32>> {
        check_atom_arrays("forward_index", coords.len(), type_index.len(), radii.len())?;
        let dim = maker.points_per_side();
        let n_voxels = n_types * dim * dim * dim;
        if coords.is_empty() {
            return Ok(vec![0.0; n_voxels]);
        }
        let stream = &self.inner.stream;
        let coords_dev = stream
            .clone_htod(&convert_coords(coords))
            .map_err(map_driver_err)?;
        let types_dev = stream.clone_htod(type_index).map_err(map_driver_err)?;
        let radii_dev = stream.clone_htod(radii).map_err(map_driver_err)?;
        let mut out_dev = stream
            .alloc_zeros::<f32>(n_voxels)
            .map_err(map_driver_err)?;
        let p = launch_params(maker, grid_center, coords.len(), n_types);
        let binary = i32::from(maker.binary());

        let cfg = LaunchConfig {
            block_dim: (BLOCK, 1, 1),
            grid_dim: (atom_blocks(coords.len()), 1, 1),
            shared_mem_bytes: 0,
        };
        unsafe {
            let mut builder = stream.launch_builder(&self.inner.kernels.forward_index);
            builder.arg(&coords_dev);
            builder.arg(&types_dev);
            builder.arg(&radii_dev);
            builder.arg(&p.n_atoms);
            builder.arg(&p.origin);
            builder.arg(&p.dim);
            builder.arg(&p.n_types);
            builder.arg(&p.resolution);
            builder.arg(&p.radius_scale);
            builder.arg(&p.grm);
            builder.arg(&p.frm);
            builder.arg(&p.qa);
            builder.arg(&p.qb);
            builder.arg(&p.qc);
            builder.arg(&binary);
            builder.arg(&mut out_dev);
            builder.launch(cfg).map_err(map_driver_err)?;
        }

        let mut host = vec![0.0f32; n_voxels];
        stream
            .memcpy_dtoh(&out_dev, &mut host)
            .map_err(map_driver_err)?;
        Ok(host)
    }

    /// Rasterize vector-typed atoms on the device.
    pub fn forward_vector(
        &self,
        maker: &GridMaker,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_weights: &[f32],
        num_types: usize,
        radii: &[f32],
    ) -> GridResult<Vec<f32>> {
        check_atom_arrays("forward_vector", coords.len(), radii.len(), radii.len())?;
        if type_weights.len() != coords.len() * num_types {
            return Err(GridError::ShapeMismatch(format!(
                "forward_vector weights have {} entries, expected {} x {num_types}",
                type_weights.len(),
                coords.len()
            )));
        }
        let dim = maker.points_per_side();
        let n_voxels = num_types * dim * dim * dim;
        if coords.is_empty() {
            return Ok(vec![0.0; n_voxels]);
        }
        let stream = &self.inner.stream;
        let coords_dev = stream
            .clone_htod(&convert_coords(coords))
            .map_err(map_driver_err)?;
        let weights_dev = stream.clone_htod(type_weights).map_err(map_driver_err)?;
        let radii_dev = stream.clone_htod(radii).map_err(map_driver_err)?;
        let mut out_dev = stream
            .alloc_zeros::<f32>(n_voxels)
            .map_err(map_driver_err)?;
        let p = launch_params(maker, grid_center, coords.len(), num_types);
        let binary = i32::from(maker.binary());

        let cfg = LaunchConfig {
            block_dim: (BLOCK, 1, 1),
            grid_dim: (atom_blocks(coords.len()), 1, 1),
            shared_mem_bytes: 0,
        };
        unsafe {
            let mut builder = stream.launch_builder(&self.inner.kernels.forward_vector);
            builder.arg(&coords_dev);
            builder.arg(&weights_dev);
            builder.arg(&radii_dev);
            builder.arg(&p.n_atoms);
            builder.arg(&p.origin);
            builder.arg(&p.dim);
            builder.arg(&p.n_types);
            builder.arg(&p.resolution);
            builder.arg(&p.radius_scale);
            builder.arg(&p.grm);
            builder.arg(&p.frm);
            builder.arg(&p.qa);
            builder.arg(&p.qb);
            builder.arg(&p.qc);
            builder.arg(&binary);
            builder.arg(&mut out_dev);
            builder.launch(cfg).map_err(map_driver_err)?;
        }

        let mut host = vec![0.0f32; n_voxels];
        stream
            .memcpy_dtoh(&out_dev, &mut host)
            .map_err(map_driver_err)?;
        Ok(host)
    }

    /// Coordinate gradients for index-typed atoms. Returns a flat
    /// `(n_atoms, 3)` vector.
    pub fn backward_index(
        &self,
        maker: &GridMaker,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_index: &[f32],
        radii: &[f32],
        diff: &[f32],
        n_types: usize,
    ) -> GridResult<Vec<f32>> {
        reject_binary(maker)?;
        check_atom_arrays("backward_index", coords.len(), type_index.len(), radii.len())?;
        let dim = maker.points_per_side();
        check_grid_len("backward_index", diff.len(), n_types * dim * dim * dim)?;
        if coords.is_empty() {
            return Ok(Vec::new());
        }
        let stream = &self.inner.stream;
        let coords_dev = stream
            .clone_htod(&convert_coords(coords))
            .map_err(map_driver_err)?;
        let types_dev = stream.clone_htod(type_index).map_err(map_driver_err)?;
        let radii_dev = stream.clone_htod(radii).map_err(map_driver_err)?;
        let diff_dev = stream.clone_htod(diff).map_err(map_driver_err)?;
        let mut grads_dev = stream
            .alloc_zeros::<f32>(coords.len() * 3)
            .map_err(map_driver_err)?;
        let p = launch_params(maker, grid_center, coords.len(), n_types);

        let cfg = LaunchConfig {
            block_dim: (BLOCK, 1, 1),
            grid_dim: (atom_blocks(coords.len()), 1, 1),
            shared_mem_bytes: 0,
        };
        unsafe {
            let mut builder = stream.launch_builder(&self.inner.kernels.backward_index);
            builder.arg(&coords_dev);
            builder.arg(&types_dev);
            builder.arg(&radii_dev);
            builder.arg(&p.n_atoms);
            builder.arg(&p.origin);
            builder.arg(&p.dim);
            builder.arg(&p.n_types);
            builder.arg(&p.resolution);
            builder.arg(&p.radius_scale);
            builder.arg(&p.grm);
            builder.arg(&p.frm);
            builder.arg(&p.qa);
            builder.arg(&p.qb);
            builder.arg(&diff_dev);
            builder.arg(&mut grads_dev);
            builder.launch(cfg).map_err(map_driver_err)?;
        }

        let mut host = vec![0.0f32; coords.len() * 3];
        stream
            .memcpy_dtoh(&grads_dev, &mut host)
            .map_err(map_driver_err)?;
        Ok(host)
    }

    /// Coordinate and type gradients for vector-typed atoms. Returns flat
    /// `(n_atoms, 3)` and `(n_atoms, num_types)` vectors.
    pub fn backward_vector(
        &self,
        maker: &GridMaker,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_weights: &[f32],
        num_types: usize,
        radii: &[f32],
        diff: &[f32],
    ) -> GridResult<(Vec<f32>, Vec<f32>)> {
        reject_binary(maker)?;
        check_atom_arrays("backward_vector", coords.len(), radii.len(), radii.len())?;
        if type_weights.len() != coords.len() * num_types {
            return Err(GridError::ShapeMismatch(format!(
                "backward_vector weights have {} entries, expected {} x {num_types}",
                type_weights.len(),
                coords.len()
            )));
        }
        let dim = maker.points_per_side();
        check_grid_len("backward_vector", diff.len(), num_types * dim * dim * dim)?;
        if coords.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        let stream = &self.inner.stream;
        let coords_dev = stream
            .clone_htod(&convert_coords(coords))
            .map_err(map_driver_err)?;
        let weights_dev = stream.clone_htod(type_weights).map_err(map_driver_err)?;
        let radii_dev = stream.clone_htod(radii).map_err(map_driver_err)?;
        let diff_dev = stream.clone_htod(diff).map_err(map_driver_err)?;
        let mut grads_dev = stream
            .alloc_zeros::<f32>(coords.len() * 3)
            .map_err(map_driver_err)?;
        let mut type_grads_dev = stream
            .alloc_zeros::<f32>(coords.len() * num_types)
            .map_err(map_driver_err)?;
        let p = launch_params(maker, grid_center, coords.len(), num_types);

        let cfg = LaunchConfig {
            block_dim: (BLOCK, 1, 1),
            grid_dim: (atom_blocks(coords.len()), 1, 1),
            shared_mem_bytes: 0,
        };
        unsafe {
            let mut builder = stream.launch_builder(&self.inner.kernels.backward_vector);
            builder.arg(&coords_dev);
            builder.arg(&weights_dev);
            builder.arg(&radii_dev);
            builder.arg(&p.n_atoms);
            builder.arg(&p.origin);
            builder.arg(&p.dim);
            builder.arg(&p.n_types);
            builder.arg(&p.resolution);
            builder.arg(&p.radius_scale);
            builder.arg(&p.grm);
            builder.arg(&p.frm);
            builder.arg(&p.qa);
            builder.arg(&p.qb);
            builder.arg(&p.qc);
            builder.arg(&diff_dev);
            builder.arg(&mut grads_dev);
            builder.arg(&mut type_grads_dev);
            builder.launch(cfg).map_err(map_driver_err)?;
        }

        let mut grads = vec![0.0f32; coords.len() * 3];
        stream
            .memcpy_dtoh(&grads_dev, &mut grads)
            .map_err(map_driver_err)?;
        let mut type_grads = vec![0.0f32; coords.len() * num_types];
        stream
            .memcpy_dtoh(&type_grads_dev, &mut type_grads)
            .map_err(map_driver_err)?;
        Ok((grads, type_grads))
    }

    /// Per-atom relevance for index-typed atoms.
    #[allow(clippy::too_many_arguments)]
    pub fn backward_relevance(
        &self,
        maker: &GridMaker,
        grid_center: Vec3,
        coords: &[[f32; 3]],
        type_index: &[f32],
        radii: &[f32],
        density: &[f32],
        diff: &[f32],
        n_types: usize,
    ) -> GridResult<Vec<f32>> {
        reject_binary(maker)?;
        check_atom_arrays(
            "backward_relevance",
            coords.len(),
            type_index.len(),
            radii.len(),
        )?;
        let dim = maker.points_per_side();
        let n_voxels = n_types * dim * dim * dim;
        check_grid_len("backward_relevance density", density.len(), n_voxels)?;
        check_grid_len("backward_relevance diff", diff.len(), n_voxels)?;
        if coords.is_empty() {
            return Ok(Vec::new());
        }
        let stream = &self.inner.stream;
        let coords_dev = stream
            .clone_htod(&convert_coords(coords))
            .map_err(map_driver_err)?;
        let types_dev = stream.clone_htod(type_index).map_err(map_driver_err)?;
        let radii_dev = stream.clone_htod(radii).map_err(map_driver_err)?;
        let density_dev = stream.clone_htod(density).map_err(map_driver_err)?;
        let diff_dev = stream.clone_htod(diff).map_err(map_driver_err)?;
        let mut relevance_dev = stream
            .alloc_zeros::<f32>(coords.len())
            .map_err(map_driver_err)?;
        let p = launch_params(maker, grid_center, coords.len(), n_types);

        let cfg = LaunchConfig {
            block_dim: (BLOCK, 1, 1),
            grid_dim: (atom_blocks(coords.len()), 1, 1),
            shared_mem_bytes: 0,
        };
        unsafe {
            let mut builder = stream.launch_builder(&self.inner.kernels.relevance_index);
            builder.arg(&coords_dev);
            builder.arg(&types_dev);
            builder.arg(&radii_dev);
            builder.arg(&p.n_atoms);
            builder.arg(&p.origin);
            builder.arg(&p.dim);
            builder.arg(&p.n_types);
            builder.arg(&p.resolution);
            builder.arg(&p.radius_scale);
            builder.arg(&p.grm);
            builder.arg(&p.frm);
            builder.arg(&p.qa);
            builder.arg(&p.qb);
            builder.arg(&p.qc);
            builder.arg(&density_dev);
            builder.arg(&diff_dev);
            builder.arg(&mut relevance_dev);
            builder.launch(cfg).map_err(map_driver_err)?;
        }

        let mut host = vec![0.0f32; coords.len()];
        stream
            .memcpy_dtoh(&relevance_dev, &mut host)
            .map_err(map_driver_err)?;
        Ok(host)
    }
}
