#[cfg(feature = "cuda")]
use molvox_core::AtomTypes;
use molvox_core::{CoordinateSet, GridError, GridMaker, GridResult, Vec3};
use ndarray::{ArrayView4, ArrayViewMut1, ArrayViewMut2, ArrayViewMut4};

#[cfg(feature = "cuda")]
use crate::GpuContext;

/// Where a gridding call executes. The CPU variant runs the host
/// rasterizer; the CUDA variant ships the atom arrays to the device and
/// reads the result back. Both produce the same numbers within single
/// precision tolerance.
#[derive(Clone)]
pub enum Device {
    Cpu,
    #[cfg(feature = "cuda")]
    Cuda(GpuContext),
}

impl Device {
    pub fn cpu() -> Self {
        Device::Cpu
    }

    /// Resolve a device spec: `cpu`, `auto`, `cuda`, or `cuda:N`. `auto`
    /// probes for a usable accelerator and quietly settles for the host.
    pub fn from_spec(spec: &str) -> GridResult<Self> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "auto" => Ok(cuda_device(0).unwrap_or(Device::Cpu)),
            other => match other.strip_prefix("cuda") {
                Some("") => cuda_device(0),
                Some(rest) => {
                    let ordinal = rest
                        .strip_prefix(':')
                        .and_then(|n| n.parse::<usize>().ok())
                        .ok_or_else(|| {
                            GridError::Invalid(format!(
                                "device spec '{other}' needs the form cuda:<ordinal>"
                            ))
                        })?;
                    cuda_device(ordinal)
                }
                None => Err(GridError::Invalid(format!(
                    "device spec '{other}' is none of cpu, auto, or cuda[:N]"
                ))),
            },
        }
    }

    /// Rasterize a coordinate set into `out` on this device.
    pub fn forward(
        &self,
        maker: &GridMaker,
        grid_center: Vec3,
        atoms: &CoordinateSet,
        out: &mut ArrayViewMut4<'_, f32>,
    ) -> GridResult<()> {
        match self {
            Device::Cpu => maker.forward(grid_center, atoms, out),
            #[cfg(feature = "cuda")]
            Device::Cuda(ctx) => {
                check_grid_view(maker, out.shape(), "output grid")?;
                let host = match &atoms.types {
                    AtomTypes::Index(type_index) => ctx.forward_index(
                        maker,
                        grid_center,
                        &atoms.coords,
                        type_index,
                        &atoms.radii,
                        out.shape()[0],
                    )?,
                    AtomTypes::Vector { weights, num_types } => {
                        if out.shape()[0] != *num_types {
                            return Err(GridError::ShapeMismatch(format!(
                                "output grid has {} channels but type vectors have {num_types}",
                                out.shape()[0]
                            )));
                        }
                        ctx.forward_vector(
                            maker,
                            grid_center,
                            &atoms.coords,
                            weights,
                            *num_types,
                            &atoms.radii,
                        )?
                    }
                };
                copy_into(out.iter_mut(), &host)
            }
        }
    }

    /// Coordinate gradients for an index-typed set on this device.
    pub fn backward(
        &self,
        maker: &GridMaker,
        grid_center: Vec3,
        atoms: &CoordinateSet,
        diff: &ArrayView4<'_, f32>,
        atom_gradients: &mut ArrayViewMut2<'_, f32>,
    ) -> GridResult<()> {
        match self {
            Device::Cpu => maker.backward(grid_center, atoms, diff, atom_gradients),
            #[cfg(feature = "cuda")]
            Device::Cuda(ctx) => {
                check_grid_view(maker, diff.shape(), "gradient grid")?;
                let type_index = match &atoms.types {
                    AtomTypes::Index(type_index) => type_index,
                    AtomTypes::Vector { .. } => {
                        return Err(GridError::TypeEncodingMissing(
                            "index types missing from coordinate set".into(),
                        ))
                    }
                };
                let host = ctx.backward_index(
                    maker,
                    grid_center,
                    &atoms.coords,
                    type_index,
                    &atoms.radii,
                    contiguous(diff)?,
                    diff.shape()[0],
                )?;
                copy_into(atom_gradients.iter_mut(), &host)
            }
        }
    }

    /// Coordinate and type gradients for a vector-typed set on this device.
    pub fn backward_with_type_gradients(
        &self,
        maker: &GridMaker,
        grid_center: Vec3,
        atoms: &CoordinateSet,
        diff: &ArrayView4<'_, f32>,
        atom_gradients: &mut ArrayViewMut2<'_, f32>,
        type_gradients: &mut ArrayViewMut2<'_, f32>,
    ) -> GridResult<()> {
        match self {
            Device::Cpu => maker.backward_with_type_gradients(
                grid_center,
                atoms,
                diff,
                atom_gradients,
                type_gradients,
            ),
            #[cfg(feature = "cuda")]
            Device::Cuda(ctx) => {
                check_grid_view(maker, diff.shape(), "gradient grid")?;
                let (weights, num_types) = match &atoms.types {
                    AtomTypes::Vector { weights, num_types } => (weights, *num_types),
                    AtomTypes::Index(_) => {
                        return Err(GridError::TypeEncodingMissing(
                            "vector types missing from coordinate set".into(),
                        ))
                    }
                };
                let (grads, type_grads) = ctx.backward_vector(
                    maker,
                    grid_center,
                    &atoms.coords,
                    weights,
                    num_types,
                    &atoms.radii,
                    contiguous(diff)?,
                )?;
                copy_into(atom_gradients.iter_mut(), &grads)?;
                copy_into(type_gradients.iter_mut(), &type_grads)
            }
        }
    }

    /// Per-atom relevance for an index-typed set on this device.
    pub fn backward_relevance(
        &self,
        maker: &GridMaker,
        grid_center: Vec3,
        atoms: &CoordinateSet,
        density: &ArrayView4<'_, f32>,
        diff: &ArrayView4<'_, f32>,
        relevance: &mut ArrayViewMut1<'_, f32>,
    ) -> GridResult<()> {
        match self {
            Device::Cpu => maker.backward_relevance(grid_center, atoms, density, diff, relevance),
            #[cfg(feature = "cuda")]
            Device::Cuda(ctx) => {
                check_grid_view(maker, density.shape(), "density grid")?;
                check_grid_view(maker, diff.shape(), "relevance grid")?;
                let type_index = match &atoms.types {
                    AtomTypes::Index(type_index) => type_index,
                    AtomTypes::Vector { .. } => {
                        return Err(GridError::TypeEncodingMissing(
                            "index types missing from coordinate set".into(),
                        ))
                    }
                };
                let host = ctx.backward_relevance(
                    maker,
                    grid_center,
                    &atoms.coords,
                    type_index,
                    &atoms.radii,
                    contiguous(density)?,
                    contiguous(diff)?,
                    diff.shape()[0],
                )?;
                copy_into(relevance.iter_mut(), &host)
            }
        }
    }
}

#[cfg(feature = "cuda")]
fn cuda_device(ordinal: usize) -> GridResult<Device> {
    Ok(Device::Cuda(GpuContext::new(ordinal)?))
}

#[cfg(not(feature = "cuda"))]
fn cuda_device(_ordinal: usize) -> GridResult<Device> {
    Err(GridError::Unsupported(
        "built without the cuda feature, so only cpu gridding is available".into(),
    ))
}

#[cfg(feature = "cuda")]
fn check_grid_view(maker: &GridMaker, shape: &[usize], what: &str) -> GridResult<()> {
    let dim = maker.points_per_side();
    if shape[1] != dim || shape[2] != dim || shape[3] != dim {
        return Err(GridError::ShapeMismatch(format!(
            "{what} has spatial extents {}x{}x{}, expected {dim}x{dim}x{dim}",
            shape[1], shape[2], shape[3]
        )));
    }
    Ok(())
}

#[cfg(feature = "cuda")]
fn contiguous<'a>(view: &'a ArrayView4<'_, f32>) -> GridResult<&'a [f32]> {
    view.as_slice().ok_or_else(|| {
        GridError::ShapeMismatch("device path requires a contiguous row-major grid".into())
    })
}

#[cfg(feature = "cuda")]
fn copy_into<'a, I>(dst: I, src: &[f32]) -> GridResult<()>
where
    I: ExactSizeIterator<Item = &'a mut f32>,
{
    if dst.len() != src.len() {
        return Err(GridError::ShapeMismatch(format!(
            "device result has {} elements but the output view holds {}",
            src.len(),
            dst.len()
        )));
    }
    for (d, s) in dst.zip(src) {
        *d = *s;
    }
    Ok(())
}
