//! Accelerator path for the grid maker: CUDA rasterization kernels behind
//! the `cuda` feature, plus the `Device` dispatch between the host and
//! accelerator implementations.

#[cfg(feature = "cuda")]
mod cuda;

#[cfg(feature = "cuda")]
pub use cuda::*;

mod device;

pub use device::Device;

#[cfg(not(feature = "cuda"))]
use molvox_core::{GridError, GridResult};

#[cfg(not(feature = "cuda"))]
pub struct GpuContext;

#[cfg(not(feature = "cuda"))]
impl GpuContext {
    pub fn new(_device: usize) -> GridResult<Self> {
        Err(GridError::Unsupported(
            "built without the cuda feature, so no device context can be created".into(),
        ))
    }
}
