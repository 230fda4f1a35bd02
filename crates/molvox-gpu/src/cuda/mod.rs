use std::sync::Arc;

use cudarc::driver::{
    CudaContext, CudaFunction, CudaModule, CudaStream, DeviceRepr, LaunchConfig, PushKernelArg,
    ValidAsZeroBits,
};
use cudarc::nvrtc::compile_ptx;

use molvox_core::{GridError, GridResult, Vec3};
use molvox_kernels::KERNELS_SRC;

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct Float4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

unsafe impl DeviceRepr for Float4 {}
unsafe impl ValidAsZeroBits for Float4 {}

pub fn convert_coords(coords: &[[f32; 3]]) -> Vec<Float4> {
    coords
        .iter()
        .map(|c| Float4 {
            x: c[0],
            y: c[1],
            z: c[2],
            w: 0.0,
        })
        .collect()
}

fn float4_from(v: Vec3) -> Float4 {
    Float4 {
        x: v.x,
        y: v.y,
        z: v.z,
        w: 0.0,
    }
}

#[derive(Clone)]
pub struct GpuContext {
    inner: Arc<GpuContextInner>,
}

struct GpuContextInner {
    stream: Arc<CudaStream>,
    #[allow(dead_code)]
    module: Arc<CudaModule>,
    kernels: Kernels,
}

struct Kernels {
    forward_index: Arc<CudaFunction>,
    forward_vector: Arc<CudaFunction>,
    backward_index: Arc<CudaFunction>,
    backward_vector: Arc<CudaFunction>,
    relevance_index: Arc<CudaFunction>,
}

impl Kernels {
    fn load(module: &Arc<CudaModule>) -> GridResult<Self> {
        let load = |name: &str| -> GridResult<Arc<CudaFunction>> {
            module
                .load_function(name)
                .map_err(|err| {
                    GridError::Unsupported(format!("cuda kernel load '{name}' failed: {err}"))
                })
                .map(Arc::new)
        };
        Ok(Self {
            forward_index: load("grid_forward_index")?,
            forward_vector: load("grid_forward_vector")?,
            backward_index: load("grid_backward_index")?,
            backward_vector: load("grid_backward_vector")?,
            relevance_index: load("grid_relevance_index")?,
        })
    }
}

mod ops;

fn map_driver_err(err: cudarc::driver::DriverError) -> GridError {
    GridError::Unsupported(format!("cuda driver failure: {err}"))
}

fn map_compile_err(err: cudarc::nvrtc::CompileError) -> GridError {
    GridError::Unsupported(format!("cuda kernel compilation failed: {err}"))
}
