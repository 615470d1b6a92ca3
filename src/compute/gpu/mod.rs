//! GPU Compute Backend
//!
//! Resolves a WebGPU (wgpu) device, compiles the external WGSL transition
//! kernel and runs the double-buffered lattice on it.

mod adapter;
mod device;
mod program;

pub use adapter::{ResolvedDevice, resolve_device};
pub use device::{GpuBuffer, GpuDevice};
pub use program::{
    CompiledProgram, DEFAULT_ENTRY_POINT, GROUP_EXTENT_OVERRIDE, KernelInterface,
    compile_kernel_source, read_kernel_source,
};

use std::path::PathBuf;

use crate::compute::ComputeError;

/// Error type for GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU or fallback adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("Couldn't read kernel file {}: {source}", path.display())]
    KernelRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Kernel file {} is not valid UTF-8", path.display())]
    KernelEncoding { path: PathBuf },

    #[error("Kernel failed to compile:\n{log}")]
    Compile { log: String },

    #[error("Kernel has no compute entry point named `{name}`")]
    MissingEntryPoint { name: String },

    #[error("Kernel does not declare binding @group(0) @binding({binding})")]
    MissingBinding { binding: u32 },

    #[error(
        "Kernel workgroup size {declared:?} does not match group extent {group_extent} \
         and has no `GROUP_EXTENT` override"
    )]
    GroupExtentMismatch {
        declared: [u32; 3],
        group_extent: u32,
    },

    #[error("Group extent {group_extent} exceeds device workgroup limits")]
    GroupExtentUnsupported { group_extent: u32 },

    #[error("Lattice needs {bytes} bytes per buffer but the device allows {limit}")]
    BufferTooLarge { bytes: u64, limit: u64 },

    #[error("Buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("Buffer mapping callback was dropped")]
    MapCallbackDropped,

    #[error("Device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),
}

impl From<GpuError> for ComputeError {
    fn from(err: GpuError) -> Self {
        ComputeError::Device(Box::new(err))
    }
}
