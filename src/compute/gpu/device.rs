//! GPU lattice device - runs the compiled kernel over wgpu storage buffers.

use std::collections::HashMap;
use std::sync::mpsc;

use super::{CompiledProgram, GROUP_EXTENT_OVERRIDE, GpuError, ResolvedDevice};
use crate::compute::{ComputeError, Lattice, LatticeDevice, PartitionDescriptor};

/// Uniform buffer struct for the transition kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct KernelParams {
    side: u32,
    _pad0: u32,
    _pad1: u32,
    _pad2: u32,
}

/// Device-resident lattice.
pub struct GpuBuffer {
    buffer: wgpu::Buffer,
    side: usize,
}

/// Lattice device backed by a wgpu device and queue.
pub struct GpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    info: wgpu::AdapterInfo,
    program: CompiledProgram,

    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,

    // Created on first use, keyed by group extent and side respectively
    pipelines: HashMap<u32, wgpu::ComputePipeline>,
    params_buffers: HashMap<usize, wgpu::Buffer>,
    staging_buffers: HashMap<usize, wgpu::Buffer>,
}

impl GpuDevice {
    pub fn new(resolved: ResolvedDevice, program: CompiledProgram) -> Self {
        let ResolvedDevice {
            info,
            device,
            queue,
        } = resolved;

        let bind_group_layout = create_kernel_bind_group_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Transition Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            ..Default::default()
        });

        Self {
            device,
            queue,
            info,
            program,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            params_buffers: HashMap::new(),
            staging_buffers: HashMap::new(),
        }
    }

    /// Adapter the device was created on.
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }

    fn ensure_pipeline(&mut self, group_extent: u32) -> Result<(), GpuError> {
        if self.pipelines.contains_key(&group_extent) {
            return Ok(());
        }

        let interface = &self.program.interface;
        interface.check_group_extent(group_extent)?;

        let limits = self.device.limits();
        if group_extent > limits.max_compute_workgroup_size_x
            || group_extent > limits.max_compute_workgroup_size_y
            || group_extent * group_extent > limits.max_compute_invocations_per_workgroup
        {
            return Err(GpuError::GroupExtentUnsupported { group_extent });
        }

        let constants: Vec<(&str, f64)> = if interface.group_override {
            vec![(GROUP_EXTENT_OVERRIDE, f64::from(group_extent))]
        } else {
            Vec::new()
        };

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Transition Pipeline"),
                layout: Some(&self.pipeline_layout),
                module: &self.program.module,
                entry_point: Some(interface.entry_point.as_str()),
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
                cache: None,
            });
        log::debug!("Created transition pipeline for group extent {}", group_extent);

        self.pipelines.insert(group_extent, pipeline);
        Ok(())
    }

    fn ensure_params(&mut self, side: usize) {
        if self.params_buffers.contains_key(&side) {
            return;
        }
        let params = KernelParams {
            side: side as u32,
            _pad0: 0,
            _pad1: 0,
            _pad2: 0,
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Kernel Params"),
            size: std::mem::size_of::<KernelParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&buffer, 0, bytemuck::bytes_of(&params));
        self.params_buffers.insert(side, buffer);
    }

    fn ensure_staging(&mut self, side: usize) {
        if self.staging_buffers.contains_key(&side) {
            return;
        }
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Staging Buffer"),
            size: lattice_bytes(side),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.staging_buffers.insert(side, buffer);
    }

    fn check_side(buffer: &GpuBuffer, side: usize) -> Result<(), ComputeError> {
        if buffer.side != side {
            return Err(ComputeError::SideMismatch {
                expected: buffer.side,
                actual: side,
            });
        }
        Ok(())
    }
}

impl LatticeDevice for GpuDevice {
    type Buffer = GpuBuffer;

    fn create_buffer(&mut self, side: usize, label: &str) -> Result<GpuBuffer, ComputeError> {
        let size = lattice_bytes(side);
        check_buffer_size(size, &self.device.limits())?;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        Ok(GpuBuffer { buffer, side })
    }

    fn write_buffer(&mut self, buffer: &GpuBuffer, lattice: &Lattice) -> Result<(), ComputeError> {
        Self::check_side(buffer, lattice.side())?;
        self.queue
            .write_buffer(&buffer.buffer, 0, bytemuck::cast_slice(lattice.cells()));
        Ok(())
    }

    fn dispatch(
        &mut self,
        source: &GpuBuffer,
        destination: &GpuBuffer,
        partition: &PartitionDescriptor,
    ) -> Result<(), ComputeError> {
        let side = source.side;
        Self::check_side(destination, side)?;
        if partition.side as usize != side {
            return Err(ComputeError::PartitionMismatch {
                partition: partition.side,
                store: side,
            });
        }

        self.ensure_pipeline(partition.group_extent)?;
        self.ensure_params(side);
        let pipeline = &self.pipelines[&partition.group_extent];
        let params = &self.params_buffers[&side];

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Transition Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: source.buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: destination.buffer.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Tick Encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Transition Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let groups = partition.workgroups();
            pass.dispatch_workgroups(groups, groups, 1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn synchronize(&mut self) -> Result<(), ComputeError> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(GpuError::from)?;
        Ok(())
    }

    fn read_buffer(&mut self, buffer: &GpuBuffer, side: usize) -> Result<Lattice, ComputeError> {
        Self::check_side(buffer, side)?;
        self.ensure_staging(side);
        let staging = &self.staging_buffers[&side];
        let size = lattice_bytes(side);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(&buffer.buffer, 0, staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(GpuError::from)?;
        rx.recv()
            .map_err(|_| GpuError::MapCallbackDropped)?
            .map_err(GpuError::from)?;

        let cells = {
            let data = buffer_slice.get_mapped_range();
            bytemuck::cast_slice::<u8, u32>(&data).to_vec()
        };
        staging.unmap();

        Lattice::from_cells(side, cells).ok_or(ComputeError::SideMismatch {
            expected: side,
            actual: buffer.side,
        })
    }
}

fn lattice_bytes(side: usize) -> u64 {
    (side as u64) * (side as u64) * std::mem::size_of::<u32>() as u64
}

/// A lattice buffer must fit both the allocation and the storage binding limit.
fn check_buffer_size(bytes: u64, limits: &wgpu::Limits) -> Result<(), GpuError> {
    let limit = limits
        .max_buffer_size
        .min(u64::from(limits.max_storage_buffer_binding_size));
    if bytes > limit {
        return Err(GpuError::BufferTooLarge { bytes, limit });
    }
    Ok(())
}

fn create_kernel_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Transition Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_bytes() {
        assert_eq!(lattice_bytes(24), 24 * 24 * 4);
        assert_eq!(lattice_bytes(6000), 144_000_000);
    }

    #[test]
    fn test_buffer_size_against_default_limits() {
        let limits = wgpu::Limits::default();
        assert!(check_buffer_size(lattice_bytes(4096), &limits).is_ok());
        assert!(matches!(
            check_buffer_size(lattice_bytes(6000), &limits),
            Err(GpuError::BufferTooLarge {
                bytes: 144_000_000,
                ..
            })
        ));
    }

    #[test]
    fn test_buffer_size_uses_smaller_limit() {
        let limits = wgpu::Limits {
            max_buffer_size: 1024,
            ..wgpu::Limits::default()
        };
        assert!(matches!(
            check_buffer_size(lattice_bytes(17), &limits),
            Err(GpuError::BufferTooLarge { limit: 1024, .. })
        ));
        assert!(check_buffer_size(lattice_bytes(16), &limits).is_ok());
    }
}
