//! Device resolution.

use super::GpuError;

/// A wgpu device and queue plus a description of the adapter behind them.
pub struct ResolvedDevice {
    pub info: wgpu::AdapterInfo,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl ResolvedDevice {
    /// Whether the adapter is a software or CPU implementation.
    pub fn is_fallback(&self) -> bool {
        self.info.device_type == wgpu::DeviceType::Cpu
    }
}

/// Pick a compute device: a high-performance hardware adapter if there is
/// one, otherwise the platform's fallback adapter.
pub async fn resolve_device() -> Result<ResolvedDevice, GpuError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = match request_adapter(&instance, false).await {
        Some(adapter) => adapter,
        None => {
            log::warn!("No hardware adapter found, requesting fallback adapter");
            request_adapter(&instance, true)
                .await
                .ok_or(GpuError::NoAdapter)?
        }
    };

    let info = adapter.get_info();
    let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Lattice Life GPU"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        })
        .await?;

    let resolved = ResolvedDevice {
        info,
        device,
        queue,
    };
    if resolved.is_fallback() {
        log::warn!("Running on CPU adapter {}", resolved.info.name);
    }
    log::info!(
        "Using {:?} adapter {} ({:?})",
        resolved.info.device_type,
        resolved.info.name,
        resolved.info.backend
    );
    Ok(resolved)
}

async fn request_adapter(instance: &wgpu::Instance, fallback: bool) -> Option<wgpu::Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: fallback,
        })
        .await
        .ok()
}
