//! GPU context: instance, adapter, device, queue.

use crate::errors::{HeliosError, Result};

/// Depth formats in preference order; the first one the device supports for
/// depth attachment wins.
const DEPTH_PREFERENCE: [wgpu::TextureFormat; 3] = [
    wgpu::TextureFormat::Depth32Float,
    wgpu::TextureFormat::Depth32FloatStencil8,
    wgpu::TextureFormat::Depth24PlusStencil8,
];

/// Core GPU objects shared by every render path.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub depth_format: wgpu::TextureFormat,
}

impl GpuContext {
    /// Picks an adapter (optionally by name substring), creates the device.
    ///
    /// `surface` makes the choice surface-compatible in windowed mode.
    pub async fn new(device_name: Option<&str>) -> Result<Self> {
        Self::from_instance(wgpu::Instance::default(), device_name, None).await
    }

    /// Like [`GpuContext::new`] but against an instance whose surface already
    /// exists (windowed mode creates the surface first).
    pub async fn from_instance(
        instance: wgpu::Instance,
        device_name: Option<&str>,
        surface: Option<&wgpu::Surface<'static>>,
    ) -> Result<Self> {
        let adapter = match device_name {
            Some(wanted) => {
                let adapters = instance.enumerate_adapters(wgpu::Backends::all());
                let names: Vec<String> =
                    adapters.iter().map(|a| a.get_info().name.clone()).collect();
                adapters
                    .into_iter()
                    .find(|a| a.get_info().name.contains(wanted))
                    .ok_or_else(|| {
                        HeliosError::BackendInit(format!(
                            "no adapter matching '{wanted}'; probed: {names:?}"
                        ))
                    })?
            }
            None => instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: surface,
                    force_fallback_adapter: false,
                })
                .await
                .map_err(|e| HeliosError::BackendInit(format!("no suitable adapter: {e}")))?,
        };

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        let depth_format = choose_depth_format(&device);

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            depth_format,
        })
    }

    /// Blocking wrapper around [`GpuContext::new`].
    pub fn new_blocking(device_name: Option<&str>) -> Result<Self> {
        pollster::block_on(Self::new(device_name))
    }
}

/// First depth format from the preference list the device can attach.
fn choose_depth_format(device: &wgpu::Device) -> wgpu::TextureFormat {
    for format in DEPTH_PREFERENCE {
        let needs_feature = format == wgpu::TextureFormat::Depth32FloatStencil8;
        if !needs_feature || device.features().contains(wgpu::Features::DEPTH32FLOAT_STENCIL8) {
            return format;
        }
    }
    wgpu::TextureFormat::Depth24PlusStencil8
}

/// Creates a depth texture view for a target of the given size.
pub fn create_depth_view(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
