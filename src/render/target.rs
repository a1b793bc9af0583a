//! Render targets: presentable surface or off-screen color/depth pair.

use std::io::Write as _;
use std::path::Path;

use crate::errors::{HeliosError, Result};
use crate::render::context::{create_depth_view, GpuContext};

/// Color format for headless rendering (readback-friendly).
pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

// ============================================================================
// Windowed surface
// ============================================================================

pub struct SurfaceTarget {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    pub depth_view: wgpu::TextureView,
}

impl SurfaceTarget {
    /// Configures the surface: SRGB BGRA when offered (first offered format
    /// otherwise), Mailbox presentation when offered (FIFO otherwise).
    pub fn new(
        ctx: &GpuContext,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let caps = surface.get_capabilities(&ctx.adapter);
        if caps.formats.is_empty() {
            return Err(HeliosError::BackendInit(
                "surface reports no supported formats".into(),
            ));
        }
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| *f == wgpu::TextureFormat::Bgra8UnormSrgb)
            .unwrap_or(caps.formats[0]);
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Mailbox) {
            wgpu::PresentMode::Mailbox
        } else {
            wgpu::PresentMode::Fifo
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            desired_maximum_frame_latency: 2,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&ctx.device, &config);

        let depth_view =
            create_depth_view(&ctx.device, ctx.depth_format, config.width, config.height);

        Ok(Self {
            surface,
            config,
            depth_view,
        })
    }

    pub fn resize(&mut self, ctx: &GpuContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return; // minimized; the app blocks rendering until non-zero
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&ctx.device, &self.config);
        self.depth_view = create_depth_view(&ctx.device, ctx.depth_format, width, height);
    }

    /// Acquires the next image, recreating the swapchain on loss.
    /// `None` means skip this frame.
    pub fn acquire(&mut self, ctx: &GpuContext) -> Option<wgpu::SurfaceTexture> {
        match self.surface.get_current_texture() {
            Ok(frame) => Some(frame),
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::debug!("surface lost; reconfiguring");
                self.surface.configure(&ctx.device, &self.config);
                self.surface.get_current_texture().ok()
            }
            Err(wgpu::SurfaceError::Timeout) => None,
            Err(e) => {
                log::error!("surface error: {e}");
                None
            }
        }
    }
}

// ============================================================================
// Headless target
// ============================================================================

pub struct HeadlessTarget {
    pub width: u32,
    pub height: u32,
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    readback: wgpu::Buffer,
    padded_bytes_per_row: u32,
}

impl HeadlessTarget {
    pub fn new(ctx: &GpuContext, width: u32, height: u32) -> Self {
        let color = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("headless color"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HEADLESS_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = create_depth_view(&ctx.device, ctx.depth_format, width, height);

        let padded_bytes_per_row =
            (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("headless readback"),
            size: u64::from(padded_bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            width,
            height,
            color,
            color_view,
            depth_view,
            readback,
            padded_bytes_per_row,
        }
    }

    /// Reads the color target back to host memory as tightly packed RGBA8,
    /// row-major top-down.
    pub fn read_rgba(&self, ctx: &GpuContext) -> Result<Vec<u8>> {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(Some(encoder.finish()));

        let slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = ctx.device.poll(wgpu::PollType::Wait);
        rx.recv()
            .map_err(|_| HeliosError::BackendInit("readback mapping dropped".into()))?
            .map_err(|e| HeliosError::BackendInit(format!("readback map failed: {e:?}")))?;

        let data = slice.get_mapped_range();
        let mut out = Vec::with_capacity((self.width * self.height * 4) as usize);
        for row in 0..self.height {
            let start = (row * self.padded_bytes_per_row) as usize;
            out.extend_from_slice(&data[start..start + (self.width * 4) as usize]);
        }
        drop(data);
        self.readback.unmap();
        Ok(out)
    }
}

/// Writes tightly packed RGBA8 pixels as a binary PPM (P6, maxval 255).
pub fn write_ppm(path: &Path, width: u32, height: u32, rgba: &[u8]) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|e| HeliosError::io(path, e))?;
    let mut out = std::io::BufWriter::new(file);
    write!(out, "P6\n{width} {height}\n255\n").map_err(|e| HeliosError::io(path, e))?;
    for px in rgba.chunks_exact(4) {
        out.write_all(&px[..3]).map_err(|e| HeliosError::io(path, e))?;
    }
    out.flush().map_err(|e| HeliosError::io(path, e))
}
