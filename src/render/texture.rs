//! Texture upload and mip generation.
//!
//! Material textures upload as RGBA8 (sRGB for color data) and get their mip
//! pyramid from a render-pass blit chain with a linear sampler. Cube maps
//! upload as RGBA16F holding decoded linear radiance; the GGX stack packs its
//! ten roughness tiers into the mip levels of one cube texture.

use std::path::Path;

use glam::Vec3;
use half::f16;

use crate::envmap::CubeMap;
use crate::errors::{HeliosError, Result};
use crate::material::{self, TextureSource};
use crate::render::context::GpuContext;

/// A GPU texture plus its default view.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub mip_count: u32,
}

// ============================================================================
// Mip blit chain
// ============================================================================

/// Generates mip pyramids by blitting each level into the next with a
/// linear-filtering sampler.
pub struct MipmapGenerator {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    format: wgpu::TextureFormat,
}

impl MipmapGenerator {
    #[must_use]
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("mip blit"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("mip blit layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mip blit pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("mip blit pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("mip blit sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            pipeline,
            layout,
            sampler,
            format,
        }
    }

    /// Fills levels 1.. of `texture` from level 0.
    pub fn generate(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
        mip_count: u32,
    ) {
        debug_assert_eq!(texture.format(), self.format);
        for level in 1..mip_count {
            let src_view = texture.create_view(&wgpu::TextureViewDescriptor {
                base_mip_level: level - 1,
                mip_level_count: Some(1),
                ..Default::default()
            });
            let dst_view = texture.create_view(&wgpu::TextureViewDescriptor {
                base_mip_level: level,
                mip_level_count: Some(1),
                ..Default::default()
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("mip blit bind group"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&src_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("mip blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &dst_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

// ============================================================================
// 2D uploads
// ============================================================================

/// Uploads RGBA8 pixels and builds the full mip pyramid.
pub fn upload_rgba8(
    ctx: &GpuContext,
    mips: &MipmapGenerator,
    pixels: &[u8],
    width: u32,
    height: u32,
    srgb: bool,
    label: &str,
) -> GpuTexture {
    let format = if srgb {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    };
    let mip_count = material::mip_count(width, height);

    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: mip_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );

    if mip_count > 1 && mips.format == format {
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("mip generation"),
            });
        mips.generate(&ctx.device, &mut encoder, &texture, mip_count);
        ctx.queue.submit(Some(encoder.finish()));
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        mip_count,
    }
}

/// Materializes a material texture source: PNG from disk or a 1x1 solid.
pub fn upload_source(
    ctx: &GpuContext,
    mips: &MipmapGenerator,
    source: &TextureSource,
    srgb: bool,
    label: &str,
) -> Result<GpuTexture> {
    match source {
        TextureSource::Solid(rgba) => {
            let px: [u8; 4] = std::array::from_fn(|i| (rgba[i].clamp(0.0, 1.0) * 255.0) as u8);
            Ok(upload_rgba8(ctx, mips, &px, 1, 1, srgb, label))
        }
        TextureSource::Png(path) => {
            let img = image::open(path)
                .map_err(|e| HeliosError::Image(format!("{}: {e}", path.display())))?
                .into_rgba8();
            Ok(upload_rgba8(
                ctx,
                mips,
                img.as_raw(),
                img.width(),
                img.height(),
                srgb,
                label,
            ))
        }
    }
}

// ============================================================================
// Cube uploads (linear radiance, RGBA16F)
// ============================================================================

/// Converts RGB32F radiance to RGBA16F bytes for GPU upload.
fn face_to_f16(texels: impl Iterator<Item = Vec3>) -> Vec<u8> {
    let mut out = Vec::new();
    for t in texels {
        for c in [t.x, t.y, t.z, 1.0] {
            out.extend_from_slice(&f16::from_f32(c).to_bits().to_le_bytes());
        }
    }
    out
}

fn create_cube_texture(
    ctx: &GpuContext,
    size: u32,
    mip_count: u32,
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        },
        mip_level_count: mip_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: Some(wgpu::TextureViewDimension::Cube),
        ..Default::default()
    });
    (texture, view)
}

fn write_cube_level(ctx: &GpuContext, texture: &wgpu::Texture, cube: &CubeMap, level: u32) {
    let size = cube.width;
    for (layer, face) in crate::envmap::Face::ALL.into_iter().enumerate() {
        let texels = (0..size)
            .flat_map(|v| (0..size).map(move |u| (u, v)))
            .map(|(u, v)| cube.get(face, u, v));
        let bytes = face_to_f16(texels);
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: level,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size * 8),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// Box-filters a cube to a smaller square size (mip packing).
fn downsample_cube(cube: &CubeMap, size: u32) -> CubeMap {
    let mut out = CubeMap::new(size);
    let scale = cube.width / size.max(1);
    for face in crate::envmap::Face::ALL {
        for v in 0..size {
            for u in 0..size {
                let mut acc = Vec3::ZERO;
                for dv in 0..scale {
                    for du in 0..scale {
                        acc += cube.get(face, u * scale + du, v * scale + dv);
                    }
                }
                out.set(face, u, v, acc / (scale * scale) as f32);
            }
        }
    }
    out
}

/// Uploads a single-level radiance cube.
pub fn upload_cube(ctx: &GpuContext, cube: &CubeMap, label: &str) -> GpuTexture {
    let (texture, view) = create_cube_texture(ctx, cube.width, 1, label);
    write_cube_level(ctx, &texture, cube, 0);
    GpuTexture {
        texture,
        view,
        mip_count: 1,
    }
}

/// Loads an RGBE strip from disk and uploads it.
pub fn load_cube(ctx: &GpuContext, path: &Path, label: &str) -> Result<GpuTexture> {
    let cube = CubeMap::load_png(path)?;
    Ok(upload_cube(ctx, &cube, label))
}

/// Loads the ten GGX roughness tiers into the mip chain of one cube texture.
/// Tier i lands in mip i, downsampled to the level's size when the baked
/// tier is larger.
pub fn load_ggx_stack(ctx: &GpuContext, tier_paths: &[std::path::PathBuf]) -> Result<GpuTexture> {
    if tier_paths.is_empty() {
        return Err(HeliosError::AssetShape("empty GGX tier list".into()));
    }
    let base = CubeMap::load_png(&tier_paths[0])?;
    let base_size = base.width;
    let mip_count = (tier_paths.len() as u32).min(material::mip_count(base_size, base_size));

    let (texture, view) = create_cube_texture(ctx, base_size, mip_count, "ggx stack");
    write_cube_level(ctx, &texture, &base, 0);

    for (level, path) in tier_paths.iter().enumerate().take(mip_count as usize).skip(1) {
        let tier = CubeMap::load_png(path)?;
        let wanted = (base_size >> level).max(1);
        let tier = if tier.width == wanted {
            tier
        } else {
            downsample_cube(&tier, wanted)
        };
        write_cube_level(ctx, &texture, &tier, level as u32);
    }

    Ok(GpuTexture {
        texture,
        view,
        mip_count,
    })
}

/// A 1x1 black cube for scenes without an environment.
pub fn dummy_cube(ctx: &GpuContext, label: &str) -> GpuTexture {
    upload_cube(ctx, &CubeMap::new(1), label)
}
