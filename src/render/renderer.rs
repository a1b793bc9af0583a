//! Frame orchestration.
//!
//! Owns every GPU-resident scene resource (vertex/index buffers, material
//! bind groups, IBL textures, the uniform ring) and records the frame:
//! visibility refresh, one depth-only pass per shadow light, then the main
//! pass partitioned by material. Works against either target: the surface's
//! swapchain view or the headless color/depth pair. Pipelines are created
//! through caches warmed before recording, keyed on the mesh's vertex layout
//! and topology.

use wgpu::util::DeviceExt as _;

use crate::envmap;
use crate::errors::{HeliosError, Result};
use crate::material::{MaterialId, MaterialKind, MaterialRegistry, MaterialTag, TextureSource};
use crate::mesh::{CullingMode, MeshId, MeshStore};
use crate::render::context::GpuContext;
use crate::render::pipeline::{
    PipelineCache, PipelineKey, SceneBindLayouts, ShadowPipelineCache, ShadowPipelineKey,
};
use crate::render::shadow::ShadowMaps;
use crate::render::texture::{self, GpuTexture, MipmapGenerator};
use crate::render::uniforms::{GlobalUniforms, GpuLight, ModelUniforms, UniformRing, MAX_LIGHTS};
use crate::scene::SceneGraph;

struct MeshGpu {
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
}

struct MaterialGpu {
    tag: MaterialTag,
    bind_group: wgpu::BindGroup,
    // Textures stay alive as long as the bind group references them.
    _textures: Vec<GpuTexture>,
}

struct IblResources {
    env_cube: GpuTexture,
    irradiance_cube: GpuTexture,
    ggx_cube: GpuTexture,
    brdf_lut: GpuTexture,
}

/// Per-draw record assembled once per frame and replayed by both the shadow
/// and main passes.
struct DrawItem {
    mesh: MeshId,
    material: MaterialId,
    /// First instance slot in the uniform ring.
    base_slot: usize,
    instance_count: usize,
}

pub struct Renderer {
    binds: SceneBindLayouts,
    ring: UniformRing,
    pipelines: PipelineCache,
    shadow_pipelines: ShadowPipelineCache,
    shadows: ShadowMaps,

    globals_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,

    mesh_gpu: Vec<MeshGpu>,
    material_gpu: Vec<MaterialGpu>,
    partition: Vec<(MaterialId, Vec<MeshId>)>,
    ggx_mip_count: u32,

    frame_index: usize,
    draws: Vec<DrawItem>,
    model_slots: Vec<ModelUniforms>,
}

impl Renderer {
    /// Builds the renderer and uploads every scene resource.
    pub fn new(
        ctx: &GpuContext,
        color_format: wgpu::TextureFormat,
        graph: &SceneGraph,
        meshes: &MeshStore,
        materials: &MaterialRegistry,
    ) -> Result<Self> {
        let binds = SceneBindLayouts::new(&ctx.device);
        let ring = UniformRing::new(&ctx.device);
        let pipelines = PipelineCache::new(color_format, ctx.depth_format);
        let shadow_pipelines =
            ShadowPipelineCache::new(&ctx.device, &ring.layout, ctx.depth_format);
        let shadows = ShadowMaps::new(ctx, &shadow_pipelines.light_layout);

        let mip_srgb = MipmapGenerator::new(&ctx.device, wgpu::TextureFormat::Rgba8UnormSrgb);
        let mip_linear = MipmapGenerator::new(&ctx.device, wgpu::TextureFormat::Rgba8Unorm);

        let globals_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: size_of::<GlobalUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lights"),
            size: (MAX_LIGHTS * size_of::<GpuLight>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let partition = materials.partition(meshes);
        let ibl = load_ibl(ctx, graph, materials, &mip_linear)?;
        let ggx_mip_count = ibl.ggx_cube.mip_count;

        let env_sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("environment sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let globals_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals bind group"),
            layout: &binds.globals,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lights_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&ibl.env_cube.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&env_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(&ibl.irradiance_cube.view),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(&ibl.ggx_cube.view),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::TextureView(&ibl.brdf_lut.view),
                },
            ],
        });

        let mesh_gpu = upload_meshes(ctx, meshes);
        let material_gpu = upload_materials(ctx, materials, &binds, &mip_srgb, &mip_linear)?;

        Ok(Self {
            binds,
            ring,
            pipelines,
            shadow_pipelines,
            shadows,
            globals_buffer,
            lights_buffer,
            globals_bind_group,
            mesh_gpu,
            material_gpu,
            partition,
            ggx_mip_count,
            frame_index: 0,
            draws: Vec::new(),
            model_slots: Vec::new(),
        })
    }

    /// Records and submits one frame into the given color/depth views.
    pub fn render(
        &mut self,
        ctx: &GpuContext,
        graph: &SceneGraph,
        meshes: &mut MeshStore,
        camera_index: usize,
        culling: CullingMode,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) -> Result<()> {
        let camera = &graph.cameras[camera_index];
        meshes.refresh_visibility(culling, &camera.frustum(), camera.view_matrix());

        // Flatten this frame's draws into uniform-ring slots.
        self.draws.clear();
        self.model_slots.clear();
        for (material, mesh_ids) in &self.partition {
            for &mesh_id in mesh_ids {
                let mesh = meshes.get(mesh_id);
                if mesh.visible.is_empty() {
                    continue;
                }
                self.draws.push(DrawItem {
                    mesh: mesh_id,
                    material: *material,
                    base_slot: self.model_slots.len(),
                    instance_count: mesh.visible.len(),
                });
                self.model_slots
                    .extend(mesh.visible.iter().map(|&model| ModelUniforms { model }));
            }
        }
        self.ring
            .write_frame(&ctx.device, &ctx.queue, self.frame_index, &self.model_slots);

        // Shadow targets and the light array.
        let shadow_lights: Vec<_> = graph.shadow_lights().map(|(_, l)| l).collect();
        self.shadows.prepare(
            ctx,
            &self.shadow_pipelines.light_layout,
            &self.binds.shadows,
            &shadow_lights,
        );

        let mut gpu_lights = Vec::with_capacity(graph.lights.len().min(MAX_LIGHTS));
        let mut shadow_index = 0usize;
        for light in &graph.lights {
            if gpu_lights.len() == MAX_LIGHTS {
                break;
            }
            let slot = if light.casts_shadow() {
                let slot = self.shadows.slot_for(shadow_index);
                shadow_index += 1;
                slot
            } else {
                None
            };
            gpu_lights.push(GpuLight::pack(light, slot));
        }
        if !gpu_lights.is_empty() {
            ctx.queue
                .write_buffer(&self.lights_buffer, 0, bytemuck::cast_slice(&gpu_lights));
        }

        let globals = GlobalUniforms {
            view: camera.view_matrix(),
            proj: camera.projection_matrix(),
            camera_pos: camera.position.extend(1.0),
            counts: [gpu_lights.len() as u32, self.ggx_mip_count.max(1), 0, 0],
        };
        ctx.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));

        // Warm the pipeline caches; the passes below only look up.
        self.warm_pipelines(ctx, meshes)?;

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame"),
            });
        self.record_shadow_passes(meshes, &mut encoder);
        self.record_main_pass(meshes, &mut encoder, color_view, depth_view)?;

        ctx.queue.submit(Some(encoder.finish()));
        self.frame_index = self.frame_index.wrapping_add(1);
        Ok(())
    }

    fn warm_pipelines(&mut self, ctx: &GpuContext, meshes: &MeshStore) -> Result<()> {
        for draw in &self.draws {
            let mesh = meshes.get(draw.mesh);
            let key = PipelineKey {
                tag: self.material_gpu[draw.material].tag,
                layout: mesh.layout,
                topology: mesh.topology,
            };
            self.pipelines
                .get(&ctx.device, &self.binds, &self.ring.layout, key)?;

            if !self.shadows.maps.is_empty() {
                let shadow_key = ShadowPipelineKey {
                    stride: mesh.layout.stride,
                    position: mesh.layout.position,
                    topology: mesh.topology,
                };
                self.shadow_pipelines.get(&ctx.device, shadow_key)?;
            }
        }
        Ok(())
    }

    /// One depth-only pass per shadow light over every visible instance.
    fn record_shadow_passes(&self, meshes: &MeshStore, encoder: &mut wgpu::CommandEncoder) {
        for slot in 0..self.shadows.maps.len() {
            if self.shadows.slot_for(slot).is_none() {
                break;
            }
            let light_offset = self.shadows.light_offset(slot);
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadows.maps[slot].view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &self.draws {
                let mesh = meshes.get(draw.mesh);
                let key = ShadowPipelineKey {
                    stride: mesh.layout.stride,
                    position: mesh.layout.position,
                    topology: mesh.topology,
                };
                let Some(pipeline) = self.shadow_pipelines.cached(key) else {
                    continue; // unsupported topology; skipped by the warm pass
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.shadows.light_bind_group, &[light_offset]);
                pass.set_vertex_buffer(0, self.mesh_gpu[draw.mesh].vertex_buffer.slice(..));
                if let Some(index_buffer) = &self.mesh_gpu[draw.mesh].index_buffer {
                    pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                }
                for i in 0..draw.instance_count {
                    let offset = self.ring.offset_of(self.frame_index, draw.base_slot + i);
                    pass.set_bind_group(1, &self.ring.bind_group, &[offset]);
                    if mesh.indices.is_some() {
                        pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                    } else {
                        pass.draw(0..mesh.count, 0..1);
                    }
                }
            }
        }
    }

    /// The main color pass, partitioned by material.
    fn record_main_pass(
        &self,
        meshes: &MeshStore,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
    ) -> Result<()> {
        let shadow_bind_group = self
            .shadows
            .scene_bind_group
            .as_ref()
            .ok_or_else(|| HeliosError::BackendInit("shadow bind group missing".into()))?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.globals_bind_group, &[]);
        pass.set_bind_group(3, shadow_bind_group, &[]);

        for draw in &self.draws {
            let mesh = meshes.get(draw.mesh);
            let material = &self.material_gpu[draw.material];
            let key = PipelineKey {
                tag: material.tag,
                layout: mesh.layout,
                topology: mesh.topology,
            };
            let Some(pipeline) = self.pipelines.cached(key) else {
                continue;
            };
            pass.set_pipeline(pipeline);
            pass.set_bind_group(2, &material.bind_group, &[]);
            pass.set_vertex_buffer(0, self.mesh_gpu[draw.mesh].vertex_buffer.slice(..));
            if let Some(index_buffer) = &self.mesh_gpu[draw.mesh].index_buffer {
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            }
            for i in 0..draw.instance_count {
                let offset = self.ring.offset_of(self.frame_index, draw.base_slot + i);
                pass.set_bind_group(1, &self.ring.bind_group, &[offset]);
                if mesh.indices.is_some() {
                    pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                } else {
                    pass.draw(0..mesh.count, 0..1);
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Scene upload
// ============================================================================

fn upload_meshes(ctx: &GpuContext, meshes: &MeshStore) -> Vec<MeshGpu> {
    meshes
        .meshes()
        .iter()
        .map(|mesh| {
            let vertex_buffer = ctx
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("vertices '{}'", mesh.name)),
                    contents: &mesh.blob,
                    usage: wgpu::BufferUsages::VERTEX,
                });
            let index_buffer = mesh.indices.as_ref().map(|indices| {
                ctx.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("indices '{}'", mesh.name)),
                        contents: indices,
                        usage: wgpu::BufferUsages::INDEX,
                    })
            });
            MeshGpu {
                vertex_buffer,
                index_buffer,
            }
        })
        .collect()
}

fn upload_materials(
    ctx: &GpuContext,
    materials: &MaterialRegistry,
    binds: &SceneBindLayouts,
    mip_srgb: &MipmapGenerator,
    mip_linear: &MipmapGenerator,
) -> Result<Vec<MaterialGpu>> {
    let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("material sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    materials
        .materials()
        .iter()
        .map(|material| {
            let tag = material.kind.tag();
            let mut textures = Vec::new();

            // Binding 1: normal map; binding 2: displacement (flat default).
            textures.push(texture::upload_source(
                ctx,
                mip_linear,
                &material.normal_map,
                false,
                "normal map",
            )?);
            let displacement = material
                .displacement_map
                .clone()
                .unwrap_or(TextureSource::Solid([0.0, 0.0, 0.0, 1.0]));
            textures.push(texture::upload_source(
                ctx,
                mip_linear,
                &displacement,
                false,
                "displacement map",
            )?);

            match &material.kind {
                MaterialKind::Lambertian { albedo } => {
                    textures.push(texture::upload_source(ctx, mip_srgb, albedo, true, "albedo")?);
                }
                MaterialKind::Pbr {
                    albedo,
                    roughness,
                    metalness,
                } => {
                    textures.push(texture::upload_source(ctx, mip_srgb, albedo, true, "albedo")?);
                    textures.push(texture::upload_source(
                        ctx, mip_linear, roughness, false, "roughness",
                    )?);
                    textures.push(texture::upload_source(
                        ctx, mip_linear, metalness, false, "metalness",
                    )?);
                }
                _ => {}
            }

            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(&sampler),
            }];
            for (i, tex) in textures.iter().enumerate() {
                entries.push(wgpu::BindGroupEntry {
                    binding: (i + 1) as u32,
                    resource: wgpu::BindingResource::TextureView(&tex.view),
                });
            }

            let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("material '{}'", material.name)),
                layout: binds.material_layout(tag),
                entries: &entries,
            });

            Ok(MaterialGpu {
                tag,
                bind_group,
                _textures: textures,
            })
        })
        .collect()
}

/// Loads the IBL texture set: the environment strip plus whatever
/// pre-integrated maps the scene's materials require. Anything unused binds
/// a 1x1 dummy.
fn load_ibl(
    ctx: &GpuContext,
    graph: &SceneGraph,
    materials: &MaterialRegistry,
    mip_linear: &MipmapGenerator,
) -> Result<IblResources> {
    let tags: Vec<MaterialTag> = materials.materials().iter().map(|m| m.kind.tag()).collect();
    let needs_env = tags
        .iter()
        .any(|t| matches!(t, MaterialTag::Environment | MaterialTag::Mirror));
    let needs_irradiance = tags
        .iter()
        .any(|t| matches!(t, MaterialTag::Lambertian | MaterialTag::Pbr));
    let needs_ggx = tags.contains(&MaterialTag::Pbr);

    let env_src = graph.environment_src.as_deref();

    let env_cube = match (env_src, needs_env) {
        (Some(src), _) => texture::load_cube(ctx, src, "environment cube")?,
        (None, true) => {
            return Err(HeliosError::AssetShape(
                "materials sample the environment but the scene declares none".into(),
            ));
        }
        (None, false) => texture::dummy_cube(ctx, "environment cube (dummy)"),
    };

    let irradiance_cube = match (env_src, needs_irradiance) {
        (Some(src), true) => {
            texture::load_cube(ctx, &envmap::lambertian_output(src), "irradiance cube")?
        }
        _ => texture::dummy_cube(ctx, "irradiance cube (dummy)"),
    };

    let (ggx_cube, brdf_lut) = if let (Some(src), true) = (env_src, needs_ggx) {
        let tiers: Vec<_> = (0..envmap::ggx::ROUGHNESS_TIERS)
            .map(|t| envmap::ggx_output(src, t))
            .collect();
        let ggx = texture::load_ggx_stack(ctx, &tiers)?;
        let brdf_path = envmap::brdf_output(src);
        let img = image::open(&brdf_path)
            .map_err(|e| HeliosError::Image(format!("{}: {e}", brdf_path.display())))?
            .into_rgba8();
        let lut = texture::upload_rgba8(
            ctx,
            mip_linear,
            img.as_raw(),
            img.width(),
            img.height(),
            false,
            "brdf lut",
        );
        (ggx, lut)
    } else {
        let lut =
            texture::upload_rgba8(ctx, mip_linear, &[0, 0, 0, 255], 1, 1, false, "brdf lut");
        (texture::dummy_cube(ctx, "ggx cube (dummy)"), lut)
    };

    Ok(IblResources {
        env_cube,
        irradiance_cube,
        ggx_cube,
        brdf_lut,
    })
}
