//! Bind group layouts and the pipeline caches.
//!
//! wgpu bakes vertex input and topology into the pipeline, so the contract's
//! dynamic vertex state becomes a cache keyed on (material variant, vertex
//! layout, topology): the right pipeline is looked up immediately before each
//! draw and created on first sight. All scene pipelines share the rasterizer
//! state (fill, back-face culling, CCW front face), LESS depth testing with
//! writes, and disabled blending.

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::material::MaterialTag;
use crate::mesh::{Topology, VertexLayout};
use crate::render::uniforms::MAX_SHADOWED_SPOTS;

/// Shared bind group layouts: group 0 = frame globals + IBL, group 1 =
/// per-draw model slot (owned by the uniform ring), group 2 = material
/// (per-variant), group 3 = shadow maps.
pub struct SceneBindLayouts {
    pub globals: wgpu::BindGroupLayout,
    pub material_flat: wgpu::BindGroupLayout,
    pub material_lambertian: wgpu::BindGroupLayout,
    pub material_pbr: wgpu::BindGroupLayout,
    pub shadows: wgpu::BindGroupLayout,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn cube_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::Cube,
            multisampled: false,
        },
        count: None,
    }
}

impl SceneBindLayouts {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let globals = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                cube_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                cube_entry(4),
                cube_entry(5),
                texture_entry(6),
            ],
        });

        // Every variant owns a sampler, a normal map, and a displacement map;
        // lambertian adds albedo; PBR adds albedo/roughness/metalness.
        let flat_entries = [
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            texture_entry(1),
            texture_entry(2),
        ];
        let material_flat = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material layout (flat)"),
            entries: &flat_entries,
        });
        let material_lambertian =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("material layout (lambertian)"),
                entries: &[
                    flat_entries[0],
                    flat_entries[1],
                    flat_entries[2],
                    texture_entry(3),
                ],
            });
        let material_pbr = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material layout (pbr)"),
            entries: &[
                flat_entries[0],
                flat_entries[1],
                flat_entries[2],
                texture_entry(3),
                texture_entry(4),
                texture_entry(5),
            ],
        });

        let mut shadow_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
            count: None,
        }];
        for i in 0..MAX_SHADOWED_SPOTS as u32 {
            shadow_entries.push(wgpu::BindGroupLayoutEntry {
                binding: i + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        let shadows = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow layout"),
            entries: &shadow_entries,
        });

        Self {
            globals,
            material_flat,
            material_lambertian,
            material_pbr,
            shadows,
        }
    }

    /// Material layout for a variant.
    #[must_use]
    pub fn material_layout(&self, tag: MaterialTag) -> &wgpu::BindGroupLayout {
        match tag {
            MaterialTag::Simple | MaterialTag::Environment | MaterialTag::Mirror => {
                &self.material_flat
            }
            MaterialTag::Lambertian => &self.material_lambertian,
            MaterialTag::Pbr => &self.material_pbr,
        }
    }
}

// ============================================================================
// Scene pipeline cache
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub tag: MaterialTag,
    pub layout: VertexLayout,
    pub topology: Topology,
}

pub struct PipelineCache {
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
    modules: FxHashMap<MaterialTag, wgpu::ShaderModule>,
    layouts: FxHashMap<MaterialTag, wgpu::PipelineLayout>,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
}

impl PipelineCache {
    #[must_use]
    pub fn new(color_format: wgpu::TextureFormat, depth_format: wgpu::TextureFormat) -> Self {
        Self {
            pipelines: FxHashMap::default(),
            modules: FxHashMap::default(),
            layouts: FxHashMap::default(),
            color_format,
            depth_format,
        }
    }

    /// Shader source for a variant: the shared prelude, the lighting chunk
    /// for lit variants, then the fragment stage.
    fn shader_source(tag: MaterialTag) -> String {
        let common = include_str!("shaders/common.wgsl");
        let lit = include_str!("shaders/lit.wgsl");
        match tag {
            MaterialTag::Simple => format!("{common}\n{}", include_str!("shaders/simple.wgsl")),
            MaterialTag::Environment => {
                format!("{common}\n{}", include_str!("shaders/environment.wgsl"))
            }
            MaterialTag::Mirror => format!("{common}\n{}", include_str!("shaders/mirror.wgsl")),
            MaterialTag::Lambertian => {
                format!("{common}\n{lit}\n{}", include_str!("shaders/lambertian.wgsl"))
            }
            MaterialTag::Pbr => format!("{common}\n{lit}\n{}", include_str!("shaders/pbr.wgsl")),
        }
    }

    /// Already-built pipeline for a key, if any (pass recording).
    #[must_use]
    pub fn cached(&self, key: PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&key)
    }

    /// Looks up (or builds) the pipeline for one material variant and mesh
    /// shape. Called immediately before each draw.
    pub fn get(
        &mut self,
        device: &wgpu::Device,
        binds: &SceneBindLayouts,
        model_layout: &wgpu::BindGroupLayout,
        key: PipelineKey,
    ) -> Result<&wgpu::RenderPipeline> {
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.build(device, binds, model_layout, key)?;
            self.pipelines.insert(key, pipeline);
        }
        Ok(&self.pipelines[&key])
    }

    fn build(
        &mut self,
        device: &wgpu::Device,
        binds: &SceneBindLayouts,
        model_layout: &wgpu::BindGroupLayout,
        key: PipelineKey,
    ) -> Result<wgpu::RenderPipeline> {
        let module = self.modules.entry(key.tag).or_insert_with(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("scene shader {:?}", key.tag)),
                source: wgpu::ShaderSource::Wgsl(Self::shader_source(key.tag).into()),
            })
        });

        let pipeline_layout = self.layouts.entry(key.tag).or_insert_with(|| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("scene pipeline layout {:?}", key.tag)),
                bind_group_layouts: &[
                    &binds.globals,
                    model_layout,
                    binds.material_layout(key.tag),
                    &binds.shadows,
                ],
                push_constant_ranges: &[],
            })
        });

        let attributes = [
            wgpu::VertexAttribute {
                format: key.layout.position.format.to_wgpu(),
                offset: u64::from(key.layout.position.offset),
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: key.layout.normal.format.to_wgpu(),
                offset: u64::from(key.layout.normal.offset),
                shader_location: 1,
            },
            wgpu::VertexAttribute {
                format: key.layout.tangent.format.to_wgpu(),
                offset: u64::from(key.layout.tangent.offset),
                shader_location: 2,
            },
            wgpu::VertexAttribute {
                format: key.layout.texcoord.format.to_wgpu(),
                offset: u64::from(key.layout.texcoord.offset),
                shader_location: 3,
            },
            wgpu::VertexAttribute {
                format: key.layout.color.format.to_wgpu(),
                offset: u64::from(key.layout.color.offset),
                shader_location: 4,
            },
        ];

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("scene pipeline {:?}", key.tag)),
            layout: Some(pipeline_layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: u64::from(key.layout.stride),
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: key.topology.to_wgpu()?,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: self.depth_format,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        Ok(pipeline)
    }
}

// ============================================================================
// Shadow pipeline cache (depth-only)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowPipelineKey {
    pub stride: u32,
    pub position: crate::mesh::VertexAttribute,
    pub topology: Topology,
}

pub struct ShadowPipelineCache {
    pipelines: FxHashMap<ShadowPipelineKey, wgpu::RenderPipeline>,
    module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pub light_layout: wgpu::BindGroupLayout,
    depth_format: wgpu::TextureFormat,
}

impl ShadowPipelineCache {
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        model_layout: &wgpu::BindGroupLayout,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/shadow.wgsl").into()),
        });

        let light_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow light layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(64),
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow pipeline layout"),
            bind_group_layouts: &[&light_layout, model_layout],
            push_constant_ranges: &[],
        });

        Self {
            pipelines: FxHashMap::default(),
            module,
            pipeline_layout,
            light_layout,
            depth_format,
        }
    }

    /// Already-built pipeline for a key, if any (pass recording).
    #[must_use]
    pub fn cached(&self, key: ShadowPipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(&key)
    }

    pub fn get(
        &mut self,
        device: &wgpu::Device,
        key: ShadowPipelineKey,
    ) -> Result<&wgpu::RenderPipeline> {
        if !self.pipelines.contains_key(&key) {
            let attributes = [wgpu::VertexAttribute {
                format: key.position.format.to_wgpu(),
                offset: u64::from(key.position.offset),
                shader_location: 0,
            }];
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("shadow pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.module,
                    entry_point: Some("vs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: u64::from(key.stride),
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                },
                fragment: None,
                primitive: wgpu::PrimitiveState {
                    topology: key.topology.to_wgpu()?,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: self.depth_format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
            self.pipelines.insert(key, pipeline);
        }
        Ok(&self.pipelines[&key])
    }
}
