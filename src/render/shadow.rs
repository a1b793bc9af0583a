//! Spot shadow maps.
//!
//! Each shadow-declaring spotlight owns a square depth texture of its
//! declared size. Before the main pass, one depth-only pass per light draws
//! every visible instance with the light's view-projection supplied through a
//! dynamic-offset uniform slot. The main pass then samples the depth images
//! through a comparison sampler; up to [`MAX_SHADOWED_SPOTS`] maps bind at
//! once, the rest go unshadowed.

use glam::Mat4;

use crate::render::context::GpuContext;
use crate::render::uniforms::MAX_SHADOWED_SPOTS;
use crate::scene::Light;

pub struct ShadowMap {
    pub size: u32,
    pub view: wgpu::TextureView,
}

pub struct ShadowMaps {
    pub maps: Vec<ShadowMap>,
    light_buffer: wgpu::Buffer,
    pub light_bind_group: wgpu::BindGroup,
    light_stride: u32,
    light_capacity: u32,
    comparison_sampler: wgpu::Sampler,
    dummy_view: wgpu::TextureView,
    /// Group 3 of the main pass.
    pub scene_bind_group: Option<wgpu::BindGroup>,
}

impl ShadowMaps {
    #[must_use]
    pub fn new(ctx: &GpuContext, light_layout: &wgpu::BindGroupLayout) -> Self {
        let light_stride = ctx
            .device
            .limits()
            .min_uniform_buffer_offset_alignment
            .max(size_of::<Mat4>() as u32);
        let light_capacity = 1;
        let light_buffer = create_light_buffer(ctx, light_stride, light_capacity);
        let light_bind_group = create_light_bind_group(ctx, light_layout, &light_buffer);

        let comparison_sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow comparison sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let dummy_view = create_depth_map(ctx, 1).view;

        Self {
            maps: Vec::new(),
            light_buffer,
            light_bind_group,
            light_stride,
            light_capacity,
            comparison_sampler,
            dummy_view,
            scene_bind_group: None,
        }
    }

    /// Dynamic offset of one light's view-projection slot.
    #[must_use]
    pub fn light_offset(&self, slot: usize) -> u32 {
        slot as u32 * self.light_stride
    }

    /// Rebuilds targets for this frame's shadow lights, uploads their
    /// matrices, and refreshes the main-pass bind group.
    pub fn prepare(
        &mut self,
        ctx: &GpuContext,
        light_layout: &wgpu::BindGroupLayout,
        shadows_layout: &wgpu::BindGroupLayout,
        lights: &[&Light],
    ) {
        // Recreate depth targets only when the shape of the light set changes.
        let shapes_match = self.maps.len() == lights.len()
            && self
                .maps
                .iter()
                .zip(lights)
                .all(|(m, l)| Some(m.size) == l.shadow_size);
        if !shapes_match {
            self.maps = lights
                .iter()
                .map(|l| create_depth_map(ctx, l.shadow_size.unwrap_or(1).max(1)))
                .collect();
            self.scene_bind_group = None;
        }

        if lights.len() as u32 > self.light_capacity {
            self.light_capacity = (self.light_capacity * 2).max(lights.len() as u32);
            self.light_buffer = create_light_buffer(ctx, self.light_stride, self.light_capacity);
            self.light_bind_group = create_light_bind_group(ctx, light_layout, &self.light_buffer);
        }

        for (slot, light) in lights.iter().enumerate() {
            let view_proj = light.proj * light.view;
            ctx.queue.write_buffer(
                &self.light_buffer,
                u64::from(self.light_offset(slot)),
                bytemuck::bytes_of(&view_proj),
            );
        }

        if self.scene_bind_group.is_none() {
            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(&self.comparison_sampler),
            }];
            for i in 0..MAX_SHADOWED_SPOTS {
                let view = self.maps.get(i).map_or(&self.dummy_view, |m| &m.view);
                entries.push(wgpu::BindGroupEntry {
                    binding: (i + 1) as u32,
                    resource: wgpu::BindingResource::TextureView(view),
                });
            }
            self.scene_bind_group = Some(ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("shadow maps bind group"),
                layout: shadows_layout,
                entries: &entries,
            }));
        }
    }

    /// Shadow-map slot for the i-th shadow light, if it fits the budget.
    #[must_use]
    pub fn slot_for(&self, index: usize) -> Option<usize> {
        (index < self.maps.len().min(MAX_SHADOWED_SPOTS)).then_some(index)
    }
}

fn create_depth_map(ctx: &GpuContext, size: u32) -> ShadowMap {
    let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("spot shadow map"),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ctx.depth_format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        aspect: wgpu::TextureAspect::DepthOnly,
        ..Default::default()
    });
    ShadowMap { size, view }
}

fn create_light_buffer(ctx: &GpuContext, stride: u32, capacity: u32) -> wgpu::Buffer {
    ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("shadow light matrices"),
        size: u64::from(stride) * u64::from(capacity),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_light_bind_group(
    ctx: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("shadow light bind group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: wgpu::BufferSize::new(size_of::<Mat4>() as u64),
            }),
        }],
    })
}
