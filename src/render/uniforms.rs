//! GPU uniform layouts and the per-frame dynamic uniform ring.

use glam::{Mat4, Vec4};

use crate::scene::{Light, LightKind};

/// Frames that may be in flight at once; the uniform ring holds one slot
/// range per frame.
pub const MAX_IN_FLIGHT: usize = 2;

/// Upper bound on lights uploaded to the shader.
pub const MAX_LIGHTS: usize = 16;

/// Spot shadow maps sampled by the main pass. Lights beyond this still
/// light, just unshadowed.
pub const MAX_SHADOWED_SPOTS: usize = 4;

/// Per-frame globals (bind group 0, binding 0).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniforms {
    pub view: Mat4,
    pub proj: Mat4,
    /// xyz = camera position.
    pub camera_pos: Vec4,
    /// x = light count, y = ggx mip count; z, w unused.
    pub counts: [u32; 4],
}

impl Default for GlobalUniforms {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            camera_pos: Vec4::ZERO,
            counts: [0; 4],
        }
    }
}

/// Light kinds as the shader sees them.
const KIND_SUN: f32 = 0.0;
const KIND_SPHERE: f32 = 1.0;
const KIND_SPOT: f32 = 2.0;

/// One light record in the storage array (bind group 0, binding 1).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuLight {
    /// Spot shadow view-projection; identity otherwise.
    pub view_proj: Mat4,
    /// xyz = world position, w = kind.
    pub position_kind: Vec4,
    /// xyz = world direction, w = shadow slot (< 0 when unshadowed).
    pub direction_shadow: Vec4,
    /// rgb = tint, w = power (sun: strength).
    pub tint_power: Vec4,
    /// Spot/sphere: (radius, limit, fov, blend); sun: (angle, 0, 0, 0).
    pub params: Vec4,
}

impl GpuLight {
    /// Packs a scene light; `shadow_slot` indexes the bound shadow maps.
    #[must_use]
    pub fn pack(light: &Light, shadow_slot: Option<usize>) -> Self {
        let slot = shadow_slot.map_or(-1.0, |s| s as f32);
        let (kind, power, params) = match light.kind {
            LightKind::Sun { angle, strength } => {
                (KIND_SUN, strength, Vec4::new(angle, 0.0, 0.0, 0.0))
            }
            LightKind::Sphere {
                radius,
                power,
                limit,
            } => (KIND_SPHERE, power, Vec4::new(radius, limit, 0.0, 0.0)),
            LightKind::Spot {
                radius,
                power,
                limit,
                fov,
                blend,
            } => (KIND_SPOT, power, Vec4::new(radius, limit, fov, blend)),
        };
        Self {
            view_proj: light.proj * light.view,
            position_kind: light.position.extend(kind),
            direction_shadow: light.direction.extend(slot),
            tint_power: light.tint.extend(power),
            params,
        }
    }
}

/// Per-instance model data, one 256-aligned slot per draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    pub model: Mat4,
}

/// Dynamic uniform ring: `MAX_IN_FLIGHT` frame ranges of instance slots in
/// one buffer, addressed per draw with a dynamic offset.
pub struct UniformRing {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub layout: wgpu::BindGroupLayout,
    stride: u32,
    capacity: usize,
}

impl UniformRing {
    const INITIAL_CAPACITY: usize = 128;

    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let alignment = device
            .limits()
            .min_uniform_buffer_offset_alignment
            .max(size_of::<ModelUniforms>() as u32);
        let stride = alignment.next_power_of_two();

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(size_of::<ModelUniforms>() as u64),
                },
                count: None,
            }],
        });

        let (buffer, bind_group) =
            Self::create_resources(device, &layout, stride, Self::INITIAL_CAPACITY);
        Self {
            buffer,
            bind_group,
            layout,
            stride,
            capacity: Self::INITIAL_CAPACITY,
        }
    }

    fn create_resources(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u32,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let size = (capacity * MAX_IN_FLIGHT) as u64 * u64::from(stride);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("model uniform ring"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("model uniform bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(size_of::<ModelUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Uploads this frame's instance slots; grows the ring when the scene
    /// outgrows it.
    pub fn write_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        frame_index: usize,
        instances: &[ModelUniforms],
    ) {
        if instances.len() > self.capacity {
            let capacity = (self.capacity * 2).max(instances.len());
            log::info!("growing uniform ring: {} -> {capacity} slots", self.capacity);
            let (buffer, bind_group) =
                Self::create_resources(device, &self.layout, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        let base = self.frame_base(frame_index);
        // One write per slot: slots are aligned, the source is packed.
        for (i, instance) in instances.iter().enumerate() {
            queue.write_buffer(
                &self.buffer,
                u64::from(base + i as u32 * self.stride),
                bytemuck::bytes_of(instance),
            );
        }
    }

    /// Byte offset of a frame's slot range.
    #[must_use]
    pub fn frame_base(&self, frame_index: usize) -> u32 {
        (frame_index % MAX_IN_FLIGHT) as u32 * self.capacity as u32 * self.stride
    }

    /// Dynamic offset for one instance slot.
    #[must_use]
    pub fn offset_of(&self, frame_index: usize, instance_index: usize) -> u32 {
        self.frame_base(frame_index) + instance_index as u32 * self.stride
    }
}
