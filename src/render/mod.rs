//! wgpu rasterization backend.

pub mod context;
pub mod pipeline;
pub mod renderer;
pub mod shadow;
pub mod target;
pub mod texture;
pub mod uniforms;

pub use context::GpuContext;
pub use renderer::Renderer;
pub use target::{write_ppm, HeadlessTarget, SurfaceTarget, HEADLESS_FORMAT};
pub use uniforms::{MAX_IN_FLIGHT, MAX_LIGHTS, MAX_SHADOWED_SPOTS};
