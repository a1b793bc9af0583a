#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! helios: a real-time renderer for s72 scenes with an offline
//! environment-map pre-integrator.
//!
//! The renderer parses a hierarchical scene document plus binary vertex
//! payloads, drives a wgpu rasterization pipeline with per-frame culling and
//! spot shadow passes, and runs interactively, headless (deterministic frame
//! dumps from an event script), or in performance-measurement mode. The
//! pre-integrator turns an RGBE cube strip into the Lambertian irradiance
//! and GGX split-sum lookup tables the PBR materials sample.

pub mod app;
pub mod cull;
pub mod envmap;
pub mod errors;
pub mod events;
pub mod material;
pub mod math;
pub mod mesh;
pub mod render;
pub mod s72;
pub mod scene;

pub use app::{SceneRuntime, ViewerConfig};
pub use errors::{HeliosError, Result};
pub use material::{Material, MaterialRegistry, MaterialTag};
pub use mesh::{Aabb, CullingMode, Mesh, MeshStore, Topology, VertexFormat};
pub use scene::{Camera, Driver, Light, PlaybackClock, SceneGraph, Transform};
