//! Scene model: node arena, transforms, cameras, lights, drivers, playback.

pub mod camera;
pub mod clock;
pub mod driver;
pub mod graph;
pub mod light;
pub mod transform;

pub use camera::Camera;
pub use clock::{ANIMATION_WRAP_SECONDS, PlaybackClock};
pub use driver::{Channel, Driver, Interpolation, Keyframes, Sample};
pub use graph::{DEBUG_CAMERA, SceneGraph, SceneNode, USER_CAMERA};
pub use light::{Light, LightKind};
pub use transform::Transform;
