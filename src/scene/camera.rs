//! Cameras.
//!
//! Every scene carries two synthetic movable cameras ("User-Camera" and
//! "Debug-Camera") in addition to the cameras the document declares; the
//! declared ones follow their node's world transform and cannot be moved by
//! input. View space looks down -Z, so the frustum's near/far planes are the
//! negated near/far distances.

use glam::{Mat4, Vec3};

use crate::cull::FrustumParams;
use crate::math;

/// World up direction for camera motion (the s72 convention is +Z up).
pub const WORLD_UP: Vec3 = Vec3::Z;

/// Rotation step for keyboard camera turns, radians.
const TURN_STEP: f32 = 0.02;
/// Translation step for keyboard camera dollies.
const DOLLY_STEP: f32 = 0.5;

/// Adapts a GL-layout projection to the backend clip space.
///
/// wgpu's NDC is y-up with depth in [0, 1], so the only change is the depth
/// remap; under Vulkan this is where the y flip would live instead.
#[must_use]
pub fn clip_adapt(proj: Mat4) -> Mat4 {
    let depth_remap = Mat4::from_cols(
        glam::Vec4::X,
        glam::Vec4::Y,
        glam::Vec4::new(0.0, 0.0, 0.5, 0.0),
        glam::Vec4::new(0.0, 0.0, 0.5, 1.0),
    );
    depth_remap * proj
}

/// Default synthetic camera parameters (16:9, ~33 degree vfov).
const DEFAULT_ASPECT: f32 = 1.7778;
const DEFAULT_VFOV: f32 = 0.287_167;
const DEFAULT_NEAR: f32 = 0.1;
const DEFAULT_FAR: f32 = 1000.0;

#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,
    pub aspect: f32,
    pub vfov: f32,
    pub near: f32,
    pub far: f32,
    /// Whether keyboard input may move this camera.
    pub movable: bool,

    pub position: Vec3,
    pub direction: Vec3,

    view: Mat4,
    proj: Mat4,
    frustum: FrustumParams,
}

impl Camera {
    /// A synthetic movable camera at (0,-10,0) looking at the origin.
    #[must_use]
    pub fn synthetic(name: &str) -> Self {
        let position = Vec3::new(0.0, -10.0, 0.0);
        let mut cam = Self {
            name: name.to_string(),
            aspect: DEFAULT_ASPECT,
            vfov: DEFAULT_VFOV,
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            movable: true,
            position,
            direction: (Vec3::ZERO - position).normalize(),
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            frustum: FrustumParams::default(),
        };
        cam.refresh();
        cam
    }

    /// A document-declared camera; pose comes from the scene walk.
    #[must_use]
    pub fn declared(name: &str, aspect: f32, vfov: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            name: name.to_string(),
            aspect,
            vfov,
            near,
            far,
            movable: false,
            position: Vec3::ZERO,
            direction: -Vec3::Z,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            frustum: FrustumParams::default(),
        };
        cam.refresh();
        cam
    }

    /// Updates pose from a world transform (scene walk hot path).
    pub fn apply_world(&mut self, world: Mat4) {
        self.position = world.w_axis.truncate();
        self.direction = math::forward_of(world);
        self.refresh();
    }

    /// Recomputes view/projection/frustum from pose and lens parameters.
    pub fn refresh(&mut self) {
        self.view = math::look_at(self.position, self.position + self.direction, WORLD_UP);
        self.proj = self.projection_matrix();

        let tan_half = (self.vfov * 0.5).tan();
        self.frustum = FrustumParams {
            near_right: self.aspect * self.near * tan_half,
            near_top: self.near * tan_half,
            near_plane: -self.near,
            far_plane: -self.far,
        };
    }

    /// Projection matrix for the target clip space.
    ///
    /// This is the single place the kernel's GL-layout matrix is adapted to
    /// the backend's clip conventions; `math::perspective` stays pure.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        clip_adapt(math::perspective(self.vfov, self.aspect, self.near, self.far))
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    #[inline]
    #[must_use]
    pub fn frustum(&self) -> FrustumParams {
        self.frustum
    }

    // ========================================================================
    // Keyboard motion (movable cameras only)
    // ========================================================================

    /// Dolly along the view direction.
    pub fn dolly(&mut self, forward: bool) {
        if !self.movable {
            return;
        }
        let step = if forward { DOLLY_STEP } else { -DOLLY_STEP };
        self.position += self.direction * step;
        self.refresh();
    }

    /// Pitch about the world-right axis.
    pub fn pitch(&mut self, up: bool) {
        if !self.movable {
            return;
        }
        let right = WORLD_UP.cross(self.direction).normalize();
        let step = if up { -TURN_STEP } else { TURN_STEP };
        self.direction = math::rotate_about_axis(self.direction, right, step);
        self.refresh();
    }

    /// Yaw about world up.
    pub fn yaw(&mut self, right: bool) {
        if !self.movable {
            return;
        }
        let step = if right { TURN_STEP } else { -TURN_STEP };
        self.direction = math::rotate_about_axis(self.direction, WORLD_UP, step);
        self.refresh();
    }

    /// Points the camera back at the world origin.
    pub fn refocus(&mut self) {
        if !self.movable {
            return;
        }
        if self.position.length_squared() > 1e-8 {
            self.direction = (-self.position).normalize();
        }
        self.refresh();
    }
}
