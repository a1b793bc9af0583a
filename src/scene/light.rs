//! Lights.

use glam::{Mat4, Vec3};

use crate::errors::{HeliosError, Result};
use crate::math;
use crate::s72::{self, Value};
use crate::scene::camera::WORLD_UP;

/// Smallest usable emitter radius; the document may declare zero.
const MIN_RADIUS: f32 = 0.01;

/// Light emitter shape and parameters.
#[derive(Debug, Clone, Copy)]
pub enum LightKind {
    Sun { angle: f32, strength: f32 },
    Sphere { radius: f32, power: f32, limit: f32 },
    Spot {
        radius: f32,
        power: f32,
        limit: f32,
        fov: f32,
        blend: f32,
    },
}

#[derive(Debug, Clone)]
pub struct Light {
    pub name: String,
    pub tint: Vec3,
    pub kind: LightKind,
    /// Declared square shadow-map size; only spots cast shadows here.
    pub shadow_size: Option<u32>,

    pub position: Vec3,
    pub direction: Vec3,
    /// View/projection for the shadow pass; identity for non-spots.
    pub view: Mat4,
    pub proj: Mat4,
}

impl Light {
    /// Builds a light from a `LIGHT` document element.
    pub fn from_value(value: &Value) -> Result<Self> {
        let name = s72::require_str(value, "name", "LIGHT")?.to_string();
        let tint = s72::number_vec3(s72::require_array(value, "tint", "LIGHT")?, "tint")?;
        let shadow_size = value
            .get("shadow")
            .and_then(Value::as_number)
            .map(|s| s as u32);

        let kind = if let Some(sun) = value.get("sun") {
            LightKind::Sun {
                angle: s72::require_number(sun, "angle", "sun light")?,
                strength: s72::require_number(sun, "strength", "sun light")?,
            }
        } else if let Some(sphere) = value.get("sphere") {
            LightKind::Sphere {
                radius: s72::require_number(sphere, "radius", "sphere light")?.max(MIN_RADIUS),
                power: s72::require_number(sphere, "power", "sphere light")?,
                limit: s72::require_number(sphere, "limit", "sphere light")?,
            }
        } else if let Some(spot) = value.get("spot") {
            LightKind::Spot {
                radius: s72::require_number(spot, "radius", "spot light")?.max(MIN_RADIUS),
                power: s72::require_number(spot, "power", "spot light")?,
                limit: s72::require_number(spot, "limit", "spot light")?,
                fov: s72::require_number(spot, "fov", "spot light")?,
                blend: s72::require_number(spot, "blend", "spot light")?,
            }
        } else {
            return Err(HeliosError::Format(format!(
                "light '{name}' declares none of sun/sphere/spot"
            )));
        };

        Ok(Self {
            name,
            tint,
            kind,
            shadow_size,
            position: Vec3::ZERO,
            direction: -Vec3::Z,
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
        })
    }

    /// Updates the pose from a world transform; spots also rebuild their
    /// shadow view/projection (near = radius, far = limit, square aspect).
    pub fn apply_world(&mut self, world: Mat4) {
        self.position = world.w_axis.truncate();
        self.direction = math::forward_of(world);

        if let LightKind::Spot { radius, limit, fov, .. } = self.kind {
            self.view = math::look_at(self.position, self.position + self.direction, WORLD_UP);
            self.proj =
                crate::scene::camera::clip_adapt(math::perspective(fov, 1.0, radius, limit));
        } else {
            self.view = Mat4::IDENTITY;
            self.proj = Mat4::IDENTITY;
        }
    }

    /// Whether this light gets a shadow pass.
    #[must_use]
    pub fn casts_shadow(&self) -> bool {
        matches!(self.kind, LightKind::Spot { .. }) && self.shadow_size.is_some()
    }
}
