//! Math kernel extensions over glam.
//!
//! glam supplies the value types (`Vec3`, `Mat4`, `Quat`); this module adds
//! the handful of operations whose exact conventions the renderer depends on:
//! a GL-layout perspective matrix (adaptation to the backend clip space
//! happens in exactly one place, `scene::camera::clip_adapt`, never here),
//! a look-at builder, shortest-arc SLERP with a LERP fallback near zero
//! angle, and Rodrigues rotation about an arbitrary axis.
//!
//! Every function here is pure.

use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

/// Threshold above which SLERP degenerates to LERP: sin(theta) is too close
/// to zero for the spherical weights to be stable.
const SLERP_LERP_THRESHOLD: f32 = 0.9995;

/// Perspective projection with an OpenGL-layout clip volume.
///
/// `vfov` is the full vertical field of view in radians. View space looks
/// down -Z. No Y flip is applied here.
#[must_use]
pub fn perspective(vfov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let top = (vfov * 0.5).tan() * near;
    let right = aspect * top;

    Mat4::from_cols(
        Vec4::new(near / right, 0.0, 0.0, 0.0),
        Vec4::new(0.0, near / top, 0.0, 0.0),
        Vec4::new(0.0, 0.0, -(far + near) / (far - near), -1.0),
        Vec4::new(0.0, 0.0, -2.0 * far * near / (far - near), 0.0),
    )
}

/// Right-handed look-at view matrix.
///
/// forward = normalize(target - eye); right = normalize(forward x up);
/// up' = right x forward.
#[must_use]
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    let forward = (target - eye).normalize();
    let right = forward.cross(up).normalize();
    let up = right.cross(forward);

    Mat4::from_cols(
        Vec4::new(right.x, up.x, -forward.x, 0.0),
        Vec4::new(right.y, up.y, -forward.y, 0.0),
        Vec4::new(right.z, up.z, -forward.z, 0.0),
        Vec4::new(-right.dot(eye), -up.dot(eye), forward.dot(eye), 1.0),
    )
}

/// Spherical linear interpolation choosing the shorter great-circle arc.
///
/// When the inner product is negative the second operand is negated so the
/// interpolation never takes the long way around. When the operands are
/// nearly parallel (|dot| > 0.9995) the result falls back to a normalized
/// LERP; sin(theta) is numerically useless there.
#[must_use]
pub fn slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let mut dot = a.dot(b);
    let b = if dot < 0.0 {
        dot = -dot;
        -b
    } else {
        b
    };

    if dot > SLERP_LERP_THRESHOLD {
        return a.lerp(b, t).normalize();
    }

    let theta = dot.clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();
    let wa = ((1.0 - t) * theta).sin() / sin_theta;
    let wb = (t * theta).sin() / sin_theta;
    Quat::from_xyzw(
        a.x * wa + b.x * wb,
        a.y * wa + b.y * wb,
        a.z * wa + b.z * wb,
        a.w * wa + b.w * wb,
    )
    .normalize()
}

/// Componentwise linear interpolation for vectors.
#[must_use]
pub fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a * (1.0 - t) + b * t
}

/// Rotates `v` about the unit `axis` by `radians` (Rodrigues rotation
/// matrix, then applied).
#[must_use]
pub fn rotate_about_axis(v: Vec3, axis: Vec3, radians: f32) -> Vec3 {
    let c = radians.cos();
    let s = radians.sin();
    let omc = 1.0 - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);

    let m = Mat3::from_cols(
        Vec3::new(c + omc * x * x, omc * x * y + s * z, omc * x * z - s * y),
        Vec3::new(omc * x * y - s * z, c + omc * y * y, omc * y * z + s * x),
        Vec3::new(omc * x * z + s * y, omc * y * z - s * x, c + omc * z * z),
    );
    m * v
}

/// Forward direction (-Z) of a world transform, normalized.
///
/// Falls back to -Z when the matrix column is degenerate.
#[must_use]
pub fn forward_of(world: Mat4) -> Vec3 {
    let f = -world.z_axis.truncate();
    if f.length_squared() > 1e-12 {
        f.normalize()
    } else {
        -Vec3::Z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_places_eye_at_origin() {
        let eye = Vec3::new(3.0, 4.0, 5.0);
        let view = look_at(eye, Vec3::ZERO, Vec3::Z);
        let transformed = view * eye.extend(1.0);
        assert!(transformed.truncate().length() < 1e-5);
    }

    #[test]
    fn slerp_midpoint_is_unit() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_z(std::f32::consts::PI * 0.9);
        let mid = slerp(a, b, 0.5);
        assert!((mid.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn rodrigues_quarter_turn() {
        let v = rotate_about_axis(Vec3::X, Vec3::Z, std::f32::consts::FRAC_PI_2);
        assert!((v - Vec3::Y).length() < 1e-5);
    }
}
