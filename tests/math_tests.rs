//! Math kernel tests
//!
//! Tests for:
//! - Transform composition against a reference matrix product
//! - Perspective matrix structure (GL layout, no flip in the kernel)
//! - Look-at basis construction
//! - Rodrigues rotation vs quaternion rotation

use glam::{Mat4, Quat, Vec3, Vec4};
use helios::math;
use helios::scene::Transform;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

const EPSILON: f32 = 1e-5;

fn mat4_close(a: Mat4, b: Mat4) -> bool {
    (0..4).all(|c| (a.col(c) - b.col(c)).abs().max_element() < EPSILON)
}

// ============================================================================
// Transform composition
// ============================================================================

#[test]
fn chain_composition_matches_reference_product() {
    let mut rng = StdRng::seed_from_u64(0xfeed);
    for _ in 0..200 {
        let chain: Vec<Transform> = (0..5)
            .map(|_| {
                Transform::new(
                    Vec3::new(
                        rng.random_range(-5.0..5.0),
                        rng.random_range(-5.0..5.0),
                        rng.random_range(-5.0..5.0),
                    ),
                    Quat::from_euler(
                        glam::EulerRot::XYZ,
                        rng.random_range(0.0..std::f32::consts::TAU),
                        rng.random_range(0.0..std::f32::consts::TAU),
                        rng.random_range(0.0..std::f32::consts::TAU),
                    ),
                    Vec3::new(
                        rng.random_range(0.2..3.0),
                        rng.random_range(0.2..3.0),
                        rng.random_range(0.2..3.0),
                    ),
                )
            })
            .collect();

        // world = parent * local, applied root to leaf.
        let mut world = Mat4::IDENTITY;
        for t in &chain {
            world *= t.local_matrix();
        }

        let reference = chain.iter().fold(Mat4::IDENTITY, |acc, t| {
            acc * Mat4::from_translation(t.translation)
                * Mat4::from_quat(t.rotation)
                * Mat4::from_scale(t.scale)
        });

        assert!(mat4_close(world, reference));
    }
}

#[test]
fn local_matrix_is_trs_order() {
    // Scale applies innermost: a unit X point scales, rotates, translates.
    let t = Transform::new(
        Vec3::new(10.0, 0.0, 0.0),
        Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        Vec3::splat(2.0),
    );
    let p = t.local_matrix().transform_point3(Vec3::X);
    assert!((p - Vec3::new(10.0, 2.0, 0.0)).length() < EPSILON);
}

// ============================================================================
// Perspective
// ============================================================================

#[test]
fn perspective_has_gl_layout() {
    let vfov = 0.6f32;
    let near = 0.5;
    let far = 100.0;
    let proj = math::perspective(vfov, 2.0, near, far);

    // Column 2 carries the depth mapping and the -1 w term.
    assert!((proj.z_axis.w - -1.0).abs() < EPSILON);
    assert!((proj.z_axis.z - -(far + near) / (far - near)).abs() < EPSILON);
    assert!((proj.w_axis.z - -2.0 * far * near / (far - near)).abs() < EPSILON);

    // A point on the near plane maps to z/w = -1, far plane to +1.
    let near_clip = proj * Vec4::new(0.0, 0.0, -near, 1.0);
    assert!((near_clip.z / near_clip.w - -1.0).abs() < 1e-4);
    let far_clip = proj * Vec4::new(0.0, 0.0, -far, 1.0);
    assert!((far_clip.z / far_clip.w - 1.0).abs() < 1e-4);

    // The vertical scale follows the field of view; no flip in the kernel.
    assert!((proj.y_axis.y - 1.0 / (vfov * 0.5).tan()).abs() < 1e-4);
    assert!(proj.y_axis.y > 0.0);
}

// ============================================================================
// Look-at
// ============================================================================

#[test]
fn look_at_builds_orthonormal_basis() {
    let view = math::look_at(Vec3::new(2.0, -3.0, 5.0), Vec3::ZERO, Vec3::Z);

    // The rotation part has orthonormal rows.
    let r0 = Vec3::new(view.x_axis.x, view.y_axis.x, view.z_axis.x);
    let r1 = Vec3::new(view.x_axis.y, view.y_axis.y, view.z_axis.y);
    let r2 = Vec3::new(view.x_axis.z, view.y_axis.z, view.z_axis.z);
    assert!((r0.length() - 1.0).abs() < EPSILON);
    assert!((r1.length() - 1.0).abs() < EPSILON);
    assert!((r2.length() - 1.0).abs() < EPSILON);
    assert!(r0.dot(r1).abs() < EPSILON);
    assert!(r0.dot(r2).abs() < EPSILON);
    assert!(r1.dot(r2).abs() < EPSILON);
}

#[test]
fn look_at_target_is_on_negative_z() {
    let eye = Vec3::new(1.0, 2.0, 3.0);
    let target = Vec3::new(-4.0, 0.0, 1.0);
    let view = math::look_at(eye, target, Vec3::Z);

    let t = view.transform_point3(target);
    assert!(t.x.abs() < 1e-4 && t.y.abs() < 1e-4);
    assert!(t.z < 0.0, "target should sit down -Z, got {t:?}");
}

// ============================================================================
// Axis rotation
// ============================================================================

#[test]
fn rodrigues_matches_quaternion_rotation() {
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..200 {
        let axis = Vec3::new(
            rng.random_range(-1.0..1.0f32),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        )
        .try_normalize()
        .unwrap_or(Vec3::Z);
        let angle = rng.random_range(-std::f32::consts::PI..std::f32::consts::PI);
        let v = Vec3::new(
            rng.random_range(-3.0..3.0),
            rng.random_range(-3.0..3.0),
            rng.random_range(-3.0..3.0),
        );

        let rotated = math::rotate_about_axis(v, axis, angle);
        let reference = Quat::from_axis_angle(axis, angle) * v;
        assert!((rotated - reference).length() < 1e-4);
    }
}
