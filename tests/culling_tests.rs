//! Frustum culler tests
//!
//! Tests for:
//! - Obvious accept/reject cases around the view volume
//! - Soundness against a brute-force point-in-frustum check: a culled box
//!   must contain no point inside the frustum (no false culls)

use glam::{Mat4, Quat, Vec3};
use helios::cull::{is_culled, FrustumParams};
use helios::mesh::Aabb;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

/// Frustum of the default synthetic camera: 16:9, vfov 0.287167, near 0.1,
/// far 1000.
fn default_frustum() -> FrustumParams {
    let near = 0.1f32;
    let far = 1000.0f32;
    let tan_half = (0.287_167f32 * 0.5).tan();
    FrustumParams {
        near_right: 1.7778 * near * tan_half,
        near_top: near * tan_half,
        near_plane: -near,
        far_plane: -far,
    }
}

fn unit_box() -> Aabb {
    let mut aabb = Aabb::default();
    aabb.extend(Vec3::splat(-0.5));
    aabb.extend(Vec3::splat(0.5));
    aabb
}

/// Brute force: is a view-space point inside the frustum volume?
fn point_inside(frustum: &FrustumParams, p: Vec3) -> bool {
    let depth = -p.z;
    let near = -frustum.near_plane;
    let far = -frustum.far_plane;
    if depth < near || depth > far {
        return false;
    }
    let half_w = frustum.near_right * depth / near;
    let half_h = frustum.near_top * depth / near;
    p.x.abs() <= half_w && p.y.abs() <= half_h
}

/// Dense point samples of a transformed box (corners, edges, interior grid).
fn sample_points(aabb: &Aabb, model_view: Mat4) -> Vec<Vec3> {
    let mut points = Vec::new();
    let steps = 4;
    for ix in 0..=steps {
        for iy in 0..=steps {
            for iz in 0..=steps {
                let t = Vec3::new(
                    ix as f32 / steps as f32,
                    iy as f32 / steps as f32,
                    iz as f32 / steps as f32,
                );
                let local = aabb.min + (aabb.max - aabb.min) * t;
                points.push(model_view.transform_point3(local));
            }
        }
    }
    points
}

// ============================================================================
// Directed cases
// ============================================================================

#[test]
fn box_in_front_is_kept() {
    let frustum = default_frustum();
    let view = Mat4::IDENTITY;
    // Centered 5 units down the view direction (-Z).
    let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
    assert!(!is_culled(&frustum, view, model, &unit_box()));
}

#[test]
fn box_behind_camera_is_culled() {
    let frustum = default_frustum();
    let view = Mat4::IDENTITY;
    let model = Mat4::from_translation(Vec3::new(0.0, 0.0, 10.0));
    assert!(is_culled(&frustum, view, model, &unit_box()));
}

#[test]
fn box_past_far_plane_is_culled() {
    let frustum = default_frustum();
    let view = Mat4::IDENTITY;
    let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -2000.0));
    assert!(is_culled(&frustum, view, model, &unit_box()));
}

#[test]
fn box_far_to_the_side_is_culled() {
    let frustum = default_frustum();
    let view = Mat4::IDENTITY;
    let model = Mat4::from_translation(Vec3::new(500.0, 0.0, -5.0));
    assert!(is_culled(&frustum, view, model, &unit_box()));
}

#[test]
fn box_straddling_near_plane_is_kept() {
    let frustum = default_frustum();
    let view = Mat4::IDENTITY;
    let model = Mat4::from_translation(Vec3::new(0.0, 0.0, -0.1));
    assert!(!is_culled(&frustum, view, model, &unit_box()));
}

#[test]
fn rotated_box_clipping_a_corner_is_kept() {
    let frustum = default_frustum();
    let view = Mat4::IDENTITY;
    let model = Mat4::from_rotation_translation(
        Quat::from_euler(glam::EulerRot::XYZ, 0.7, 0.3, 1.1),
        Vec3::new(0.4, 0.2, -3.0),
    );
    assert!(!is_culled(&frustum, view, model, &unit_box()));
}

// ============================================================================
// Randomized soundness
// ============================================================================

#[test]
fn culled_boxes_contain_no_visible_point() {
    let frustum = default_frustum();
    let view = Mat4::IDENTITY;
    let mut rng = StdRng::seed_from_u64(0x5a17);

    let mut culled_count = 0;
    for _ in 0..2000 {
        let mut aabb = Aabb::default();
        let center = Vec3::new(
            rng.random_range(-30.0..30.0),
            rng.random_range(-30.0..30.0),
            rng.random_range(-60.0..20.0),
        );
        let half = Vec3::new(
            rng.random_range(0.05..4.0),
            rng.random_range(0.05..4.0),
            rng.random_range(0.05..4.0),
        );
        aabb.extend(center - half);
        aabb.extend(center + half);

        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(rng.random_range(0.2..2.5)),
            Quat::from_euler(
                glam::EulerRot::XYZ,
                rng.random_range(0.0..std::f32::consts::TAU),
                rng.random_range(0.0..std::f32::consts::TAU),
                rng.random_range(0.0..std::f32::consts::TAU),
            ),
            Vec3::new(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            ),
        );

        if is_culled(&frustum, view, model, &aabb) {
            culled_count += 1;
            for p in sample_points(&aabb, view * model) {
                assert!(
                    !point_inside(&frustum, p),
                    "culled box contains visible point {p:?}"
                );
            }
        }
    }

    // The distribution should exercise the reject path meaningfully.
    assert!(culled_count > 100, "only {culled_count} boxes culled");
}
