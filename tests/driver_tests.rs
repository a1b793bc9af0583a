//! Animation driver tests
//!
//! Tests for:
//! - Knot exactness for STEP / LINEAR / SLERP (interior keys)
//! - Wrap-around modulo the last key time
//! - SLERP shortest-path selection (negated-operand equivalence)
//! - Driver parsing from document values

use glam::{Quat, Vec3};
use helios::math;
use helios::s72::value;
use helios::scene::driver::{Channel, Driver, Interpolation, Keyframes, Sample};

const EPSILON: f32 = 1e-5;

fn vec3_driver(interpolation: Interpolation, times: Vec<f32>, values: Vec<Vec3>) -> Driver {
    Driver {
        target: 0,
        channel: Channel::Translation,
        interpolation,
        times,
        values: Keyframes::Vec3(values),
    }
}

fn quat_driver(times: Vec<f32>, values: Vec<Quat>) -> Driver {
    Driver {
        target: 0,
        channel: Channel::Rotation,
        interpolation: Interpolation::Slerp,
        times,
        values: Keyframes::Quat(values),
    }
}

fn sample_vec3(driver: &Driver, t: f32) -> Vec3 {
    match driver.sample(t) {
        Sample::Vec3(v) => v,
        Sample::Quat(_) => panic!("expected a Vec3 sample"),
    }
}

fn sample_quat(driver: &Driver, t: f32) -> Quat {
    match driver.sample(t) {
        Sample::Quat(q) => q,
        Sample::Vec3(_) => panic!("expected a Quat sample"),
    }
}

// ============================================================================
// Knot exactness
// ============================================================================

#[test]
fn knots_are_exact_for_every_mode() {
    let times = vec![0.0, 1.0, 2.0, 4.0];
    let values = vec![
        Vec3::ZERO,
        Vec3::new(1.0, 2.0, 3.0),
        Vec3::new(-1.0, 0.5, 0.0),
        Vec3::splat(7.0),
    ];

    for interpolation in [Interpolation::Step, Interpolation::Linear] {
        let driver = vec3_driver(interpolation, times.clone(), values.clone());
        for (i, &t) in times.iter().enumerate().take(times.len() - 1) {
            let got = sample_vec3(&driver, t);
            assert!(
                (got - values[i]).length() < EPSILON,
                "{interpolation:?} at knot {i}: got {got:?}"
            );
        }
    }

    let rotations = vec![
        Quat::IDENTITY,
        Quat::from_rotation_z(1.0),
        Quat::from_rotation_x(0.5),
        Quat::from_rotation_y(2.0),
    ];
    let driver = quat_driver(times.clone(), rotations.clone());
    for (i, &t) in times.iter().enumerate().take(times.len() - 1) {
        let got = sample_quat(&driver, t);
        assert!(got.angle_between(rotations[i]) < 1e-4, "slerp knot {i}");
    }
}

#[test]
fn step_holds_lower_value() {
    let driver = vec3_driver(
        Interpolation::Step,
        vec![0.0, 1.0, 2.0],
        vec![Vec3::ZERO, Vec3::X, Vec3::Y],
    );
    assert!((sample_vec3(&driver, 0.9) - Vec3::ZERO).length() < EPSILON);
    assert!((sample_vec3(&driver, 1.5) - Vec3::X).length() < EPSILON);
}

#[test]
fn linear_midpoint_mixes_componentwise() {
    let driver = vec3_driver(
        Interpolation::Linear,
        vec![0.0, 2.0, 3.0],
        vec![Vec3::ZERO, Vec3::new(2.0, -4.0, 6.0), Vec3::ZERO],
    );
    let got = sample_vec3(&driver, 1.0);
    assert!((got - Vec3::new(1.0, -2.0, 3.0)).length() < EPSILON);
}

// ============================================================================
// Wrap
// ============================================================================

#[test]
fn time_wraps_modulo_last_key() {
    let driver = vec3_driver(
        Interpolation::Linear,
        vec![0.0, 1.0, 2.0],
        vec![Vec3::ZERO, Vec3::X, Vec3::Y],
    );
    let wrapped = sample_vec3(&driver, 2.5);
    let direct = sample_vec3(&driver, 0.5);
    assert!((wrapped - direct).length() < EPSILON);
}

#[test]
fn before_first_key_holds_first_value() {
    let driver = vec3_driver(
        Interpolation::Linear,
        vec![1.0, 2.0],
        vec![Vec3::X, Vec3::Y],
    );
    assert!((sample_vec3(&driver, 0.25) - Vec3::X).length() < EPSILON);
}

// ============================================================================
// SLERP
// ============================================================================

#[test]
fn slerp_midpoint_of_half_turn() {
    // Identity to a 180-degree turn about Z: the midpoint is the 90-degree
    // turn (0, 0, sqrt(1/2), sqrt(1/2)).
    let half_turn = Quat::from_xyzw(0.0, 0.0, 1.0, 0.0);
    let driver = quat_driver(vec![0.0, 1.0], vec![Quat::IDENTITY, half_turn]);

    let mid = sample_quat(&driver, 0.5);
    let expected = Quat::from_xyzw(0.0, 0.0, std::f32::consts::FRAC_1_SQRT_2,
        std::f32::consts::FRAC_1_SQRT_2);
    assert!(mid.angle_between(expected) < 1e-4);

    // The full half turn flips a +X direction to -X.
    let turned = half_turn * glam::Vec3::X;
    assert!((turned - glam::Vec3::new(-1.0, 0.0, 0.0)).length() < EPSILON);
}

#[test]
fn slerp_takes_shortest_path() {
    let a = Quat::from_rotation_y(0.3);
    let b = Quat::from_rotation_y(2.0);

    let direct = math::slerp(a, b, 0.5);
    let negated = math::slerp(a, -b, 0.5);
    // q and -q are the same rotation; both interpolants must agree.
    let delta = (direct.dot(negated).abs() - 1.0).abs();
    assert!(delta < 1e-6, "shortest-path mismatch: {delta}");
}

#[test]
fn slerp_near_parallel_falls_back_to_lerp() {
    let a = Quat::from_rotation_z(0.1);
    let b = Quat::from_rotation_z(0.1000001);
    let mid = math::slerp(a, b, 0.5);
    assert!((mid.length() - 1.0).abs() < EPSILON);
    assert!(mid.angle_between(a) < 1e-4);
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn driver_parses_from_document_value() {
    let v = value::parse(
        r#"{"type":"DRIVER", "node":3, "channel":"rotation",
            "interpolation":"SLERP", "times":[0, 1],
            "values":[0, 0, 0, 1,  0, 0, 1, 0]}"#,
    )
    .unwrap();
    let driver = Driver::from_value(&v).unwrap();
    assert_eq!(driver.target, 3);
    assert_eq!(driver.channel, Channel::Rotation);
    assert_eq!(driver.interpolation, Interpolation::Slerp);
    assert_eq!(driver.times.len(), 2);
}

#[test]
fn driver_rejects_mismatched_lanes() {
    let v = value::parse(
        r#"{"type":"DRIVER", "node":1, "channel":"translation",
            "interpolation":"LINEAR", "times":[0, 1], "values":[1, 2, 3]}"#,
    )
    .unwrap();
    assert!(Driver::from_value(&v).is_err());
}

#[test]
fn driver_rejects_non_increasing_times() {
    let v = value::parse(
        r#"{"type":"DRIVER", "node":1, "channel":"scale",
            "interpolation":"STEP", "times":[0, 0],
            "values":[1, 1, 1,  2, 2, 2]}"#,
    )
    .unwrap();
    assert!(Driver::from_value(&v).is_err());
}
