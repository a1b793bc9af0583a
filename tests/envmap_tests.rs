//! Environment pre-integrator tests
//!
//! Tests for:
//! - RGBE encode/decode round trip across the exponent range
//! - Cube texel-direction / projection inverse
//! - Bright-texel extraction (weighting, zeroing, capping)
//! - Lambertian irradiance of a single bright texel
//! - GGX roughness-0 identity and the Hammersley sequence
//! - Split-sum BRDF table edge behavior

use glam::Vec3;
use helios::envmap::bright;
use helios::envmap::cubemap::{texel_direction, CubeMap, Face};
use helios::envmap::ggx;
use helios::envmap::lambertian;
use helios::envmap::rgbe;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

// ============================================================================
// RGBE
// ============================================================================

#[test]
fn rgbe_round_trip_across_exponents() {
    let mut rng = StdRng::seed_from_u64(0xc0de);
    for exp in -30..=126 {
        let max = (exp as f32).exp2();
        let v = Vec3::new(
            max,
            max * rng.random_range(0.0..1.0f32),
            max * rng.random_range(0.0..1.0f32),
        );
        let [r, g, b, e] = rgbe::encode(v);
        let back = rgbe::decode(r, g, b, e);
        // Error bound: half a quantization step of the shared exponent.
        let tolerance = max / 256.0 + 1e-30;
        assert!(
            (back - v).abs().max_element() <= tolerance,
            "exp {exp}: {v:?} -> {back:?}"
        );
    }
}

#[test]
fn rgbe_tiny_values_become_zero() {
    assert_eq!(rgbe::encode(Vec3::splat(1e-33)), [0, 0, 0, 0]);
}

#[test]
fn rgbe_huge_values_clamp_to_white() {
    let encoded = rgbe::encode(Vec3::splat(3e38));
    assert_eq!(encoded, [0xff, 0xff, 0xff, 0xff]);
}

// ============================================================================
// Cube geometry
// ============================================================================

#[test]
fn projection_inverts_texel_direction() {
    let cube = CubeMap::new(16);
    for face in Face::ALL {
        for v in 0..16 {
            for u in 0..16 {
                let dir = cube.direction(face, u, v);
                let (pface, pu, pv) = cube.project(dir);
                assert_eq!(pface, face, "face mismatch at ({u},{v})");
                assert_eq!((pu, pv), (u, v), "texel mismatch on {face:?}");
            }
        }
    }
}

#[test]
fn random_directions_project_within_a_texel() {
    let size = 32u32;
    let cube = CubeMap::new(size);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..5000 {
        let dir = loop {
            let d = Vec3::new(
                rng.random_range(-1.0..1.0f32),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            if d.length_squared() > 1e-3 {
                break d.normalize();
            }
        };
        let (face, u, v) = cube.project(dir);
        let reconstructed = cube.direction(face, u, v);
        let angle = dir.dot(reconstructed).clamp(-1.0, 1.0).acos();
        assert!(
            angle <= 1.5 / size as f32,
            "angular error {angle} for {dir:?}"
        );
    }
}

#[test]
fn face_centers_point_along_axes() {
    // For an odd-sized face the center texel direction is the face axis.
    let size = 15;
    for face in Face::ALL {
        let (_, _, r) = face.frame();
        let center = texel_direction(face, size / 2, size / 2, size, size);
        assert!(center.dot(r) > 0.99, "{face:?} center points at {center:?}");
    }
}

// ============================================================================
// Bright extraction
// ============================================================================

#[test]
fn bright_extraction_zeroes_and_weights() {
    let mut cube = CubeMap::new(2);
    cube.set(Face::Up, 0, 0, Vec3::new(8.0, 0.0, 0.0));
    cube.set(Face::Down, 1, 1, Vec3::new(0.0, 2.0, 0.0));

    let brights = bright::extract(&mut cube);

    // Every texel of a tiny cube is promoted, brightest first.
    assert_eq!(brights.len(), 24);
    let solid_angle = 4.0 * std::f32::consts::PI / 24.0;
    assert!((brights[0].light.x - 8.0 * solid_angle).abs() < 1e-5);
    assert!((brights[1].light.y - 2.0 * solid_angle).abs() < 1e-5);

    // The source texels are zeroed so they are not counted twice.
    assert_eq!(cube.get(Face::Up, 0, 0), Vec3::ZERO);
    assert_eq!(cube.get(Face::Down, 1, 1), Vec3::ZERO);
}

#[test]
fn bright_sums_respect_kernels() {
    let brights = [bright::BrightDirection {
        dir: Vec3::Z,
        light: Vec3::ONE,
    }];

    // Cosine kernel falls off with the angle; negative alignment clips to 0.
    assert!((bright::sum_cosine(&brights, Vec3::Z) - Vec3::ONE).length() < 1e-6);
    assert_eq!(bright::sum_cosine(&brights, -Vec3::Z), Vec3::ZERO);

    // The GGX gate only passes nearly-aligned directions.
    assert!((bright::sum_gated(&brights, Vec3::Z) - Vec3::ONE).length() < 1e-6);
    let off_axis = Vec3::new(0.2, 0.0, 1.0).normalize();
    assert_eq!(bright::sum_gated(&brights, off_axis), Vec3::ZERO);
}

// ============================================================================
// Lambertian
// ============================================================================

#[test]
fn single_bright_texel_gives_cosine_irradiance() {
    // A 2x2 cube whose Up face texel (0,0) holds RGBE (128,0,0,129):
    // decoded R = (128.5 / 256) * 2 ~ 1.0. After bright extraction the cube
    // is black, so the result is the analytic bright-direction sum. At the
    // output texel aligned with the bright direction the cosine is 1 and the
    // R channel is radiance * 4 pi / 24 = pi / 6, within the RGBE step.
    let mut cube = CubeMap::new(2);
    let radiance = rgbe::decode(128, 0, 0, 129);
    cube.set(Face::Up, 0, 0, radiance);

    let brights = bright::extract(&mut cube);
    let out = lambertian::bake(&cube, &brights, 16, 2);

    let got = out.get(Face::Up, 0, 0).x;
    let expected = std::f32::consts::PI / 6.0;
    let relative = (got - expected).abs() / expected;
    assert!(relative < 0.01, "irradiance {got}, expected {expected}");
}

#[test]
fn cosine_samples_lie_in_upper_hemisphere() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..1000 {
        let s = lambertian::cosine_sample(rng.random(), rng.random());
        assert!(s.z >= 0.0);
        assert!((s.length() - 1.0).abs() < 1e-5);
    }
}

// ============================================================================
// GGX
// ============================================================================

#[test]
fn hammersley_is_low_discrepancy() {
    // First coordinate is i/N; second is the bit-reversed radical inverse.
    assert_eq!(ggx::hammersley(0, 8), (0.0, 0.0));
    let (x1, y1) = ggx::hammersley(1, 8);
    assert!((x1 - 0.125).abs() < 1e-6);
    assert!((y1 - 0.5).abs() < 1e-6);
    let (_, y2) = ggx::hammersley(2, 8);
    assert!((y2 - 0.25).abs() < 1e-6);
    let (_, y3) = ggx::hammersley(3, 8);
    assert!((y3 - 0.75).abs() < 1e-6);
}

#[test]
fn ggx_roughness_zero_samples_the_normal() {
    for i in 0..64 {
        let xi = ggx::hammersley(i, 64);
        let h = ggx::ggx_sample(xi, 0.0);
        assert!((h - Vec3::Z).length() < 1e-3, "sample {i} strayed: {h:?}");
    }
}

#[test]
fn ggx_tier_zero_reproduces_the_cube() {
    // With roughness 0 every half-vector is the texel normal, so filtering
    // with an empty bright list is the identity on the cube.
    let mut cube = CubeMap::new(4);
    let mut rng = StdRng::seed_from_u64(3);
    for face in Face::ALL {
        for v in 0..4 {
            for u in 0..4 {
                cube.set(
                    face,
                    u,
                    v,
                    Vec3::new(rng.random(), rng.random(), rng.random()),
                );
            }
        }
    }

    let out = ggx::bake_tier(&cube, &[], 32, 4, 0.0);
    for face in Face::ALL {
        for v in 0..4 {
            for u in 0..4 {
                let diff = (out.get(face, u, v) - cube.get(face, u, v)).abs();
                assert!(
                    diff.max_element() < 1e-4,
                    "tier-0 drift at {face:?} ({u},{v})"
                );
            }
        }
    }
}

// ============================================================================
// BRDF table
// ============================================================================

#[test]
fn brdf_bias_vanishes_at_normal_incidence() {
    for roughness in [0.0, 0.1] {
        let (_, b) = ggx::integrate_brdf_cell(roughness, 1.0, 512);
        assert!(b.abs() < 0.01, "roughness {roughness}: B = {b}");
    }
}

#[test]
fn brdf_scale_is_bounded() {
    for row in 0..10 {
        for col in 1..10 {
            let (a, b) = ggx::integrate_brdf_cell(row as f32 / 10.0, col as f32 / 10.0, 128);
            assert!((0.0..=1.5).contains(&a), "A out of range: {a}");
            assert!((0.0..=1.0).contains(&b), "B out of range: {b}");
        }
    }
}

// ============================================================================
// Strip I/O
// ============================================================================

#[test]
fn cube_png_round_trip() {
    let dir = std::env::temp_dir().join(format!("helios-envmap-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("cube.png");

    let mut cube = CubeMap::new(4);
    let mut rng = StdRng::seed_from_u64(11);
    for face in Face::ALL {
        for v in 0..4 {
            for u in 0..4 {
                cube.set(
                    face,
                    u,
                    v,
                    Vec3::new(
                        rng.random_range(0.0..4.0f32),
                        rng.random_range(0.0..4.0),
                        rng.random_range(0.0..4.0),
                    ),
                );
            }
        }
    }
    cube.save_png(&path).unwrap();

    let back = CubeMap::load_png(&path).unwrap();
    assert_eq!(back.width, 4);
    for face in Face::ALL {
        for v in 0..4 {
            for u in 0..4 {
                let a = cube.get(face, u, v);
                let b = back.get(face, u, v);
                let max = a.max_element().max(1e-6);
                assert!(
                    (a - b).abs().max_element() <= max / 128.0,
                    "{face:?} ({u},{v}): {a:?} vs {b:?}"
                );
            }
        }
    }
}

#[test]
fn strip_with_wrong_shape_is_rejected() {
    let dir = std::env::temp_dir().join(format!("helios-envmap-bad-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("not-a-strip.png");

    image::RgbaImage::new(8, 9).save(&path).unwrap();
    assert!(CubeMap::load_png(&path).is_err());
}
