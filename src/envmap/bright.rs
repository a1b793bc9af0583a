//! Bright-texel importance list.
//!
//! Monte-Carlo estimation of a cube map with small, very bright features
//! (lamps, the sun) converges poorly. Before sampling, the brightest texels
//! are pulled out into an explicit direction list, each weighted by the
//! uniform solid-angle approximation `4 pi / (6 W H)`, and zeroed in the
//! source so they are not counted twice. The integrators then add the list's
//! contribution analytically.

use glam::Vec3;

use crate::envmap::cubemap::{CubeMap, Face};

/// At most this many texels are promoted to explicit directions.
pub const MAX_BRIGHT_DIRECTIONS: usize = 10_000;

/// GGX only accepts bright directions inside a narrow cone around the lobe.
pub const GGX_BRIGHT_GATE: f32 = 0.995;

#[derive(Debug, Clone, Copy)]
pub struct BrightDirection {
    pub dir: Vec3,
    /// Radiance scaled by the texel's approximate solid angle.
    pub light: Vec3,
}

/// Extracts the brightest texels of `cube` (by max channel) into a direction
/// list, zeroing them in place. The list is sorted brightest-first and built
/// append-only.
#[must_use]
pub fn extract(cube: &mut CubeMap) -> Vec<BrightDirection> {
    let texel_count = (cube.width as usize) * (cube.height as usize) * 6;
    let keep = texel_count.min(MAX_BRIGHT_DIRECTIONS);

    let mut ranked: Vec<(f32, Face, u32, u32)> = Vec::with_capacity(texel_count);
    for face in Face::ALL {
        for v in 0..cube.height {
            for u in 0..cube.width {
                let c = cube.get(face, u, v);
                ranked.push((c.x.max(c.y).max(c.z), face, u, v));
            }
        }
    }
    // Brightest first; ties break on (face, v, u) so the list is
    // deterministic for any input.
    ranked.sort_unstable_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| (a.1 as u8, a.3, a.2).cmp(&(b.1 as u8, b.3, b.2)))
    });

    let solid_angle = 4.0 * std::f32::consts::PI / (6.0 * cube.width as f32 * cube.height as f32);

    let mut out = Vec::with_capacity(keep);
    for &(_, face, u, v) in ranked.iter().take(keep) {
        out.push(BrightDirection {
            dir: cube.direction(face, u, v),
            light: cube.get(face, u, v) * solid_angle,
        });
        cube.set(face, u, v, Vec3::ZERO);
    }
    out
}

/// Cosine-kernel sum of the list for a surface normal (Lambertian).
#[must_use]
pub fn sum_cosine(brights: &[BrightDirection], dir: Vec3) -> Vec3 {
    let mut acc = Vec3::ZERO;
    for bd in brights {
        acc += bd.light * bd.dir.dot(dir).max(0.0);
    }
    acc
}

/// Narrow-cone gated sum for the GGX lobe direction.
#[must_use]
pub fn sum_gated(brights: &[BrightDirection], dir: Vec3) -> Vec3 {
    let mut acc = Vec3::ZERO;
    for bd in brights {
        let align = bd.dir.dot(dir).clamp(0.0, 1.0);
        if align > GGX_BRIGHT_GATE {
            acc += bd.light * align;
        }
    }
    acc
}
