//! GGX specular pre-filter and split-sum BRDF table.
//!
//! The specular half of the split-sum approximation: ten roughness tiers
//! (roughness = tier / 10) of the environment filtered through the GGX
//! distribution with Hammersley-sequenced importance sampling, plus a 10x10
//! (roughness, N.V) table of the BRDF's scale/bias terms under Smith-Schlick
//! masking. Faces integrate concurrently within a tier, one worker per face.

use glam::Vec3;

use crate::envmap::bright::{self, BrightDirection};
use crate::envmap::cubemap::{texel_direction, CubeMap, Face};
use crate::envmap::lambertian::tangent_frame;

/// Number of roughness tiers (tier / 10 in [0.0, 1.0)).
pub const ROUGHNESS_TIERS: u32 = 10;

/// Side length of the split-sum BRDF table.
pub const BRDF_TABLE_SIZE: usize = 10;

// ============================================================================
// Low-discrepancy sequence
// ============================================================================

/// Van der Corput radical inverse, base 2 (bit reversal).
#[must_use]
pub fn radical_inverse_vdc(mut bits: u32) -> f32 {
    bits = bits.rotate_left(16);
    bits = ((bits & 0x5555_5555) << 1) | ((bits & 0xaaaa_aaaa) >> 1);
    bits = ((bits & 0x3333_3333) << 2) | ((bits & 0xcccc_cccc) >> 2);
    bits = ((bits & 0x0f0f_0f0f) << 4) | ((bits & 0xf0f0_f0f0) >> 4);
    bits = ((bits & 0x00ff_00ff) << 8) | ((bits & 0xff00_ff00) >> 8);
    bits as f32 * 2.328_306_4e-10 // / 2^32
}

/// i-th Hammersley point of an N-point set.
#[must_use]
pub fn hammersley(i: u32, n: u32) -> (f32, f32) {
    (i as f32 / n as f32, radical_inverse_vdc(i))
}

/// GGX half-vector importance sample in tangent space.
#[must_use]
pub fn ggx_sample(xi: (f32, f32), roughness: f32) -> Vec3 {
    let a = roughness * roughness;
    let phi = 2.0 * std::f32::consts::PI * xi.0;
    let cos_theta = ((1.0 - xi.1) / (1.0 + (a * a - 1.0) * xi.1)).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

// ============================================================================
// Pre-filter
// ============================================================================

/// Filters one roughness tier of the environment.
#[must_use]
pub fn bake_tier(
    cube: &CubeMap,
    brights: &[BrightDirection],
    n_samples: u32,
    out_size: u32,
    roughness: f32,
) -> CubeMap {
    let slabs = std::thread::scope(|scope| {
        let handles = Face::ALL.map(|face| {
            scope.spawn(move || bake_face(cube, brights, n_samples, out_size, roughness, face))
        });
        handles.map(|h| h.join().expect("face worker panicked"))
    });

    let mut out = CubeMap::new(out_size);
    for (face, slab) in Face::ALL.into_iter().zip(slabs) {
        out.set_face(face, slab);
    }
    out
}

fn bake_face(
    cube: &CubeMap,
    brights: &[BrightDirection],
    n_samples: u32,
    out_size: u32,
    roughness: f32,
    face: Face,
) -> Vec<Vec3> {
    log::info!("ggx: sampling face {face:?} at roughness {roughness}");
    let mut slab = vec![Vec3::ZERO; (out_size * out_size) as usize];

    for v in 0..out_size {
        for u in 0..out_size {
            let n = texel_direction(face, u, v, out_size, out_size);
            let (tx, ty) = tangent_frame(n);
            let view = n;

            let mut acc = Vec3::ZERO;
            let mut total_weight = 0.0f32;
            for i in 0..n_samples {
                let xi = hammersley(i, n_samples);
                let local = ggx_sample(xi, roughness);
                let half = (tx * local.x + ty * local.y + n * local.z).normalize();
                let light = (half * 2.0 * view.dot(half) - view).normalize();

                let n_dot_l = n.dot(light).clamp(0.0, 1.0);
                if n_dot_l > 0.0 {
                    acc += cube.sample(half) * n_dot_l;
                    total_weight += n_dot_l;
                }
            }
            if total_weight > 0.0 {
                acc /= total_weight;
            }
            acc += bright::sum_gated(brights, n);
            slab[(v * out_size + u) as usize] = acc;
        }
    }
    slab
}

// ============================================================================
// Split-sum BRDF table
// ============================================================================

/// The 10x10 (roughness, N.V) integration table; each cell is (A, B, 0).
pub struct BrdfTable {
    pub cells: [[Vec3; BRDF_TABLE_SIZE]; BRDF_TABLE_SIZE],
}

impl Default for BrdfTable {
    fn default() -> Self {
        Self {
            cells: [[Vec3::ZERO; BRDF_TABLE_SIZE]; BRDF_TABLE_SIZE],
        }
    }
}

/// Smith-Schlick masking for one direction: x / (x (1-k) + k), k = a^2 / 2.
fn geometry_schlick(x: f32, roughness: f32) -> f32 {
    let k = roughness * roughness / 2.0;
    x / (x * (1.0 - k) + k)
}

fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    geometry_schlick(n_dot_v.max(0.0), roughness) * geometry_schlick(n_dot_l.max(0.0), roughness)
}

/// Integrates one table cell: the (scale, bias) pair of the split-sum BRDF
/// term for a roughness and viewing angle.
#[must_use]
pub fn integrate_brdf_cell(roughness: f32, n_dot_v: f32, n_samples: u32) -> (f32, f32) {
    let view = Vec3::new((1.0 - n_dot_v * n_dot_v).max(0.0).sqrt(), 0.0, n_dot_v);
    let n = Vec3::Z;
    let (tx, ty) = tangent_frame(n);

    let mut a = 0.0f32;
    let mut b = 0.0f32;
    for i in 0..n_samples {
        let xi = hammersley(i, n_samples);
        let local = ggx_sample(xi, roughness);
        let half = (tx * local.x + ty * local.y + n * local.z).normalize();
        let light = half * 2.0 * view.dot(half) - view;

        let n_dot_l = light.z.clamp(0.0, 1.0);
        let n_dot_h = half.z.clamp(0.0, 1.0);
        let v_dot_h = view.dot(half).clamp(0.0, 1.0);

        if n_dot_l > 0.0 {
            let g = geometry_smith(n_dot_v, n_dot_l, roughness);
            let g_vis = g * v_dot_h / (n_dot_h * n_dot_v.max(1e-5));
            let fc = (1.0 - v_dot_h).powi(5);
            a += (1.0 - fc) * g_vis;
            b += fc * g_vis;
        }
    }
    (a / n_samples as f32, b / n_samples as f32)
}

/// Fills the whole table: row = roughness tier, column = N.V tier.
#[must_use]
pub fn bake_brdf_table(n_samples: u32) -> BrdfTable {
    let mut table = BrdfTable::default();
    for (row, cells) in table.cells.iter_mut().enumerate() {
        let roughness = row as f32 / ROUGHNESS_TIERS as f32;
        for (col, cell) in cells.iter_mut().enumerate() {
            let n_dot_v = col as f32 / BRDF_TABLE_SIZE as f32;
            let (a, b) = integrate_brdf_cell(roughness, n_dot_v, n_samples);
            *cell = Vec3::new(a, b, 0.0);
        }
    }
    table
}

impl BrdfTable {
    /// Writes the table as a 10x10 3-channel PNG.
    pub fn save_png(&self, path: &std::path::Path) -> crate::errors::Result<()> {
        let size = BRDF_TABLE_SIZE as u32;
        let mut img = image::RgbImage::new(size, size);
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                let px = [
                    (cell.x * 255.0) as u8,
                    (cell.y * 255.0) as u8,
                    (cell.z * 255.0) as u8,
                ];
                img.put_pixel(col as u32, row as u32, image::Rgb(px));
            }
        }
        img.save(path)
            .map_err(|e| crate::errors::HeliosError::Image(format!("{}: {e}", path.display())))
    }
}
