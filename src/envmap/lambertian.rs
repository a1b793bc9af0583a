//! Lambertian irradiance pre-integration.
//!
//! For every output texel, draw cosine-weighted hemisphere directions around
//! the texel normal, average the cube lookups, and add the bright-direction
//! list under the cosine kernel. The six faces integrate concurrently, one
//! worker per face, each writing its own slab.

use glam::Vec3;
use rand::RngExt;

use crate::envmap::bright::{self, BrightDirection};
use crate::envmap::cubemap::{texel_direction, CubeMap, Face};

/// Orthonormal tangent frame around `n`.
///
/// The helper up vector is +Z unless the normal is nearly parallel to it.
pub(crate) fn tangent_frame(n: Vec3) -> (Vec3, Vec3) {
    let up = if n.z.abs() < 0.99 { Vec3::Z } else { Vec3::X };
    let tx = n.cross(up).normalize();
    let ty = n.cross(tx);
    (tx, ty)
}

/// Cosine-weighted hemisphere direction in tangent space from two uniform
/// variates: phi = 2 pi u1, r = sqrt(u2).
#[must_use]
pub fn cosine_sample(u1: f32, u2: f32) -> Vec3 {
    let phi = 2.0 * std::f32::consts::PI * u1;
    let r = u2.sqrt();
    Vec3::new(phi.cos() * r, phi.sin() * r, (1.0 - u2).sqrt())
}

/// Integrates the irradiance cube.
///
/// `cube` must already have its bright texels extracted into `brights`.
#[must_use]
pub fn bake(cube: &CubeMap, brights: &[BrightDirection], n_samples: u32, out_size: u32) -> CubeMap {
    let slabs = std::thread::scope(|scope| {
        let handles = Face::ALL
            .map(|face| scope.spawn(move || bake_face(cube, brights, n_samples, out_size, face)));
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
    face: Face,
) -> Vec<Vec3> {
    log::info!("lambertian: sampling face {face:?}");
    let mut rng = rand::rng();
    let mut slab = vec![Vec3::ZERO; (out_size * out_size) as usize];

    for v in 0..out_size {
        for u in 0..out_size {
            let n = texel_direction(face, u, v, out_size, out_size);
            let (tx, ty) = tangent_frame(n);

            let mut acc = Vec3::ZERO;
            for _ in 0..n_samples {
                let local = cosine_sample(rng.random::<f32>(), rng.random::<f32>());
                let world = tx * local.x + ty * local.y + n * local.z;
                acc += cube.sample(world);
            }
            acc /= n_samples as f32;
            acc += bright::sum_cosine(brights, n);
            slab[(v * out_size + u) as usize] = acc;
        }
    }
    slab
}
