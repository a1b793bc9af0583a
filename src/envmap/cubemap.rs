//! Cube maps: face frames, texel directions, projection, and RGBE strip I/O.
//!
//! A cube map is six square faces of linear radiance in the fixed order
//! Right, Left, Front, Back, Up, Down. On disk the faces stack vertically in
//! one RGBE-encoded PNG (height = 6 x width). The face frames below must
//! match between the baker and the runtime sampler.

use std::path::Path;

use glam::Vec3;
use image::{ImageBuffer, Rgba};

use crate::envmap::rgbe;
use crate::errors::{HeliosError, Result};

/// Cube face identifiers, in strip order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Right = 0,
    Left = 1,
    Front = 2,
    Back = 3,
    Up = 4,
    Down = 5,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Right,
        Face::Left,
        Face::Front,
        Face::Back,
        Face::Up,
        Face::Down,
    ];

    /// The face frame (s, t, r): s maps to the face's rightward axis, t to
    /// its downward-v axis, r points at the face center.
    #[must_use]
    pub fn frame(self) -> (Vec3, Vec3, Vec3) {
        match self {
            Face::Right => (Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, -1.0, 0.0), Vec3::X),
            Face::Left => (Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, -1.0, 0.0), -Vec3::X),
            Face::Front => (Vec3::X, Vec3::new(0.0, 0.0, 1.0), Vec3::Y),
            Face::Back => (Vec3::X, Vec3::new(0.0, 0.0, -1.0), -Vec3::Y),
            Face::Up => (Vec3::X, Vec3::new(0.0, -1.0, 0.0), Vec3::Z),
            Face::Down => (-Vec3::X, Vec3::new(0.0, -1.0, 0.0), -Vec3::Z),
        }
    }
}

/// World direction through the center of texel (u, v) on a `width x height`
/// face.
#[must_use]
pub fn texel_direction(face: Face, u: u32, v: u32, width: u32, height: u32) -> Vec3 {
    let (s, t, r) = face.frame();
    let su = 2.0 * (u as f32 + 0.5) / height as f32 - 1.0;
    let tv = 2.0 * (v as f32 + 0.5) / width as f32 - 1.0;
    (r + s * su + t * tv).normalize()
}

/// Six faces of linear radiance, each `width * height` texels row-major.
#[derive(Clone)]
pub struct CubeMap {
    pub width: u32,
    pub height: u32,
    faces: [Vec<Vec3>; 6],
}

impl CubeMap {
    /// An all-black cube with square faces of the given size.
    #[must_use]
    pub fn new(size: u32) -> Self {
        let texels = (size as usize) * (size as usize);
        Self {
            width: size,
            height: size,
            faces: std::array::from_fn(|_| vec![Vec3::ZERO; texels]),
        }
    }

    /// Loads an RGBE strip PNG (six faces stacked vertically).
    pub fn load_png(path: &Path) -> Result<Self> {
        let img = image::open(path)
            .map_err(|e| HeliosError::Image(format!("{}: {e}", path.display())))?
            .into_rgba8();
        let width = img.width();
        if width == 0 || img.height() != width * 6 {
            return Err(HeliosError::CubeMap(format!(
                "{}: expected a vertical strip of six square faces, got {}x{}",
                path.display(),
                width,
                img.height()
            )));
        }

        let mut cube = Self::new(width);
        for face in Face::ALL {
            let base_row = face as u32 * width;
            for v in 0..width {
                for u in 0..width {
                    let px = img.get_pixel(u, base_row + v);
                    let [r, g, b, e] = px.0;
                    cube.set(face, u, v, rgbe::decode(r, g, b, e));
                }
            }
        }
        Ok(cube)
    }

    /// Writes the cube as an RGBE strip PNG.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::new(self.width, self.height * 6);
        for face in Face::ALL {
            let base_row = face as u32 * self.height;
            for v in 0..self.height {
                for u in 0..self.width {
                    let encoded = rgbe::encode(self.get(face, u, v));
                    img.put_pixel(u, base_row + v, Rgba(encoded));
                }
            }
        }
        img.save(path)
            .map_err(|e| HeliosError::Image(format!("{}: {e}", path.display())))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, face: Face, u: u32, v: u32) -> Vec3 {
        self.faces[face as usize][(v * self.width + u) as usize]
    }

    #[inline]
    pub fn set(&mut self, face: Face, u: u32, v: u32, value: Vec3) {
        self.faces[face as usize][(v * self.width + u) as usize] = value;
    }

    /// Replaces one whole face slab (worker join).
    pub fn set_face(&mut self, face: Face, texels: Vec<Vec3>) {
        assert_eq!(texels.len(), (self.width * self.height) as usize);
        self.faces[face as usize] = texels;
    }

    /// World direction through the center of texel (u, v) of `face`.
    #[must_use]
    pub fn direction(&self, face: Face, u: u32, v: u32) -> Vec3 {
        texel_direction(face, u, v, self.width, self.height)
    }

    /// Projects a direction onto (face, u, v) by its dominant axis.
    #[must_use]
    pub fn project(&self, dir: Vec3) -> (Face, u32, u32) {
        let (ax, ay, az) = (dir.x.abs(), dir.y.abs(), dir.z.abs());

        let (sc, tc, rc, face) = if ax >= ay && ax >= az {
            if dir.x >= 0.0 {
                (-dir.z, -dir.y, dir.x, Face::Right)
            } else {
                (dir.z, -dir.y, dir.x, Face::Left)
            }
        } else if ay >= az {
            if dir.y >= 0.0 {
                (dir.x, dir.z, dir.y, Face::Front)
            } else {
                (dir.x, -dir.z, dir.y, Face::Back)
            }
        } else if dir.z >= 0.0 {
            (dir.x, -dir.y, dir.z, Face::Up)
        } else {
            (-dir.x, -dir.y, dir.z, Face::Down)
        };

        let abs_rc = rc.abs();
        let u = (0.5 * (sc / abs_rc + 1.0) * self.width as f32).floor() as i64;
        let v = (0.5 * (tc / abs_rc + 1.0) * self.height as f32).floor() as i64;
        let u = u.clamp(0, i64::from(self.width) - 1) as u32;
        let v = v.clamp(0, i64::from(self.height) - 1) as u32;
        (face, u, v)
    }

    /// Nearest-texel radiance lookup along a direction.
    #[must_use]
    pub fn sample(&self, dir: Vec3) -> Vec3 {
        let (face, u, v) = self.project(dir);
        self.get(face, u, v)
    }
}
