//! Environment-map pre-integration.
//!
//! Takes an RGBE cube strip and produces the two lookup tables image-based
//! lighting needs: a Lambertian irradiance cube and a roughness-layered GGX
//! pre-filter with its 2-D split-sum BRDF table.

pub mod bright;
pub mod cubemap;
pub mod ggx;
pub mod lambertian;
pub mod rgbe;

use std::path::{Path, PathBuf};

use crate::errors::{HeliosError, Result};
pub use bright::BrightDirection;
pub use cubemap::{CubeMap, Face};
pub use ggx::BrdfTable;

/// Which integral the prefilter binary runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Lambertian,
    Ggx,
}

impl Mode {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "Lambertian" => Ok(Self::Lambertian),
            "GGX" => Ok(Self::Ggx),
            other => Err(HeliosError::Format(format!("unknown prefilter mode '{other}'"))),
        }
    }
}

/// Output path for the irradiance cube of a given source.
#[must_use]
pub fn lambertian_output(src: &Path) -> PathBuf {
    PathBuf::from(format!("{}_lam.png", src.display()))
}

/// Output path for one GGX roughness tier of a given source.
#[must_use]
pub fn ggx_output(src: &Path, tier: u32) -> PathBuf {
    PathBuf::from(format!("{}_ggx_{tier}.png", src.display()))
}

/// Output path for the split-sum BRDF table of a given source.
#[must_use]
pub fn brdf_output(src: &Path) -> PathBuf {
    PathBuf::from(format!("{}_ggx_brdf.png", src.display()))
}

/// A loaded environment with its bright texels already promoted to explicit
/// directions.
pub struct Baker {
    src: PathBuf,
    cube: CubeMap,
    brights: Vec<BrightDirection>,
}

impl Baker {
    /// Loads the RGBE strip at `src` and extracts the bright list.
    pub fn load(src: &Path) -> Result<Self> {
        let mut cube = CubeMap::load_png(src)?;
        log::info!(
            "loaded environment {} ({}x{} per face)",
            src.display(),
            cube.width,
            cube.height
        );
        let brights = bright::extract(&mut cube);
        Ok(Self {
            src: src.to_path_buf(),
            cube,
            brights,
        })
    }

    /// Runs the Lambertian pass and writes `<src>_lam.png`.
    pub fn run_lambertian(&self, n_samples: u32, out_size: u32) -> Result<()> {
        let out = lambertian::bake(&self.cube, &self.brights, n_samples, out_size);
        let path = lambertian_output(&self.src);
        log::info!("writing {}", path.display());
        out.save_png(&path)
    }

    /// Runs all GGX roughness tiers plus the BRDF table, writing
    /// `<src>_ggx_<tier>.png` per tier and `<src>_ggx_brdf.png`.
    pub fn run_ggx(&self, n_samples: u32, out_size: u32) -> Result<()> {
        for tier in 0..ggx::ROUGHNESS_TIERS {
            let roughness = tier as f32 / ggx::ROUGHNESS_TIERS as f32;
            let out = ggx::bake_tier(&self.cube, &self.brights, n_samples, out_size, roughness);
            let path = ggx_output(&self.src, tier);
            log::info!("writing {}", path.display());
            out.save_png(&path)?;
        }

        let table = ggx::bake_brdf_table(n_samples);
        let path = brdf_output(&self.src);
        log::info!("writing {}", path.display());
        table.save_png(&path)
    }
}
