//! Material registry.
//!
//! Materials are a closed sum over five variants: simple (vertex color),
//! environment, mirror, lambertian, and PBR. Every variant owns a normal map
//! and an optional displacement map; lambertian and PBR parameters may be a
//! scalar/color or a texture. Scalars are unified into 1x1 textures so the
//! sampling path is the same either way. The registry resolves the document's
//! material references once and partitions meshes per material so the render
//! loop binds each pipeline once and then iterates its meshes.

use std::path::PathBuf;

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::mesh::{MeshId, MeshStore};
use crate::s72::{self, Document, Value};

/// Identifier of a material inside the registry.
pub type MaterialId = usize;

/// Where a texture's pixels come from: a PNG next to the scene file, or a
/// single solid RGBA texel (the 1x1 unification of scalar parameters).
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    Png(PathBuf),
    Solid([f32; 4]),
}

impl TextureSource {
    /// Neutral tangent-space normal (+Z).
    #[must_use]
    pub fn flat_normal() -> Self {
        Self::Solid([0.5, 0.5, 1.0, 1.0])
    }

    #[must_use]
    pub fn solid_scalar(v: f32) -> Self {
        Self::Solid([v, v, v, 1.0])
    }
}

/// Number of mip levels for a base size.
#[must_use]
pub fn mip_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Variant-specific material payload.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Vertex colors only.
    Simple,
    /// Samples the environment cube by surface normal.
    Environment,
    /// Samples the environment cube by the reflected view direction.
    Mirror,
    /// Albedo times the pre-integrated irradiance cube.
    Lambertian { albedo: TextureSource },
    /// Split-sum PBR: GGX mip stack + BRDF table.
    Pbr {
        albedo: TextureSource,
        roughness: TextureSource,
        metalness: TextureSource,
    },
}

impl MaterialKind {
    /// Stable tag used for pipeline selection and partition ordering.
    #[must_use]
    pub fn tag(&self) -> MaterialTag {
        match self {
            Self::Simple => MaterialTag::Simple,
            Self::Environment => MaterialTag::Environment,
            Self::Mirror => MaterialTag::Mirror,
            Self::Lambertian { .. } => MaterialTag::Lambertian,
            Self::Pbr { .. } => MaterialTag::Pbr,
        }
    }
}

/// Discriminant-only view of [`MaterialKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialTag {
    Simple,
    Environment,
    Mirror,
    Lambertian,
    Pbr,
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub kind: MaterialKind,
    pub normal_map: TextureSource,
    pub displacement_map: Option<TextureSource>,
}

impl Material {
    fn simple_default() -> Self {
        Self {
            name: "Default".to_string(),
            kind: MaterialKind::Simple,
            normal_map: TextureSource::flat_normal(),
            displacement_map: None,
        }
    }

    /// Builds a material from a `MATERIAL` document element.
    pub fn from_value(doc: &Document, value: &Value) -> Result<Self> {
        let name = s72::require_str(value, "name", "MATERIAL")?.to_string();

        let normal_map = value
            .get("normalMap")
            .map(|m| texture_source(doc, m))
            .transpose()?
            .unwrap_or_else(TextureSource::flat_normal);
        let displacement_map = value
            .get("displacementMap")
            .map(|m| texture_source(doc, m))
            .transpose()?;

        let kind = if value.get("environment").is_some() {
            MaterialKind::Environment
        } else if value.get("mirror").is_some() {
            MaterialKind::Mirror
        } else if let Some(lam) = value.get("lambertian") {
            MaterialKind::Lambertian {
                albedo: color_param(doc, lam.get("albedo"), [1.0, 1.0, 1.0])?,
            }
        } else if let Some(pbr) = value.get("pbr") {
            MaterialKind::Pbr {
                albedo: color_param(doc, pbr.get("albedo"), [1.0, 1.0, 1.0])?,
                roughness: scalar_param(doc, pbr.get("roughness"), 1.0)?,
                metalness: scalar_param(doc, pbr.get("metalness"), 0.0)?,
            }
        } else {
            MaterialKind::Simple
        };

        Ok(Self {
            name,
            kind,
            normal_map,
            displacement_map,
        })
    }
}

/// `{src}` texture reference.
fn texture_source(doc: &Document, value: &Value) -> Result<TextureSource> {
    let src = s72::require_str(value, "src", "texture")?;
    Ok(TextureSource::Png(doc.resolve(src)))
}

/// A color parameter: `[r,g,b]`, `{src}`, or absent (default).
fn color_param(doc: &Document, value: Option<&Value>, default: [f32; 3]) -> Result<TextureSource> {
    match value {
        None => Ok(TextureSource::Solid([default[0], default[1], default[2], 1.0])),
        Some(v) => {
            if let Some(rgb) = v.as_array() {
                let c = s72::number_vec3(rgb, "albedo")?;
                Ok(TextureSource::Solid([c.x, c.y, c.z, 1.0]))
            } else {
                texture_source(doc, v)
            }
        }
    }
}

/// A scalar parameter: number, `{src}`, or absent (default).
fn scalar_param(doc: &Document, value: Option<&Value>, default: f32) -> Result<TextureSource> {
    match value {
        None => Ok(TextureSource::solid_scalar(default)),
        Some(v) => {
            if let Some(n) = v.as_number() {
                Ok(TextureSource::solid_scalar(n))
            } else {
                texture_source(doc, v)
            }
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// All materials of a scene. Id 0 is always the default simple material.
pub struct MaterialRegistry {
    materials: Vec<Material>,
    by_doc_index: FxHashMap<usize, MaterialId>,
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            materials: vec![Material::simple_default()],
            by_doc_index: FxHashMap::default(),
        }
    }

    pub const DEFAULT: MaterialId = 0;

    /// Registers a `MATERIAL` element found at `doc_index`.
    pub fn register(&mut self, doc: &Document, doc_index: usize, value: &Value) -> Result<MaterialId> {
        if let Some(&id) = self.by_doc_index.get(&doc_index) {
            return Ok(id);
        }
        let material = Material::from_value(doc, value)?;
        let id = self.materials.len();
        self.by_doc_index.insert(doc_index, id);
        self.materials.push(material);
        Ok(id)
    }

    /// Resolves a mesh's material reference (document index) to an id,
    /// falling back to the default simple material.
    #[must_use]
    pub fn resolve(&self, material_ref: Option<usize>) -> MaterialId {
        material_ref
            .and_then(|idx| self.by_doc_index.get(&idx).copied())
            .unwrap_or(Self::DEFAULT)
    }

    #[must_use]
    pub fn get(&self, id: MaterialId) -> &Material {
        &self.materials[id]
    }

    #[must_use]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Groups meshes by material so the render loop binds each pipeline once.
    /// Materials with no meshes are omitted.
    #[must_use]
    pub fn partition(&self, meshes: &MeshStore) -> Vec<(MaterialId, Vec<MeshId>)> {
        let mut buckets: Vec<Vec<MeshId>> = vec![Vec::new(); self.materials.len()];
        for (mesh_id, mesh) in meshes.meshes().iter().enumerate() {
            buckets[self.resolve(mesh.material_ref)].push(mesh_id);
        }
        buckets
            .into_iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_count_follows_log2() {
        assert_eq!(mip_count(1, 1), 1);
        assert_eq!(mip_count(2, 2), 2);
        assert_eq!(mip_count(256, 256), 9);
        assert_eq!(mip_count(640, 480), 10);
    }
}
