//! Mesh store.
//!
//! Meshes own a single interleaved byte payload plus attribute records
//! (offset + format) describing the five lanes: position, normal, tangent,
//! texcoord, color. Payloads load from b72 files next to the scene document.
//! When the tangent/texcoord lanes are absent, the store synthesizes them by
//! padding each vertex with 24 zero bytes between normal and color, rewriting
//! the stride and color offset. The AABB is computed once at load by scanning
//! only the position lane. Instance lists are rebuilt every frame by the
//! scene walk; the visible list is refreshed per camera through the culler.

use std::fs;

use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;

use crate::cull::{self, FrustumParams};
use crate::errors::{HeliosError, Result};
use crate::s72::{self, Document, Value};

/// Identifier of a mesh inside the store.
pub type MeshId = usize;

/// Synthesized-lane layout: stride and fixed offsets once tangent/texcoord
/// padding has been inserted.
const PADDED_STRIDE: u32 = 52;
const PADDED_TANGENT_OFFSET: u32 = 24;
const PADDED_TEXCOORD_OFFSET: u32 = 40;
const PADDED_COLOR_OFFSET: u32 = 48;

// ============================================================================
// Enumerations
// ============================================================================

/// Vertex attribute formats the document may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    R32g32b32Sfloat,
    R32g32b32a32Sfloat,
    R32g32Sfloat,
    R8g8b8a8Unorm,
}

impl VertexFormat {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "R32G32B32_SFLOAT" => Ok(Self::R32g32b32Sfloat),
            "R32G32B32A32_SFLOAT" => Ok(Self::R32g32b32a32Sfloat),
            "R32G32_SFLOAT" => Ok(Self::R32g32Sfloat),
            "R8G8B8A8_UNORM" => Ok(Self::R8g8b8a8Unorm),
            other => Err(HeliosError::Format(format!("unknown vertex format '{other}'"))),
        }
    }

    #[must_use]
    pub fn byte_size(self) -> u32 {
        match self {
            Self::R32g32b32Sfloat => 12,
            Self::R32g32b32a32Sfloat => 16,
            Self::R32g32Sfloat => 8,
            Self::R8g8b8a8Unorm => 4,
        }
    }

    #[must_use]
    pub fn to_wgpu(self) -> wgpu::VertexFormat {
        match self {
            Self::R32g32b32Sfloat => wgpu::VertexFormat::Float32x3,
            Self::R32g32b32a32Sfloat => wgpu::VertexFormat::Float32x4,
            Self::R32g32Sfloat => wgpu::VertexFormat::Float32x2,
            Self::R8g8b8a8Unorm => wgpu::VertexFormat::Unorm8x4,
        }
    }
}

/// Primitive topologies of the s72 format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    TriangleFan,
    LineListWithAdjacency,
    LineStripWithAdjacency,
    TriangleListWithAdjacency,
    TriangleStripWithAdjacency,
    PatchList,
}

impl Topology {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "POINT_LIST" => Ok(Self::PointList),
            "LINE_LIST" => Ok(Self::LineList),
            "LINE_STRIP" => Ok(Self::LineStrip),
            "TRIANGLE_LIST" => Ok(Self::TriangleList),
            "TRIANGLE_STRIP" => Ok(Self::TriangleStrip),
            "TRIANGLE_FAN" => Ok(Self::TriangleFan),
            "LINE_LIST_WITH_ADJACENCY" => Ok(Self::LineListWithAdjacency),
            "LINE_STRIP_WITH_ADJACENCY" => Ok(Self::LineStripWithAdjacency),
            "TRIANGLE_LIST_WITH_ADJACENCY" => Ok(Self::TriangleListWithAdjacency),
            "TRIANGLE_STRIP_WITH_ADJACENCY" => Ok(Self::TriangleStripWithAdjacency),
            "PATCH_LIST" => Ok(Self::PatchList),
            other => Err(HeliosError::Format(format!("unknown topology '{other}'"))),
        }
    }

    /// The wgpu rendition. Adjacency/patch/fan topologies have no wgpu
    /// equivalent and fail at pipeline creation.
    pub fn to_wgpu(self) -> Result<wgpu::PrimitiveTopology> {
        match self {
            Self::PointList => Ok(wgpu::PrimitiveTopology::PointList),
            Self::LineList => Ok(wgpu::PrimitiveTopology::LineList),
            Self::LineStrip => Ok(wgpu::PrimitiveTopology::LineStrip),
            Self::TriangleList => Ok(wgpu::PrimitiveTopology::TriangleList),
            Self::TriangleStrip => Ok(wgpu::PrimitiveTopology::TriangleStrip),
            other => Err(HeliosError::Format(format!(
                "topology {other:?} is not supported by this backend"
            ))),
        }
    }
}

/// Culling mode selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullingMode {
    #[default]
    None,
    Frustum,
}

impl CullingMode {
    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "frustum" => Ok(Self::Frustum),
            other => Err(HeliosError::Format(format!("unknown culling mode '{other}'"))),
        }
    }
}

// ============================================================================
// Geometry records
// ============================================================================

/// One attribute lane: byte offset within a vertex plus its format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub offset: u32,
    pub format: VertexFormat,
}

/// The five attribute lanes of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub position: VertexAttribute,
    pub normal: VertexAttribute,
    pub tangent: VertexAttribute,
    pub texcoord: VertexAttribute,
    pub color: VertexAttribute,
    pub stride: u32,
}

/// Axis-aligned bounding box. Starts inverted (+inf / -inf) so the first
/// extend sets both corners.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }
}

impl Aabb {
    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    #[must_use]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

/// A mesh: one owned interleaved payload plus its lane descriptors, optional
/// index payload, bounds, and the per-frame instance lists.
pub struct Mesh {
    pub name: String,
    pub blob: Vec<u8>,
    pub count: u32,
    pub topology: Topology,
    pub layout: VertexLayout,

    pub indices: Option<Vec<u8>>,
    pub index_count: u32,

    pub aabb: Aabb,
    /// Document index of the material element, if any.
    pub material_ref: Option<usize>,

    /// World matrices, rebuilt every frame by the scene walk.
    pub instances: Vec<Mat4>,
    /// Subset of `instances` that survived culling.
    pub visible: Vec<Mat4>,
}

impl Mesh {
    /// Refreshes the visible-instance list for one camera.
    pub fn update_visible(&mut self, mode: CullingMode, frustum: &FrustumParams, view: Mat4) {
        match mode {
            CullingMode::None => {
                self.visible.clear();
                self.visible.extend_from_slice(&self.instances);
            }
            CullingMode::Frustum => {
                self.visible.clear();
                for &model in &self.instances {
                    if !cull::is_culled(frustum, view, model, &self.aabb) {
                        self.visible.push(model);
                    }
                }
            }
        }
    }
}

// ============================================================================
// Store
// ============================================================================

/// All meshes of a scene, keyed by their unique names.
#[derive(Default)]
pub struct MeshStore {
    meshes: Vec<Mesh>,
    by_name: FxHashMap<String, MeshId>,
}

impl MeshStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `MESH` element; loads payloads only on first sight and
    /// returns the existing id afterwards (mesh instancing).
    pub fn register(&mut self, doc: &Document, element: &Value) -> Result<MeshId> {
        let name = s72::require_str(element, "name", "MESH")?;
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }

        let mesh = load_mesh(doc, element)?;
        let id = self.meshes.len();
        self.by_name.insert(mesh.name.clone(), id);
        self.meshes.push(mesh);
        Ok(id)
    }

    /// Clears every mesh's instance list (start of a frame walk).
    pub fn clear_instances(&mut self) {
        for mesh in &mut self.meshes {
            mesh.instances.clear();
        }
    }

    /// Appends one instance world matrix.
    pub fn push_instance(&mut self, id: MeshId, world: Mat4) {
        self.meshes[id].instances.push(world);
    }

    /// Refreshes every mesh's visible list for the active camera.
    pub fn refresh_visibility(
        &mut self,
        mode: CullingMode,
        frustum: &FrustumParams,
        view: Mat4,
    ) {
        for mesh in &mut self.meshes {
            mesh.update_visible(mode, frustum, view);
        }
    }

    #[must_use]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    #[must_use]
    pub fn get(&self, id: MeshId) -> &Mesh {
        &self.meshes[id]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Total instance count across all meshes (uniform-ring sizing).
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.meshes.iter().map(|m| m.instances.len()).sum()
    }
}

// ============================================================================
// Loading
// ============================================================================

fn load_mesh(doc: &Document, element: &Value) -> Result<Mesh> {
    let name = s72::require_str(element, "name", "MESH")?.to_string();
    let count = s72::require_number(element, "count", "MESH")? as u32;
    let topology = Topology::from_str(s72::require_str(element, "topology", "MESH")?)?;

    let attributes = element
        .get("attributes")
        .ok_or_else(|| HeliosError::Format(format!("mesh '{name}' has no attributes")))?;

    let position_value = attributes
        .get("POSITION")
        .ok_or_else(|| HeliosError::Format(format!("mesh '{name}' lacks POSITION")))?;
    let position = VertexAttribute {
        offset: s72::require_number(position_value, "offset", "POSITION")? as u32,
        format: VertexFormat::from_str(s72::require_str(position_value, "format", "POSITION")?)?,
    };
    let normal = read_attribute(attributes, "NORMAL", &name)?
        .ok_or_else(|| HeliosError::Format(format!("mesh '{name}' lacks NORMAL")))?;
    let color = read_attribute(attributes, "COLOR", &name)?
        .ok_or_else(|| HeliosError::Format(format!("mesh '{name}' lacks COLOR")))?;
    let tangent = read_attribute(attributes, "TANGENT", &name)?;
    let texcoord = read_attribute(attributes, "TEXCOORD", &name)?;

    // The payload source and stride ride on the POSITION record.
    let src = s72::require_str(position_value, "src", "POSITION attribute")?;
    let stride = s72::require_number(position_value, "stride", "POSITION attribute")? as u32;

    let src_path = doc.resolve(src);
    let mut blob = fs::read(&src_path).map_err(|e| HeliosError::io(&src_path, e))?;

    // Synthesize missing tangent/texcoord lanes with zero padding.
    let layout = match (tangent, texcoord) {
        (Some(tangent), Some(texcoord)) => VertexLayout {
            position,
            normal,
            tangent,
            texcoord,
            color,
            stride,
        },
        _ => {
            blob = pad_missing_lanes(&blob, count, stride, color.offset);
            VertexLayout {
                position,
                normal,
                tangent: VertexAttribute {
                    offset: PADDED_TANGENT_OFFSET,
                    format: VertexFormat::R32g32b32a32Sfloat,
                },
                texcoord: VertexAttribute {
                    offset: PADDED_TEXCOORD_OFFSET,
                    format: VertexFormat::R32g32Sfloat,
                },
                color: VertexAttribute {
                    offset: PADDED_COLOR_OFFSET,
                    format: color.format,
                },
                stride: PADDED_STRIDE,
            }
        }
    };

    if (layout.stride as usize) * (count as usize) > blob.len() {
        return Err(HeliosError::Format(format!(
            "mesh '{name}': payload holds {} bytes but count*stride needs {}",
            blob.len(),
            layout.stride as usize * count as usize
        )));
    }

    let aabb = scan_aabb(&blob, count, layout.stride, layout.position.offset);

    // Optional index payload: u32 little-endian, starting at `offset` bytes.
    let (indices, index_count) = if let Some(index_value) = element.get("indices") {
        let index_src = s72::require_str(index_value, "src", "indices")?;
        let offset = index_value
            .get("offset")
            .and_then(Value::as_number)
            .unwrap_or(0.0) as usize;
        let path = doc.resolve(index_src);
        let data = fs::read(&path).map_err(|e| HeliosError::io(&path, e))?;
        if offset > data.len() {
            return Err(HeliosError::Format(format!(
                "mesh '{name}': index offset {offset} past payload end"
            )));
        }
        let data = data[offset..].to_vec();
        let n = (data.len() / 4) as u32;
        (Some(data), n)
    } else {
        (None, 0)
    };

    let material_ref = element
        .get("material")
        .and_then(Value::as_number)
        .map(|n| n as usize);

    Ok(Mesh {
        name,
        blob,
        count,
        topology,
        layout,
        indices,
        index_count,
        aabb,
        material_ref,
        instances: Vec::new(),
        visible: Vec::new(),
    })
}

fn read_attribute(
    attributes: &Value,
    key: &str,
    mesh: &str,
) -> Result<Option<VertexAttribute>> {
    let Some(attr) = attributes.get(key) else {
        return Ok(None);
    };
    let offset = s72::require_number(attr, "offset", key)? as u32;
    let format = VertexFormat::from_str(s72::require_str(attr, "format", key)?)
        .map_err(|e| HeliosError::Format(format!("mesh '{mesh}' {key}: {e}")))?;
    Ok(Some(VertexAttribute { offset, format }))
}

/// Inserts 16 zero tangent bytes and 8 zero texcoord bytes per vertex between
/// the normal and color lanes.
fn pad_missing_lanes(blob: &[u8], count: u32, old_stride: u32, old_color_offset: u32) -> Vec<u8> {
    let front = old_color_offset as usize;
    let back = (old_stride - old_color_offset) as usize;
    let padding = (PADDED_COLOR_OFFSET - PADDED_TANGENT_OFFSET) as usize;

    let mut out = Vec::with_capacity(count as usize * PADDED_STRIDE as usize);
    for vertex in blob.chunks_exact(front + back).take(count as usize) {
        out.extend_from_slice(&vertex[..front]);
        out.extend(std::iter::repeat_n(0u8, padding));
        out.extend_from_slice(&vertex[front..]);
    }
    out
}

/// Single pass over the position lane tracking componentwise min/max.
fn scan_aabb(blob: &[u8], count: u32, stride: u32, position_offset: u32) -> Aabb {
    let mut aabb = Aabb::default();
    for i in 0..count as usize {
        let base = i * stride as usize + position_offset as usize;
        let Some(bytes) = blob.get(base..base + 12) else {
            break;
        };
        let x = f32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let y = f32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let z = f32::from_le_bytes(bytes[8..12].try_into().unwrap());
        aabb.extend(Vec3::new(x, y, z));
    }
    aabb
}
