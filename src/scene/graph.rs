//! Scene graph reconstruction and the per-frame walk.
//!
//! The document's flat element array becomes a flat node arena: every child
//! reference that was a numeric index is resolved once, at build time, to an
//! arena index. The build walk also assigns each element its document index
//! (the space drivers target), registers meshes into the mesh store (first
//! occurrence loads, later occurrences only add instances), collects cameras
//! and lights, fills the material registry, and records the environment
//! radiance source.
//!
//! The per-frame walk is the hot path: it clears every mesh's instance list,
//! re-composes driver-overridden TRS transforms from the roots down, and
//! refreshes camera and light poses.

use std::path::PathBuf;

use glam::Mat4;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{HeliosError, Result};
use crate::material::MaterialRegistry;
use crate::mesh::{MeshId, MeshStore};
use crate::s72::{self, Document, Value};
use crate::scene::camera::Camera;
use crate::scene::clock::PlaybackClock;
use crate::scene::driver::{Channel, Driver, Sample};
use crate::scene::light::Light;
use crate::scene::transform::Transform;

/// One node of the arena.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    /// Arena indices of child nodes.
    pub children: Vec<usize>,
    pub mesh: Option<MeshId>,
    /// Index into [`SceneGraph::cameras`].
    pub camera: Option<usize>,
    /// Index into [`SceneGraph::lights`].
    pub light: Option<usize>,

    /// Document index; drivers target this space.
    pub doc_index: usize,
    // Driver slots resolved at build, one per channel.
    pub driver_translation: Option<usize>,
    pub driver_rotation: Option<usize>,
    pub driver_scale: Option<usize>,
}

/// The reconstructed scene.
pub struct SceneGraph {
    pub name: String,
    nodes: Vec<SceneNode>,
    roots: Vec<usize>,
    pub drivers: Vec<Driver>,
    /// Cameras; index 0/1 are the synthetic User/Debug cameras.
    pub cameras: Vec<Camera>,
    pub lights: Vec<Light>,
    /// Path of the RGBE environment strip, if the scene declares one.
    pub environment_src: Option<PathBuf>,
    pub clock: PlaybackClock,
}

/// Index of the synthetic user camera.
pub const USER_CAMERA: usize = 0;
/// Index of the synthetic debug camera.
pub const DEBUG_CAMERA: usize = 1;

struct Builder<'a> {
    doc: &'a Document,
    meshes: &'a mut MeshStore,

    nodes: Vec<SceneNode>,
    node_by_doc: FxHashMap<usize, usize>,
    in_progress: FxHashSet<usize>,
    cameras: Vec<Camera>,
    camera_by_doc: FxHashMap<usize, usize>,
    lights: Vec<Light>,
    light_by_doc: FxHashMap<usize, usize>,
}

impl SceneGraph {
    /// Reconstructs the graph from a parsed document, filling the mesh store
    /// and material registry as a side effect.
    pub fn build(
        doc: &Document,
        meshes: &mut MeshStore,
        materials: &mut MaterialRegistry,
    ) -> Result<Self> {
        let mut scene_element: Option<(usize, &Value)> = None;
        let mut drivers = Vec::new();
        let mut environment_src = None;

        for (index, element) in doc.elements().iter().enumerate() {
            let Some(ty) = element.get("type").and_then(Value::as_str) else {
                continue; // the magic string, or free-form data
            };
            match ty {
                "SCENE" => scene_element = Some((index, element)),
                "DRIVER" => drivers.push(Driver::from_value(element)?),
                "MATERIAL" => {
                    materials.register(doc, index, element)?;
                }
                "ENVIRONMENT" => {
                    let radiance = element.get("radiance").ok_or_else(|| {
                        HeliosError::Format("ENVIRONMENT is missing 'radiance'".into())
                    })?;
                    let src = s72::require_str(radiance, "src", "ENVIRONMENT radiance")?;
                    environment_src = Some(doc.resolve(src));
                }
                _ => {}
            }
        }

        let (_, scene) =
            scene_element.ok_or_else(|| HeliosError::Format("document has no SCENE element".into()))?;
        let name = s72::require_str(scene, "name", "SCENE")?.to_string();

        let mut builder = Builder {
            doc,
            meshes,
            nodes: Vec::new(),
            node_by_doc: FxHashMap::default(),
            in_progress: FxHashSet::default(),
            cameras: vec![Camera::synthetic("User-Camera"), Camera::synthetic("Debug-Camera")],
            camera_by_doc: FxHashMap::default(),
            lights: Vec::new(),
            light_by_doc: FxHashMap::default(),
        };

        let mut roots = Vec::new();
        for root_ref in s72::require_array(scene, "roots", "SCENE")? {
            let index = reference_index(root_ref, "SCENE root")?;
            roots.push(builder.resolve_node(index)?);
        }

        let mut graph = Self {
            name,
            nodes: builder.nodes,
            roots,
            drivers,
            cameras: builder.cameras,
            lights: builder.lights,
            environment_src,
            clock: PlaybackClock::new(),
        };
        graph.bind_drivers(doc)?;
        Ok(graph)
    }

    /// Attaches each driver to its target node's channel slot.
    fn bind_drivers(&mut self, doc: &Document) -> Result<()> {
        let by_doc: FxHashMap<usize, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(arena, node)| (node.doc_index, arena))
            .collect();

        for (driver_index, driver) in self.drivers.iter().enumerate() {
            // Out-of-range targets are a document defect; targets that exist
            // but are unreachable from the scene roots simply never animate.
            doc.element(driver.target)?;
            let Some(&arena) = by_doc.get(&driver.target) else {
                log::warn!(
                    "driver targets element {} which is not part of the scene",
                    driver.target
                );
                continue;
            };
            let node = &mut self.nodes[arena];
            let slot = match driver.channel {
                Channel::Translation => &mut node.driver_translation,
                Channel::Rotation => &mut node.driver_rotation,
                Channel::Scale => &mut node.driver_scale,
            };
            *slot = Some(driver_index);
        }
        Ok(())
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    /// Re-walks the graph at scene time `time`, rebuilding instance lists and
    /// camera/light poses.
    pub fn update(&mut self, time: f32, meshes: &mut MeshStore) {
        meshes.clear_instances();

        let mut stack: Vec<(usize, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|&r| (r, Mat4::IDENTITY))
            .collect();

        while let Some((index, parent)) = stack.pop() {
            let node = &self.nodes[index];

            let mut transform = node.transform;
            if let Some(d) = node.driver_translation {
                if let Sample::Vec3(v) = self.drivers[d].sample(time) {
                    transform.translation = v;
                }
            }
            if let Some(d) = node.driver_rotation {
                if let Sample::Quat(q) = self.drivers[d].sample(time) {
                    transform.rotation = q;
                }
            }
            if let Some(d) = node.driver_scale {
                if let Sample::Vec3(v) = self.drivers[d].sample(time) {
                    transform.scale = v;
                }
            }

            let world = parent * transform.local_matrix();

            if let Some(mesh) = node.mesh {
                meshes.push_instance(mesh, world);
            }
            if let Some(camera) = node.camera {
                self.cameras[camera].apply_world(world);
            }
            if let Some(light) = node.light {
                self.lights[light].apply_world(world);
            }

            for &child in node.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Camera index by name.
    #[must_use]
    pub fn find_camera(&self, name: &str) -> Option<usize> {
        self.cameras.iter().position(|c| c.name == name)
    }

    /// Lights that want a shadow pass this frame.
    pub fn shadow_lights(&self) -> impl Iterator<Item = (usize, &Light)> {
        self.lights
            .iter()
            .enumerate()
            .filter(|(_, l)| l.casts_shadow())
    }
}

impl Builder<'_> {
    /// Resolves a `NODE` element to an arena index, creating it on first
    /// sight. Cycles are a document defect.
    fn resolve_node(&mut self, doc_index: usize) -> Result<usize> {
        if let Some(&arena) = self.node_by_doc.get(&doc_index) {
            return Ok(arena);
        }
        if !self.in_progress.insert(doc_index) {
            return Err(HeliosError::AssetShape(format!(
                "node graph cycle through element {doc_index}"
            )));
        }

        let element = self.doc.element(doc_index)?;
        if element.get("type").and_then(Value::as_str) != Some("NODE") {
            return Err(HeliosError::AssetShape(format!(
                "element {doc_index} referenced as a node is not a NODE"
            )));
        }

        let name = s72::require_str(element, "name", "NODE")?.to_string();
        let transform = read_transform(element)?;

        let mesh = match element.get("mesh") {
            Some(reference) => {
                let index = reference_index(reference, "NODE mesh")?;
                let mesh_element = self.doc.element(index)?;
                if mesh_element.get("type").and_then(Value::as_str) != Some("MESH") {
                    return Err(HeliosError::AssetShape(format!(
                        "element {index} referenced as a mesh is not a MESH"
                    )));
                }
                Some(self.meshes.register(self.doc, mesh_element)?)
            }
            None => None,
        };

        let camera = match element.get("camera") {
            Some(reference) => Some(self.resolve_camera(reference_index(reference, "NODE camera")?)?),
            None => None,
        };

        let light = match element.get("light") {
            Some(reference) => Some(self.resolve_light(reference_index(reference, "NODE light")?)?),
            None => None,
        };

        let mut children = Vec::new();
        if let Some(child_refs) = element.get("children").and_then(Value::as_array) {
            for child_ref in child_refs {
                let index = reference_index(child_ref, "NODE child")?;
                children.push(self.resolve_node(index)?);
            }
        }

        self.in_progress.remove(&doc_index);
        let arena = self.nodes.len();
        self.nodes.push(SceneNode {
            name,
            transform,
            children,
            mesh,
            camera,
            light,
            doc_index,
            driver_translation: None,
            driver_rotation: None,
            driver_scale: None,
        });
        self.node_by_doc.insert(doc_index, arena);
        Ok(arena)
    }

    fn resolve_camera(&mut self, doc_index: usize) -> Result<usize> {
        if let Some(&id) = self.camera_by_doc.get(&doc_index) {
            return Ok(id);
        }
        let element = self.doc.element(doc_index)?;
        if element.get("type").and_then(Value::as_str) != Some("CAMERA") {
            return Err(HeliosError::AssetShape(format!(
                "element {doc_index} referenced as a camera is not a CAMERA"
            )));
        }
        let name = s72::require_str(element, "name", "CAMERA")?;
        let perspective = element
            .get("perspective")
            .ok_or_else(|| HeliosError::Format(format!("camera '{name}' has no perspective")))?;

        let camera = Camera::declared(
            name,
            s72::require_number(perspective, "aspect", "CAMERA perspective")?,
            s72::require_number(perspective, "vfov", "CAMERA perspective")?,
            s72::require_number(perspective, "near", "CAMERA perspective")?,
            s72::require_number(perspective, "far", "CAMERA perspective")?,
        );
        let id = self.cameras.len();
        self.cameras.push(camera);
        self.camera_by_doc.insert(doc_index, id);
        Ok(id)
    }

    fn resolve_light(&mut self, doc_index: usize) -> Result<usize> {
        if let Some(&id) = self.light_by_doc.get(&doc_index) {
            return Ok(id);
        }
        let element = self.doc.element(doc_index)?;
        if element.get("type").and_then(Value::as_str) != Some("LIGHT") {
            return Err(HeliosError::AssetShape(format!(
                "element {doc_index} referenced as a light is not a LIGHT"
            )));
        }
        let light = Light::from_value(element)?;
        let id = self.lights.len();
        self.lights.push(light);
        self.light_by_doc.insert(doc_index, id);
        Ok(id)
    }
}

/// A numeric cross-reference.
fn reference_index(value: &Value, what: &str) -> Result<usize> {
    value
        .as_number()
        .map(|n| n as usize)
        .ok_or_else(|| HeliosError::AssetShape(format!("{what} reference is not an index")))
}

/// TRS keys of a NODE, with identity defaults.
fn read_transform(element: &Value) -> Result<Transform> {
    let translation = match element.get("translation").and_then(Value::as_array) {
        Some(a) => s72::number_vec3(a, "translation")?,
        None => glam::Vec3::ZERO,
    };
    let rotation = match element.get("rotation").and_then(Value::as_array) {
        Some(a) => {
            if a.len() != 4 {
                return Err(HeliosError::Format("rotation must have 4 components".into()));
            }
            let mut q = [0.0f32; 4];
            for (slot, v) in q.iter_mut().zip(a) {
                *slot = v.as_number().ok_or_else(|| {
                    HeliosError::Format("rotation has a non-numeric component".into())
                })?;
            }
            glam::Quat::from_xyzw(q[0], q[1], q[2], q[3]).normalize()
        }
        None => glam::Quat::IDENTITY,
    };
    let scale = match element.get("scale").and_then(Value::as_array) {
        Some(a) => s72::number_vec3(a, "scale")?,
        None => glam::Vec3::ONE,
    };
    Ok(Transform::new(translation, rotation, scale))
}
