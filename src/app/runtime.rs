//! Loaded scene state shared by every run mode.

use std::path::Path;

use crate::errors::{HeliosError, Result};
use crate::material::MaterialRegistry;
use crate::mesh::{CullingMode, MeshStore};
use crate::s72::Document;
use crate::scene::{SceneGraph, USER_CAMERA};

/// A fully reconstructed scene: graph, mesh store, material registry, and
/// the active camera/culling selection.
pub struct SceneRuntime {
    pub graph: SceneGraph,
    pub meshes: MeshStore,
    pub materials: MaterialRegistry,
    pub camera_index: usize,
    pub culling: CullingMode,
}

impl SceneRuntime {
    /// Loads and reconstructs a scene, selecting the requested camera
    /// ("User-Camera" when none is named).
    pub fn load(scene: &Path, camera: Option<&str>, culling: CullingMode) -> Result<Self> {
        let doc = Document::load(scene)?;
        let mut meshes = MeshStore::new();
        let mut materials = MaterialRegistry::new();
        let mut graph = SceneGraph::build(&doc, &mut meshes, &mut materials)?;

        // First walk: initial poses and instance lists.
        graph.update(0.0, &mut meshes);

        let camera_index = match camera {
            Some(name) => graph.find_camera(name).ok_or_else(|| {
                HeliosError::AssetShape(format!("no camera named '{name}' in the scene"))
            })?,
            None => USER_CAMERA,
        };

        log::info!(
            "scene '{}': {} nodes, {} meshes, {} cameras, {} lights, {} drivers",
            graph.name,
            graph.nodes().len(),
            meshes.len(),
            graph.cameras.len(),
            graph.lights.len(),
            graph.drivers.len(),
        );

        Ok(Self {
            graph,
            meshes,
            materials,
            camera_index,
            culling,
        })
    }

    /// Re-walks the scene at the given animation time.
    pub fn update(&mut self, time: f32) {
        self.graph.update(time, &mut self.meshes);
    }

    /// Switches to the next camera (scene cameras and both synthetic ones).
    pub fn cycle_camera(&mut self) {
        self.camera_index = (self.camera_index + 1) % self.graph.cameras.len();
        log::info!("camera: {}", self.graph.cameras[self.camera_index].name);
    }
}
