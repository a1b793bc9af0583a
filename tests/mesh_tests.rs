//! Mesh store tests
//!
//! Tests for:
//! - b72 payload loading and attribute descriptors
//! - Tangent/texcoord lane synthesis (stride 52, offsets 24/40/48)
//! - AABB computation from the position lane only
//! - Topology / format string mapping
//! - Visibility refresh in both culling modes

use std::fs;
use std::path::PathBuf;

use glam::{Mat4, Vec3};
use helios::material::MaterialRegistry;
use helios::mesh::{CullingMode, MeshStore, Topology, VertexFormat};
use helios::s72::Document;
use helios::scene::{SceneGraph, USER_CAMERA};

const EPSILON: f32 = 1e-5;

fn fixture_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("helios-mesh-{}-{tag}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// 28-byte-stride vertices: position, normal, RGBA8 color. No tangent or
/// texcoord lanes, so the store must synthesize them.
fn write_b72(dir: &PathBuf, name: &str, positions: &[[f32; 3]]) {
    let mut blob = Vec::new();
    for p in positions {
        for c in p {
            blob.extend_from_slice(&c.to_le_bytes());
        }
        for c in [0.0f32, 0.0, 1.0] {
            blob.extend_from_slice(&c.to_le_bytes());
        }
        blob.extend_from_slice(&[10, 20, 30, 255]);
    }
    fs::write(dir.join(name), blob).unwrap();
}

fn scene_with_mesh(positions_len: usize) -> String {
    format!(
        r#"["s72-v1",
            {{"type":"SCENE","name":"s","roots":[2]}},
            {{"type":"NODE","name":"n","mesh":3}},
            {{"type":"MESH","name":"m","topology":"TRIANGLE_LIST","count":{positions_len},
              "attributes":{{
                "POSITION":{{"src":"m.b72","offset":0,"stride":28,"format":"R32G32B32_SFLOAT"}},
                "NORMAL":{{"offset":12,"format":"R32G32B32_SFLOAT"}},
                "COLOR":{{"offset":24,"format":"R8G8B8A8_UNORM"}}}}}}]"#
    )
}

fn load(dir: &PathBuf, text: &str) -> (SceneGraph, MeshStore) {
    let doc = Document::from_text(text, dir.clone()).unwrap();
    let mut meshes = MeshStore::new();
    let mut materials = MaterialRegistry::new();
    let mut graph = SceneGraph::build(&doc, &mut meshes, &mut materials).unwrap();
    graph.update(0.0, &mut meshes);
    (graph, meshes)
}

// ============================================================================
// Lane synthesis
// ============================================================================

#[test]
fn missing_lanes_are_synthesized() {
    let dir = fixture_dir("pad");
    let tri = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    write_b72(&dir, "m.b72", &tri);

    let (_, meshes) = load(&dir, &scene_with_mesh(3));
    let mesh = meshes.get(0);

    assert_eq!(mesh.layout.stride, 52);
    assert_eq!(mesh.layout.tangent.offset, 24);
    assert_eq!(mesh.layout.texcoord.offset, 40);
    assert_eq!(mesh.layout.color.offset, 48);
    assert_eq!(mesh.layout.tangent.format, VertexFormat::R32g32b32a32Sfloat);
    assert_eq!(mesh.layout.texcoord.format, VertexFormat::R32g32Sfloat);
    assert_eq!(mesh.blob.len(), 3 * 52);

    // The padding bytes are zero; the color lane survives the rewrite.
    for v in 0..3 {
        let base = v * 52;
        assert!(mesh.blob[base + 24..base + 48].iter().all(|&b| b == 0));
        assert_eq!(&mesh.blob[base + 48..base + 52], &[10, 20, 30, 255]);
    }
}

// ============================================================================
// AABB
// ============================================================================

#[test]
fn aabb_bounds_every_vertex() {
    let dir = fixture_dir("aabb");
    let positions = [
        [-1.0, 2.0, 0.5],
        [3.0, -4.0, 0.0],
        [0.0, 0.0, -7.5],
        [2.0, 2.0, 2.0],
    ];
    write_b72(&dir, "m.b72", &positions);

    let (_, meshes) = load(&dir, &scene_with_mesh(4));
    let aabb = meshes.get(0).aabb;

    assert!((aabb.min - Vec3::new(-1.0, -4.0, -7.5)).length() < EPSILON);
    assert!((aabb.max - Vec3::new(3.0, 2.0, 2.0)).length() < EPSILON);
    for p in positions {
        assert!(aabb.contains(Vec3::from_array(p)));
    }
}

// ============================================================================
// Enumerations
// ============================================================================

#[test]
fn topology_strings_map() {
    assert_eq!(Topology::from_str("POINT_LIST").unwrap(), Topology::PointList);
    assert_eq!(
        Topology::from_str("TRIANGLE_STRIP").unwrap(),
        Topology::TriangleStrip
    );
    assert_eq!(
        Topology::from_str("TRIANGLE_LIST_WITH_ADJACENCY").unwrap(),
        Topology::TriangleListWithAdjacency
    );
    assert_eq!(Topology::from_str("PATCH_LIST").unwrap(), Topology::PatchList);
    assert!(Topology::from_str("HEPTAGON_LIST").is_err());
}

#[test]
fn format_strings_map() {
    assert_eq!(
        VertexFormat::from_str("R32G32B32_SFLOAT").unwrap().byte_size(),
        12
    );
    assert_eq!(
        VertexFormat::from_str("R32G32_SFLOAT").unwrap().byte_size(),
        8
    );
    assert_eq!(
        VertexFormat::from_str("R8G8B8A8_UNORM").unwrap().byte_size(),
        4
    );
    assert!(VertexFormat::from_str("R5G5B5_WEIRD").is_err());
}

// ============================================================================
// Visibility refresh
// ============================================================================

#[test]
fn culling_none_aliases_instances() {
    let dir = fixture_dir("visnone");
    write_b72(&dir, "m.b72", &[[0.0, 0.0, 0.0]]);
    let (graph, mut meshes) = load(&dir, &scene_with_mesh(1));

    let camera = &graph.cameras[USER_CAMERA];
    meshes.refresh_visibility(CullingMode::None, &camera.frustum(), camera.view_matrix());
    assert_eq!(meshes.get(0).visible.len(), meshes.get(0).instances.len());
}

#[test]
fn frustum_culling_drops_out_of_view_instances() {
    let dir = fixture_dir("visfrustum");
    // A unit-ish triangle around the origin.
    write_b72(
        &dir,
        "m.b72",
        &[[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]],
    );
    let (graph, mut meshes) = load(&dir, &scene_with_mesh(3));

    // The user camera sits at (0,-10,0) looking at the origin. One instance
    // at the origin is visible; one 10 units behind the camera is not.
    let camera = &graph.cameras[USER_CAMERA];
    let behind = camera.position - camera.direction * 10.0;
    meshes.clear_instances();
    meshes.push_instance(0, Mat4::IDENTITY);
    meshes.push_instance(0, Mat4::from_translation(behind));

    meshes.refresh_visibility(CullingMode::Frustum, &camera.frustum(), camera.view_matrix());
    assert_eq!(meshes.get(0).visible.len(), 1);
}
