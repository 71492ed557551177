use std::path::{Path, PathBuf};

use meshpack::error::PackError;
use meshpack::export::{ExportOptions, MATERIALS_DIRECTORY, MeshExporter, container, mesh_directory};
use meshpack::import::{ImportOptions, MeshImporter};
use meshpack::types::{Channel, NodeKind};

const SCENE_OBJ: &str = "\
mtllib scene.mtl
o Tri
v 0 0 0
v 1 0 0
v 0 1 0
usemtl Brick
f 1 2 3
o Quad
v 2 0 -1
v 3 0 -1
v 3 1 2
v 2 1 2
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 4/1 5/2 6/3 7/4
";

const SCENE_MTL: &str = "\
newmtl Brick
Kd 0.8 0.2 0.1
map_Kd textures\\brick.png
";

fn unique_dir(tag: &str) -> PathBuf {
    let id = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("meshpack_pipeline_{tag}_{id}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_scene(dir: &Path) -> PathBuf {
    std::fs::write(dir.join("scene.mtl"), SCENE_MTL).unwrap();
    let path = dir.join("scene.obj");
    std::fs::write(&path, SCENE_OBJ).unwrap();
    path
}

#[test]
fn obj_scene_round_trips_through_the_container() {
    let source_dir = unique_dir("source");
    let output_dir = unique_dir("output");
    std::fs::create_dir_all(output_dir.join(MATERIALS_DIRECTORY)).unwrap();

    let result = MeshImporter
        .import_mesh(write_scene(&source_dir), &ImportOptions::default())
        .unwrap();
    let scene_dir = mesh_directory(&output_dir, &result.name);
    assert_eq!(scene_dir, output_dir.join("scene"));
    std::fs::create_dir_all(&scene_dir).unwrap();

    assert_eq!(result.name, "scene");
    assert_eq!(result.hierarchy.name, "scene");
    let children: Vec<_> = result
        .hierarchy
        .children
        .iter()
        .map(|node| (node.name.as_str(), node.kind))
        .collect();
    assert_eq!(children, [("Tri", NodeKind::Mesh), ("Quad", NodeKind::Mesh)]);

    assert_eq!(result.submeshes.len(), 2);
    assert_eq!(result.submeshes[0].vertex_count, 3);
    assert_eq!(result.submeshes[1].vertex_count, 4);
    assert_eq!(result.submeshes[1].base_vertex, 3);
    assert_eq!(result.submeshes[1].base_index, 3);
    assert_eq!(result.submeshes[1].material_name.as_str(), "Brick");
    assert!(result.skeletal_vertices.is_empty());

    let brick = &result.materials[0];
    let expected_texture = format!(
        "{}/textures/brick.png",
        source_dir.to_string_lossy().replace('\\', "/")
    );
    assert_eq!(brick.albedo.texture().map(|p| p.as_str()), Some(expected_texture.as_str()));
    assert_eq!(brick.roughness, Channel::Factor(0.25));
    assert_eq!(brick.metallic, Channel::Factor(1.0));
    assert!(brick.normal.is_absent());

    let options = ExportOptions::builder().output_directory(&output_dir).build();
    let summary = MeshExporter.export_mesh(&result, &options).unwrap();
    assert_eq!(
        summary.mesh_files,
        vec![scene_dir.join("Tri.mesh"), scene_dir.join("Quad.mesh")]
    );
    assert_eq!(
        summary.material_files,
        vec![output_dir.join(MATERIALS_DIRECTORY).join("Brick.material")]
    );

    for (submesh, path) in result.submeshes.iter().zip(&summary.mesh_files) {
        let decoded = container::decode_mesh_file(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(decoded.header.mesh_count, 2);
        assert_eq!(decoded.header.material_count, 1);
        assert_eq!(decoded.header.vertex_count, submesh.vertex_count);
        assert_eq!(decoded.header.index_count, submesh.index_count);
        assert_eq!(decoded.header.name, submesh.name);
        assert_eq!(decoded.header.material_index, submesh.material_index);
        assert_eq!(
            decoded.header.extents.min.to_array().map(f32::to_bits),
            submesh.extents.min.to_array().map(f32::to_bits)
        );
        assert_eq!(
            decoded.header.extents.max.to_array().map(f32::to_bits),
            submesh.extents.max.to_array().map(f32::to_bits)
        );
        assert_eq!(decoded.vertices, result.vertices[submesh.vertex_range()]);
        assert_eq!(decoded.indices, result.indices[submesh.index_range()]);
        assert!(decoded.indices.iter().all(|&i| i < submesh.vertex_count));
    }

    let material =
        container::decode_material_file(&std::fs::read(&summary.material_files[0]).unwrap())
            .unwrap();
    assert_eq!(&material, brick);

    std::fs::remove_dir_all(&source_dir).ok();
    std::fs::remove_dir_all(&output_dir).ok();
}

#[test]
fn failed_import_produces_no_result() {
    let dir = unique_dir("missing");
    let err = MeshImporter
        .import_mesh(dir.join("nope.obj"), &ImportOptions::default())
        .unwrap_err();
    assert!(matches!(err.current_context(), PackError::ImportFailure { .. }));
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

    std::fs::remove_dir_all(&dir).ok();
}
