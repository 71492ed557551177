//! JSON sidecar describing an export.

use std::path::PathBuf;

use serde_json::{Value, json};

use crate::types::{Channel, FactorValue, ImportResult, MaterialData};

fn channel_json<F: FactorValue>(channel: &Channel<F>) -> Value {
    match channel {
        Channel::Absent => json!({ "kind": "absent" }),
        Channel::Texture(path) => json!({ "kind": "texture", "path": path.as_str() }),
        Channel::Factor(value) => json!({ "kind": "factor", "value": value.to_lanes() }),
    }
}

fn material_json(material: &MaterialData) -> Value {
    json!({
        "name": material.name.as_str(),
        "albedo": channel_json(&material.albedo),
        "roughness": channel_json(&material.roughness),
        "metallic": channel_json(&material.metallic),
        "normal": channel_json(&material.normal),
    })
}

/// Describe `result` and the mesh files written for it.
///
/// `mesh_files` is parallel to `result.submeshes`.
pub fn describe_export(
    result: &ImportResult,
    mesh_files: &[PathBuf],
) -> Result<Value, serde_json::Error> {
    let submeshes: Vec<Value> = result
        .submeshes
        .iter()
        .zip(mesh_files)
        .map(|(submesh, file)| {
            json!({
                "name": submesh.name.as_str(),
                "file": file.file_name().map(|name| name.to_string_lossy()),
                "material_index": submesh.material_index,
                "material_name": submesh.material_name.as_str(),
                "vertex_count": submesh.vertex_count,
                "index_count": submesh.index_count,
                "base_vertex": submesh.base_vertex,
                "base_index": submesh.base_index,
                "extents": submesh.extents,
            })
        })
        .collect();

    Ok(json!({
        "name": result.name,
        "hierarchy": serde_json::to_value(&result.hierarchy)?,
        "extents": result.extents,
        "vertex_count": result.vertices.len(),
        "skeletal_vertex_count": result.skeletal_vertices.len(),
        "index_count": result.indices.len(),
        "submeshes": submeshes,
        "materials": result.materials.iter().map(material_json).collect::<Vec<_>>(),
    }))
}
