//! Concatenates per-mesh attribute arrays into unified buffers.
//!
//! Submesh `i` owns `vertices[base_vertex..base_vertex + vertex_count]` and
//! `indices[base_index..base_index + index_count]`. Indices stay local to the
//! submesh: index `0` refers to the submesh's first vertex.

use glam::Vec3;

use crate::scene::{SourceMesh, SourceScene, TangentFrame};
use crate::types::{Extents, MaterialData, Name, SkeletalVertex, SubMesh, Vertex};

/// Unified buffers for every mesh of a scene, in source order.
#[derive(Debug, Clone, Default)]
pub struct FlattenedMeshes {
    pub vertices: Vec<Vertex>,
    /// Empty when no mesh carries skin data.
    pub skeletal_vertices: Vec<SkeletalVertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubMesh>,
    pub extents: Extents,
}

/// Name of the submesh built from `mesh_name`, falling back to `submesh_<index>`.
pub fn submesh_name(mesh_name: &str, index: usize) -> String {
    if mesh_name.is_empty() {
        format!("submesh_{index}")
    } else {
        mesh_name.to_string()
    }
}

/// Tangent flipped so that `(tangent, bitangent, normal)` is right-handed.
fn oriented_tangent(normal: Vec3, frame: &TangentFrame) -> Vec3 {
    if normal.cross(frame.tangent).dot(frame.bitangent) < 0.0 {
        -frame.tangent
    } else {
        frame.tangent
    }
}

fn flatten_vertex(mesh: &SourceMesh, i: usize, position: Vec3) -> Vertex {
    let normal = mesh.normals.get(i).copied().unwrap_or_default();
    let tangent = mesh
        .tangents
        .as_ref()
        .and_then(|frames| frames.get(i))
        .map(|frame| oriented_tangent(normal, frame))
        .unwrap_or_default();
    let uv = mesh
        .tex_coords
        .as_ref()
        .and_then(|uvs| uvs.get(i))
        .copied()
        .unwrap_or_default();

    Vertex {
        position,
        normal,
        tangent,
        uv,
    }
}

/// Flatten `scene.meshes` into one vertex and one index buffer.
///
/// Callers must ensure the total vertex and index counts fit in `u32`.
/// `materials` is indexed by each mesh's material index to fill in
/// [`SubMesh::material_name`].
pub fn flatten_meshes(scene: &SourceScene, materials: &[MaterialData]) -> FlattenedMeshes {
    let mut submeshes = Vec::with_capacity(scene.meshes.len());
    let mut vertex_total = 0u32;
    let mut index_total = 0u32;

    for (i, mesh) in scene.meshes.iter().enumerate() {
        let vertex_count = mesh.positions.len() as u32;
        let index_count = mesh.faces.len() as u32 * 3;
        let material_name = materials
            .get(mesh.material_index)
            .map(|material| material.name)
            .unwrap_or_default();

        submeshes.push(SubMesh {
            material_index: mesh.material_index as u32,
            index_count,
            vertex_count,
            base_vertex: vertex_total,
            base_index: index_total,
            extents: Extents::default(),
            name: Name::new(&submesh_name(&mesh.name, i)),
            material_name,
        });

        vertex_total += vertex_count;
        index_total += index_count;
    }

    let skinned = scene.meshes.iter().any(|mesh| mesh.skin.is_some());
    let mut vertices = Vec::with_capacity(vertex_total as usize);
    let mut skeletal_vertices = Vec::with_capacity(if skinned { vertex_total as usize } else { 0 });
    let mut indices = Vec::with_capacity(index_total as usize);

    for (mesh, submesh) in scene.meshes.iter().zip(&mut submeshes) {
        let mut extents: Option<Extents> = None;
        for (i, &position) in mesh.positions.iter().enumerate() {
            extents = Some(match extents {
                Some(mut bounds) => {
                    bounds.include(position);
                    bounds
                }
                None => Extents::from_point(position),
            });
            vertices.push(flatten_vertex(mesh, i, position));

            if skinned {
                let skin = mesh.skin.as_ref().and_then(|skin| skin.get(i));
                skeletal_vertices.push(skin.copied().unwrap_or_default());
            }
        }
        submesh.extents = extents.unwrap_or_default();

        indices.extend(mesh.faces.iter().flatten().copied());
    }

    let extents = submeshes
        .iter()
        .filter(|submesh| !submesh.is_empty())
        .map(|submesh| submesh.extents)
        .reduce(|mut total, extents| {
            total.union(&extents);
            total
        })
        .unwrap_or_default();

    FlattenedMeshes {
        vertices,
        skeletal_vertices,
        indices,
        submeshes,
        extents,
    }
}
