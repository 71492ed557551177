//! glTF 2.0 loader.
//!
//! Buffers are loaded but images are not decoded: texture slots only need the
//! image reference. Each primitive becomes one [`SourceMesh`].

use std::collections::BTreeMap;
use std::path::Path;

use glam::{Mat4, Vec2, Vec3, Vec4};
use gltf::mesh::Mode;
use rootcause::Report;
use tracing::{debug, warn};

use super::{
    SceneError, SourceMaterial, SourceMesh, SourceNode, SourceScene, TangentFrame, TextureSlot,
};
use crate::types::SkeletalVertex;

pub fn load(path: &Path) -> Result<SourceScene, Report<SceneError>> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(path).map_err(|e| Report::new(SceneError::Gltf(e.to_string())))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .map_err(|e| Report::new(SceneError::Gltf(e.to_string())))?;

    let mut materials: Vec<SourceMaterial> = document.materials().map(convert_material).collect();
    let default_material = materials.len();
    let mut uses_default_material = false;

    let mut meshes = Vec::new();
    // glTF mesh index -> indices of the source meshes built from its primitives.
    let mut mesh_primitives: Vec<Vec<usize>> = Vec::with_capacity(document.meshes().len());

    for mesh in document.meshes() {
        let primitive_count = mesh.primitives().len();
        let mut built = Vec::with_capacity(primitive_count);

        for primitive in mesh.primitives() {
            let name = match mesh.name() {
                Some(name) if primitive_count == 1 => name.to_string(),
                Some(name) => format!("{name}_{}", primitive.index()),
                None => String::new(),
            };

            let reader = primitive.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));

            let positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or_else(|| {
                    Report::new(SceneError::MissingPositions {
                        mesh: name.clone(),
                    })
                })?
                .map(Vec3::from)
                .collect();

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            let Some(faces) = triangulate(primitive.mode(), &indices) else {
                warn!(
                    "skipping primitive {} of mesh {:?}: {:?} primitives carry no triangles",
                    primitive.index(),
                    mesh.name().unwrap_or_default(),
                    primitive.mode()
                );
                continue;
            };

            let normals: Vec<Vec3> = reader
                .read_normals()
                .map(|normals| normals.map(Vec3::from).collect())
                .unwrap_or_default();

            let tex_coords = reader
                .read_tex_coords(0)
                .map(|uvs| uvs.into_f32().map(Vec2::from).collect::<Vec<_>>());

            let tangents = match reader.read_tangents() {
                Some(tangents) if normals.len() == positions.len() => Some(
                    tangents
                        .zip(&normals)
                        .map(|(t, n)| {
                            let t = Vec4::from(t);
                            let tangent = t.truncate();
                            TangentFrame {
                                tangent,
                                bitangent: n.cross(tangent) * t.w,
                            }
                        })
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            };

            let skin = match (reader.read_joints(0), reader.read_weights(0)) {
                (Some(joints), Some(weights)) => Some(
                    joints
                        .into_u16()
                        .zip(weights.into_f32())
                        .map(|(joints, weights)| SkeletalVertex {
                            bone_indices: joints.map(u32::from),
                            bone_weights: weights,
                        })
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            };

            let material_index = primitive.material().index().unwrap_or_else(|| {
                uses_default_material = true;
                default_material
            });

            built.push(meshes.len());
            meshes.push(SourceMesh {
                name,
                positions,
                normals,
                tangents,
                tex_coords,
                skin,
                faces,
                material_index,
            });
        }

        mesh_primitives.push(built);
    }

    if uses_default_material {
        materials.push(SourceMaterial::default());
    }

    let mut root = SourceNode::new("Root");
    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        root.name = scene.name().unwrap_or("Root").to_string();
        root.children = scene
            .nodes()
            .map(|node| convert_node(node, &mesh_primitives))
            .collect();
    }

    debug!(
        "loaded glTF scene: {} meshes, {} materials, {} root nodes",
        meshes.len(),
        materials.len(),
        root.children.len()
    );

    Ok(SourceScene {
        root,
        meshes,
        materials,
    })
}

/// Triangle list for a primitive, or `None` for point and line primitives.
fn triangulate(mode: Mode, indices: &[u32]) -> Option<Vec<[u32; 3]>> {
    let faces = match mode {
        Mode::Triangles => indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect(),
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                if i % 2 == 0 {
                    [w[0], w[1], w[2]]
                } else {
                    [w[1], w[0], w[2]]
                }
            })
            .collect(),
        Mode::TriangleFan => match indices.split_first() {
            Some((&hub, rest)) => rest.windows(2).map(|w| [hub, w[0], w[1]]).collect(),
            None => Vec::new(),
        },
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip => return None,
    };
    Some(faces)
}

fn texture_reference(texture: gltf::Texture<'_>) -> String {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::Uri { uri, .. } => uri.to_string(),
        gltf::image::Source::View { .. } => format!("*{}", image.index()),
    }
}

fn convert_material(material: gltf::Material<'_>) -> SourceMaterial {
    let pbr = material.pbr_metallic_roughness();

    let mut textures = BTreeMap::new();
    if let Some(info) = pbr.base_color_texture() {
        textures.insert(TextureSlot::Diffuse, texture_reference(info.texture()));
    }
    if let Some(info) = pbr.metallic_roughness_texture() {
        textures.insert(TextureSlot::Unknown, texture_reference(info.texture()));
    }
    if let Some(normal) = material.normal_texture() {
        textures.insert(TextureSlot::Normals, texture_reference(normal.texture()));
    }

    SourceMaterial {
        name: material.name().unwrap_or_default().to_string(),
        textures,
        diffuse_color: Some(pbr.base_color_factor()),
        metallic_factor: Some(pbr.metallic_factor()),
        roughness_factor: Some(pbr.roughness_factor()),
    }
}

fn convert_node(node: gltf::Node<'_>, mesh_primitives: &[Vec<usize>]) -> SourceNode {
    SourceNode {
        name: node.name().unwrap_or_default().to_string(),
        transform: Mat4::from_cols_array_2d(&node.transform().matrix()),
        meshes: node
            .mesh()
            .and_then(|mesh| mesh_primitives.get(mesh.index()).cloned())
            .unwrap_or_default(),
        children: node
            .children()
            .map(|child| convert_node(child, mesh_primitives))
            .collect(),
    }
}
