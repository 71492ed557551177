//! Geometry clean-up applied to every loaded mesh before flattening.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use super::{SourceMesh, SourceScene, TangentFrame};

/// Post-processing steps requested from the loaders.
///
/// Triangulation always happens inside the loaders. Mesh optimisation and
/// cache-locality reordering are not performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcess {
    /// Generate area-weighted vertex normals for meshes without normals.
    pub gen_smooth_normals: bool,
    /// Derive tangents and bitangents from UVs for meshes without tangents.
    pub calc_tangent_space: bool,
    /// Merge vertices whose attributes are bit-identical.
    pub join_identical_vertices: bool,
    /// Replace `v` with `1 - v` in the first UV set.
    pub flip_uvs: bool,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            gen_smooth_normals: true,
            calc_tangent_space: true,
            join_identical_vertices: true,
            flip_uvs: false,
        }
    }
}

impl PostProcess {
    pub fn apply(&self, scene: &mut SourceScene) {
        for mesh in &mut scene.meshes {
            self.apply_to_mesh(mesh);
        }
    }

    pub fn apply_to_mesh(&self, mesh: &mut SourceMesh) {
        if self.flip_uvs {
            flip_uvs(mesh);
        }
        if self.gen_smooth_normals && mesh.normals.len() != mesh.positions.len() {
            gen_smooth_normals(mesh);
        }
        if self.calc_tangent_space && mesh.tangents.is_none() {
            calc_tangent_space(mesh);
        }
        if self.join_identical_vertices {
            join_identical_vertices(mesh);
        }
    }
}

fn flip_uvs(mesh: &mut SourceMesh) {
    if let Some(tex_coords) = &mut mesh.tex_coords {
        for uv in tex_coords {
            uv.y = 1.0 - uv.y;
        }
    }
}

/// Faces with an index outside the position buffer.
fn valid_faces(mesh: &SourceMesh) -> impl Iterator<Item = [usize; 3]> + '_ {
    let count = mesh.positions.len();
    mesh.faces
        .iter()
        .map(|face| face.map(|i| i as usize))
        .filter(move |face| face.iter().all(|&i| i < count))
}

fn gen_smooth_normals(mesh: &mut SourceMesh) {
    let mut accumulated = vec![Vec3::ZERO; mesh.positions.len()];
    for [a, b, c] in valid_faces(mesh) {
        let p = &mesh.positions;
        // Cross product length is twice the triangle area, which weights the sum.
        let face_normal = (p[b] - p[a]).cross(p[c] - p[a]);
        accumulated[a] += face_normal;
        accumulated[b] += face_normal;
        accumulated[c] += face_normal;
    }

    mesh.normals = accumulated
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
        .collect();
}

fn calc_tangent_space(mesh: &mut SourceMesh) {
    let Some(tex_coords) = &mesh.tex_coords else {
        return;
    };
    if tex_coords.len() != mesh.positions.len() || mesh.normals.len() != mesh.positions.len() {
        return;
    }

    let mut tangents = vec![Vec3::ZERO; mesh.positions.len()];
    let mut bitangents = vec![Vec3::ZERO; mesh.positions.len()];
    for [a, b, c] in valid_faces(mesh) {
        let p = &mesh.positions;
        let edge1 = p[b] - p[a];
        let edge2 = p[c] - p[a];
        let duv1 = tex_coords[b] - tex_coords[a];
        let duv2 = tex_coords[c] - tex_coords[a];

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;
        for i in [a, b, c] {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
        }
    }

    let frames = mesh
        .normals
        .iter()
        .zip(tangents.into_iter().zip(bitangents))
        .map(|(&n, (t, b))| {
            let tangent = (t - n * n.dot(t))
                .try_normalize()
                .unwrap_or_else(|| n.any_orthonormal_vector());
            let bitangent = (b - n * n.dot(b) - tangent * tangent.dot(b))
                .try_normalize()
                .unwrap_or_else(|| n.cross(tangent));
            TangentFrame { tangent, bitangent }
        })
        .collect();
    mesh.tangents = Some(frames);
}

fn vec3_bits(v: Vec3) -> [u32; 3] {
    v.to_array().map(f32::to_bits)
}

fn vec2_bits(v: Vec2) -> [u32; 2] {
    v.to_array().map(f32::to_bits)
}

/// Bit-exact attribute key for one vertex.
fn vertex_key(mesh: &SourceMesh, i: usize) -> Vec<u32> {
    let mut key = Vec::with_capacity(24);
    key.extend(vec3_bits(mesh.positions[i]));
    if let Some(n) = mesh.normals.get(i) {
        key.extend(vec3_bits(*n));
    }
    if let Some(frame) = mesh.tangents.as_ref().and_then(|t| t.get(i)) {
        key.extend(vec3_bits(frame.tangent));
        key.extend(vec3_bits(frame.bitangent));
    }
    if let Some(uv) = mesh.tex_coords.as_ref().and_then(|t| t.get(i)) {
        key.extend(vec2_bits(*uv));
    }
    if let Some(skin) = mesh.skin.as_ref().and_then(|s| s.get(i)) {
        key.extend(skin.bone_indices);
        key.extend(skin.bone_weights.map(f32::to_bits));
    }
    key
}

fn join_identical_vertices(mesh: &mut SourceMesh) {
    let count = mesh.positions.len();
    let mut first_seen: HashMap<Vec<u32>, u32> = HashMap::with_capacity(count);
    let mut kept: Vec<usize> = Vec::with_capacity(count);
    let mut remap: Vec<u32> = Vec::with_capacity(count);

    for i in 0..count {
        let next = kept.len() as u32;
        let target = *first_seen.entry(vertex_key(mesh, i)).or_insert(next);
        if target == next {
            kept.push(i);
        }
        remap.push(target);
    }

    if kept.len() == count {
        return;
    }

    fn gather<T: Copy>(values: &[T], kept: &[usize]) -> Vec<T> {
        kept.iter().filter_map(|&i| values.get(i).copied()).collect()
    }

    mesh.positions = gather(&mesh.positions, &kept);
    if !mesh.normals.is_empty() {
        mesh.normals = gather(&mesh.normals, &kept);
    }
    if let Some(tangents) = &mut mesh.tangents {
        *tangents = gather(tangents, &kept);
    }
    if let Some(tex_coords) = &mut mesh.tex_coords {
        *tex_coords = gather(tex_coords, &kept);
    }
    if let Some(skin) = &mut mesh.skin {
        *skin = gather(skin, &kept);
    }
    for face in &mut mesh.faces {
        for index in face.iter_mut() {
            if let Some(&mapped) = remap.get(*index as usize) {
                *index = mapped;
            }
        }
    }
}
