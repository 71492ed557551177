//! In-memory representation of a flattened scene, shared by the importer and exporter.

use std::convert::Infallible;
use std::ops::Range;

use glam::{Quat, Vec2, Vec3};

use crate::fixed_str::FixedStr;

/// Byte size of every bounded name field (submesh, material, mesh header).
pub const NAME_CAPACITY: usize = 150;
/// Byte size of a bounded texture path field.
pub const TEXTURE_PATH_CAPACITY: usize = 256;

pub type Name = FixedStr<NAME_CAPACITY>;
pub type TexturePath = FixedStr<TEXTURE_PATH_CAPACITY>;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub uv: Vec2,
}

/// Skinning data, parallel to the vertex buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SkeletalVertex {
    pub bone_indices: [u32; 4],
    pub bone_weights: [f32; 4],
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Extents {
    pub min: Vec3,
    pub max: Vec3,
}

impl Extents {
    pub fn from_point(point: Vec3) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&mut self, other: &Extents) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Bounds of `points`, or `None` when there are none.
    pub fn of_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let mut extents = Extents::from_point(points.next()?);
        for point in points {
            extents.include(point);
        }
        Some(extents)
    }
}

/// A contiguous range of the unified vertex/index buffers drawn with one material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubMesh {
    pub material_index: u32,
    pub index_count: u32,
    pub vertex_count: u32,
    /// Offset of the first vertex in [`ImportResult::vertices`].
    pub base_vertex: u32,
    /// Offset of the first index in [`ImportResult::indices`].
    pub base_index: u32,
    /// Zeroed for a submesh without vertices.
    pub extents: Extents,
    pub name: Name,
    pub material_name: Name,
}

impl SubMesh {
    pub fn vertex_range(&self) -> Range<usize> {
        let start = self.base_vertex as usize;
        start..start + self.vertex_count as usize
    }

    pub fn index_range(&self) -> Range<usize> {
        let start = self.base_index as usize;
        start..start + self.index_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }
}

/// Resolved state of one material property slot.
///
/// Exactly one source is authoritative: a texture reference, a constant
/// factor, or nothing at all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Channel<F> {
    Absent,
    Texture(TexturePath),
    Factor(F),
}

impl<F> Channel<F> {
    pub fn texture(&self) -> Option<&TexturePath> {
        match self {
            Channel::Texture(path) => Some(path),
            _ => None,
        }
    }

    pub fn factor(&self) -> Option<&F> {
        match self {
            Channel::Factor(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Channel::Absent)
    }
}

/// Constant values a [`Channel`] can fall back to, packed into four float lanes on disk.
pub trait FactorValue: Copy {
    fn to_lanes(self) -> [f32; 4];
    fn from_lanes(lanes: [f32; 4]) -> Option<Self>;
}

impl FactorValue for [f32; 4] {
    fn to_lanes(self) -> [f32; 4] {
        self
    }

    fn from_lanes(lanes: [f32; 4]) -> Option<Self> {
        Some(lanes)
    }
}

impl FactorValue for f32 {
    fn to_lanes(self) -> [f32; 4] {
        [self, 0.0, 0.0, 0.0]
    }

    fn from_lanes(lanes: [f32; 4]) -> Option<Self> {
        Some(lanes[0])
    }
}

/// Channels that can never hold a factor (the normal map).
impl FactorValue for Infallible {
    fn to_lanes(self) -> [f32; 4] {
        match self {}
    }

    fn from_lanes(_lanes: [f32; 4]) -> Option<Self> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub name: Name,
    pub albedo: Channel<[f32; 4]>,
    pub roughness: Channel<f32>,
    pub metallic: Channel<f32>,
    pub normal: Channel<Infallible>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NodeKind {
    #[cfg_attr(feature = "serde", serde(rename = "$MESH"))]
    Mesh,
    #[cfg_attr(feature = "serde", serde(rename = "$TRANSFORM"))]
    Transform,
}

/// One entry of the scene hierarchy. Children are owned by their parent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub children: Vec<Node>,
}

impl Node {
    /// A childless node with an identity transform.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }
}

/// The flattened scene produced by [`crate::import::MeshImporter`].
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub name: String,
    pub hierarchy: Node,
    pub vertices: Vec<Vertex>,
    /// Empty unless the scene is skinned; otherwise as long as `vertices`.
    pub skeletal_vertices: Vec<SkeletalVertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubMesh>,
    pub materials: Vec<MaterialData>,
    /// Union of all non-empty submesh extents.
    pub extents: Extents,
}
