//! Source scene description consumed by the importer.
//!
//! Loaders turn an on-disk scene into a [`SourceScene`]: an owned node tree,
//! triangulated meshes and raw material properties. Everything downstream of
//! this module only ever sees a `SourceScene`.

#[cfg(feature = "gltf")]
pub mod gltf;
pub mod obj;
pub mod postprocess;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec2, Vec3};
use rootcause::Report;
use thiserror::Error;

use crate::types::SkeletalVertex;

pub use postprocess::PostProcess;

/// Errors raised while loading a source scene.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("unsupported scene format: {0:?}")]
    UnsupportedFormat(String),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("glTF error: {0}")]
    Gltf(String),
    #[error("mesh {mesh:?} has no vertex positions")]
    MissingPositions { mesh: String },
    #[error("line {line}: {detail}")]
    Obj { line: usize, detail: String },
}

/// Scene file formats with a loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneFormat {
    Gltf,
    Obj,
}

impl SceneFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "gltf" | "glb" => Some(SceneFormat::Gltf),
            "obj" => Some(SceneFormat::Obj),
            _ => None,
        }
    }
}

/// Texture slots a material may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TextureSlot {
    Diffuse,
    /// glTF's combined metallic-roughness texture.
    Unknown,
    Shininess,
    Ambient,
    Normals,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMaterial {
    pub name: String,
    /// Texture references exactly as written in the source file.
    pub textures: BTreeMap<TextureSlot, String>,
    pub diffuse_color: Option<[f32; 4]>,
    pub metallic_factor: Option<f32>,
    pub roughness_factor: Option<f32>,
}

impl SourceMaterial {
    pub fn texture(&self, slot: TextureSlot) -> Option<&str> {
        self.textures.get(&slot).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TangentFrame {
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

/// A triangulated mesh with a single material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    /// Empty when the source has no normals.
    pub normals: Vec<Vec3>,
    pub tangents: Option<Vec<TangentFrame>>,
    /// First texture coordinate set.
    pub tex_coords: Option<Vec<Vec2>>,
    pub skin: Option<Vec<SkeletalVertex>>,
    pub faces: Vec<[u32; 3]>,
    pub material_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceNode {
    pub name: String,
    /// Local transform relative to the parent.
    pub transform: Mat4,
    /// Indices into [`SourceScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SourceNode>,
}

impl SourceNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceScene {
    pub root: SourceNode,
    pub meshes: Vec<SourceMesh>,
    pub materials: Vec<SourceMaterial>,
}

/// Load `path` with the loader matching its extension and apply `post_process`.
pub fn load_scene(
    path: &Path,
    post_process: &PostProcess,
) -> Result<SourceScene, Report<SceneError>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    let mut scene = match SceneFormat::from_extension(extension) {
        Some(SceneFormat::Gltf) => load_gltf(path)?,
        Some(SceneFormat::Obj) => obj::load(path)?,
        None => {
            return Err(Report::new(SceneError::UnsupportedFormat(
                extension.to_string(),
            )));
        }
    };

    post_process.apply(&mut scene);
    Ok(scene)
}

#[cfg(feature = "gltf")]
fn load_gltf(path: &Path) -> Result<SourceScene, Report<SceneError>> {
    gltf::load(path)
}

#[cfg(not(feature = "gltf"))]
fn load_gltf(_path: &Path) -> Result<SourceScene, Report<SceneError>> {
    Err(Report::new(SceneError::UnsupportedFormat(
        "gltf (built without the `gltf` feature)".to_string(),
    )))
}
