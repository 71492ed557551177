//! Scene import: load, extract the hierarchy, resolve materials, flatten.

pub mod flatten;
pub mod hierarchy;
pub mod material;

use std::path::Path;
use std::time::Instant;

use bon::Builder;
use rootcause::Report;
use tracing::{debug, info};

use crate::error::PackError;
use crate::scene::{self, PostProcess, SourceScene};
use crate::types::ImportResult;

pub use flatten::{FlattenedMeshes, flatten_meshes, submesh_name};
pub use hierarchy::extract_hierarchy;
pub use material::{MaterialConvention, resolve_material};

/// Knobs for [`MeshImporter::import_mesh`].
#[derive(Builder, Debug, Clone, Default)]
pub struct ImportOptions {
    /// Overrides the convention inferred from the file extension.
    convention: Option<MaterialConvention>,
    #[builder(default)]
    post_process: PostProcess,
}

impl ImportOptions {
    pub fn convention(&self) -> Option<MaterialConvention> {
        self.convention
    }

    pub fn post_process(&self) -> &PostProcess {
        &self.post_process
    }
}

/// Turns a scene file into an [`ImportResult`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshImporter;

impl MeshImporter {
    /// Import the scene at `path`.
    ///
    /// Paths beginning with `//` are rejected before any loading happens.
    /// Nothing is returned unless every stage succeeds.
    pub fn import_mesh(
        &self,
        path: impl AsRef<Path>,
        options: &ImportOptions,
    ) -> Result<ImportResult, Report<PackError>> {
        let path = path.as_ref();
        let started = Instant::now();

        let display = path.to_string_lossy();
        if display.starts_with("//") {
            return Err(Report::new(PackError::InvalidPath {
                path: display.into_owned(),
            }));
        }

        let scene = scene::load_scene(path, options.post_process())
            .map_err(|e| Report::new(PackError::import_failure(path, e)))?;

        let name = scene_name(path);
        let convention = options.convention().unwrap_or_else(|| {
            MaterialConvention::from_extension(
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .unwrap_or_default(),
            )
        });
        debug!("importing {:?} as {:?} with {:?}", path, name, convention);

        let result = build_import_result(&scene, &name, &materials_directory(path), convention)
            .map_err(|e| Report::new(PackError::import_failure(path, e)))?;

        info!(
            "imported {:?}: {} submeshes, {} vertices, {} indices, {} materials in {:.2?}",
            name,
            result.submeshes.len(),
            result.vertices.len(),
            result.indices.len(),
            result.materials.len(),
            started.elapsed()
        );
        Ok(result)
    }
}

/// Run the extraction stages over an already loaded scene.
///
/// Fails only when the flattened buffers would not be addressable with
/// 32-bit counts.
pub fn build_import_result(
    scene: &SourceScene,
    name: &str,
    materials_dir: &str,
    convention: MaterialConvention,
) -> Result<ImportResult, String> {
    let vertex_total: u64 = scene.meshes.iter().map(|m| m.positions.len() as u64).sum();
    let index_total: u64 = scene.meshes.iter().map(|m| m.faces.len() as u64 * 3).sum();
    if vertex_total > u64::from(u32::MAX) || index_total > u64::from(u32::MAX) {
        return Err(format!(
            "scene too large: {vertex_total} vertices and {index_total} indices exceed 32-bit counts"
        ));
    }

    let hierarchy = extract_hierarchy(scene, name);
    let materials: Vec<_> = scene
        .materials
        .iter()
        .map(|material| resolve_material(material, materials_dir, convention))
        .collect();
    let FlattenedMeshes {
        vertices,
        skeletal_vertices,
        indices,
        submeshes,
        extents,
    } = flatten_meshes(scene, &materials);

    Ok(ImportResult {
        name: name.to_string(),
        hierarchy,
        vertices,
        skeletal_vertices,
        indices,
        submeshes,
        materials,
        extents,
    })
}

/// File stem of `path`, used as the hierarchy root name.
pub fn scene_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory containing `path` with `/` separators and a trailing `/`, or an
/// empty string when `path` has no parent.
pub fn materials_directory(path: &Path) -> String {
    let parent = path
        .parent()
        .map(|dir| dir.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    if parent.is_empty() || parent.ends_with('/') {
        parent
    } else {
        format!("{parent}/")
    }
}
