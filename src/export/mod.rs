//! Writes an [`ImportResult`] to disk as one container file per submesh plus
//! sibling material files.
//!
//! Given an output directory `out`, mesh files go to `out/<scene>/` and
//! material files to `out/Materials/`, parallel to the mesh directory.

pub mod container;
#[cfg(feature = "json")]
pub mod metadata;

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bon::Builder;
use itertools::Itertools;
use rootcause::Report;
use tracing::{debug, info, warn};

use crate::error::PackError;
use crate::types::ImportResult;

/// Subdirectory of the output directory that receives material files.
/// Sits next to the per-scene mesh directory.
pub const MATERIALS_DIRECTORY: &str = "Materials";
pub const MESH_EXTENSION: &str = "mesh";
pub const MATERIAL_EXTENSION: &str = "material";

#[derive(Builder, Debug, Clone)]
pub struct ExportOptions {
    /// Must exist, along with its `Materials` and [`mesh_directory`] subdirectories.
    #[builder(into)]
    output_directory: PathBuf,
    /// Accepted but not applied: the version 1 container is uncompressed.
    #[builder(default)]
    use_compression: bool,
    /// Also write `<scene>.meta.json` (requires the `json` feature).
    #[builder(default)]
    output_metadata: bool,
}

impl ExportOptions {
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn use_compression(&self) -> bool {
        self.use_compression
    }

    pub fn output_metadata(&self) -> bool {
        self.output_metadata
    }
}

/// Every path written by an export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportSummary {
    /// Parallel to [`ImportResult::submeshes`].
    pub mesh_files: Vec<PathBuf>,
    pub material_files: Vec<PathBuf>,
    pub metadata_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MeshExporter;

impl MeshExporter {
    /// Write every submesh and referenced material of `result`.
    ///
    /// Aborts on the first file that cannot be opened or written. Files
    /// written before the failure are left in place.
    pub fn export_mesh(
        &self,
        result: &ImportResult,
        options: &ExportOptions,
    ) -> Result<ExportSummary, Report<PackError>> {
        let started = Instant::now();
        let output_directory = options.output_directory();
        let mut summary = ExportSummary::default();

        if options.use_compression() {
            warn!("compression requested but the container format has no compressed variant; writing uncompressed");
        }

        let scene_directory = mesh_directory(output_directory, &result.name);
        let mut taken = HashSet::new();
        for (i, submesh) in result.submeshes.iter().enumerate() {
            let stem = unique_stem(&mut taken, submesh.name.as_str(), "submesh", i);
            let path = scene_directory.join(format!("{stem}.{MESH_EXTENSION}"));
            write_file(&path, |out| container::write_mesh_file(out, result, submesh))?;
            summary.mesh_files.push(path);
        }

        if !result.materials.is_empty() {
            let materials_directory = output_directory.join(MATERIALS_DIRECTORY);
            let mut taken = HashSet::new();
            let referenced = result
                .submeshes
                .iter()
                .map(|submesh| submesh.material_index as usize)
                .unique();

            for index in referenced {
                let Some(material) = result.materials.get(index) else {
                    warn!("submesh references missing material {index}; no material file written");
                    continue;
                };
                let stem = unique_stem(&mut taken, material.name.as_str(), "material", index);
                let path = materials_directory.join(format!("{stem}.{MATERIAL_EXTENSION}"));
                write_file(&path, |out| container::write_material_file(out, material))?;
                summary.material_files.push(path);
            }
        }

        if options.output_metadata() {
            summary.metadata_file = write_metadata(result, output_directory, &summary.mesh_files)?;
        }

        info!(
            "exported {:?}: {} mesh files, {} material files to {:?} in {:.2?}",
            result.name,
            summary.mesh_files.len(),
            summary.material_files.len(),
            output_directory,
            started.elapsed()
        );
        Ok(summary)
    }
}

/// Directory under `output_directory` that receives the mesh files of the
/// scene named `scene_name`.
pub fn mesh_directory(output_directory: &Path, scene_name: &str) -> PathBuf {
    output_directory.join(scene_stem(scene_name))
}

fn scene_stem(scene_name: &str) -> String {
    let stem = sanitize_file_name(scene_name);
    if stem.is_empty() { "scene".to_string() } else { stem }
}

/// Replace characters that cannot appear in a file name.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// File stem for `name` that no earlier call with the same `taken` set has
/// returned. Collisions are suffixed with `_<index>`, then `_<index>_<n>`.
fn unique_stem(taken: &mut HashSet<String>, name: &str, fallback: &str, index: usize) -> String {
    let mut stem = sanitize_file_name(name);
    if stem.is_empty() {
        stem = format!("{fallback}_{index}");
    }
    if taken.insert(stem.clone()) {
        return stem;
    }

    let mut renamed = format!("{stem}_{index}");
    let mut attempt = 1usize;
    while !taken.insert(renamed.clone()) {
        renamed = format!("{stem}_{index}_{attempt}");
        attempt += 1;
    }
    warn!("output name {stem:?} is already used; writing {renamed:?} instead");
    renamed
}

fn write_file(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>,
) -> Result<(), Report<PackError>> {
    let file = File::create(path).map_err(|source| {
        Report::new(PackError::ExportOpen {
            path: path.to_path_buf(),
            source,
        })
    })?;
    let mut out = BufWriter::new(file);
    write(&mut out).and_then(|()| out.flush()).map_err(|source| {
        Report::new(PackError::Io {
            path: path.to_path_buf(),
            source,
        })
    })?;
    debug!("wrote {:?}", path);
    Ok(())
}

#[cfg(feature = "json")]
fn write_metadata(
    result: &ImportResult,
    output_directory: &Path,
    mesh_files: &[PathBuf],
) -> Result<Option<PathBuf>, Report<PackError>> {
    let value = metadata::describe_export(result, mesh_files)
        .map_err(|e| Report::new(PackError::Metadata(e.to_string())))?;
    let path = output_directory.join(format!("{}.meta.json", scene_stem(&result.name)));
    write_file(&path, |out| {
        serde_json::to_writer_pretty(&mut *out, &value).map_err(io::Error::from)
    })?;
    Ok(Some(path))
}

#[cfg(not(feature = "json"))]
fn write_metadata(
    _result: &ImportResult,
    _output_directory: &Path,
    _mesh_files: &[PathBuf],
) -> Result<Option<PathBuf>, Report<PackError>> {
    warn!("metadata output requested but meshpack was built without the `json` feature");
    Ok(None)
}

#[cfg(test)]
mod test {
    use glam::{Vec2, Vec3};

    use super::*;
    use crate::types::{
        Channel, Extents, MaterialData, Name, Node, NodeKind, SubMesh, TexturePath, Vertex,
    };

    fn unique_dir(tag: &str) -> PathBuf {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("meshpack_export_{tag}_{id}"));
        std::fs::create_dir_all(dir.join(MATERIALS_DIRECTORY)).unwrap();
        std::fs::create_dir_all(dir.join("scene")).unwrap();
        dir
    }

    fn material(name: &str) -> MaterialData {
        MaterialData {
            name: Name::new(name),
            albedo: Channel::Texture(TexturePath::new("albedo.png")),
            roughness: Channel::Factor(0.25),
            metallic: Channel::Factor(1.0),
            normal: Channel::Absent,
        }
    }

    fn submesh(name: &str, base_vertex: u32, vertex_count: u32, material_index: u32) -> SubMesh {
        SubMesh {
            material_index,
            index_count: 3,
            vertex_count,
            base_vertex,
            base_index: base_vertex,
            extents: Extents::default(),
            name: Name::new(name),
            material_name: Name::default(),
        }
    }

    /// Three submeshes, the first and last sharing material 1.
    fn sample_result() -> ImportResult {
        let vertices = (0..9)
            .map(|i| Vertex {
                position: Vec3::splat(i as f32),
                uv: Vec2::ONE,
                ..Default::default()
            })
            .collect();
        ImportResult {
            name: "scene".to_string(),
            hierarchy: Node::new("scene", NodeKind::Transform),
            vertices,
            skeletal_vertices: Vec::new(),
            indices: vec![0, 1, 2, 0, 1, 2, 0, 1, 2],
            submeshes: vec![
                submesh("body", 0, 3, 1),
                submesh("wheel", 3, 3, 0),
                submesh("trim", 6, 3, 1),
            ],
            materials: vec![material("Rubber"), material("Paint")],
            extents: Extents::default(),
        }
    }

    #[test]
    fn writes_one_file_per_submesh_and_material() {
        let dir = unique_dir("files");
        let options = ExportOptions::builder().output_directory(&dir).build();
        let summary = MeshExporter.export_mesh(&sample_result(), &options).unwrap();

        assert_eq!(
            summary.mesh_files,
            vec![
                dir.join("scene/body.mesh"),
                dir.join("scene/wheel.mesh"),
                dir.join("scene/trim.mesh"),
            ]
        );
        // Materials sit next to the mesh directory, not inside it.
        assert_eq!(
            summary.mesh_files[0].parent().and_then(Path::parent),
            summary.material_files[0].parent().and_then(Path::parent)
        );
        assert_eq!(
            summary.material_files,
            vec![
                dir.join("Materials/Paint.material"),
                dir.join("Materials/Rubber.material"),
            ]
        );
        for path in summary.mesh_files.iter().chain(&summary.material_files) {
            assert!(path.is_file(), "{path:?} missing");
        }
        assert_eq!(summary.metadata_file, None);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn written_files_decode() {
        let dir = unique_dir("decode");
        let result = sample_result();
        let options = ExportOptions::builder().output_directory(&dir).build();
        let summary = MeshExporter.export_mesh(&result, &options).unwrap();

        let wheel = container::decode_mesh_file(&std::fs::read(&summary.mesh_files[1]).unwrap()).unwrap();
        assert_eq!(wheel.header.name.as_str(), "wheel");
        assert_eq!(wheel.header.mesh_count, 3);
        assert_eq!(wheel.vertices, result.vertices[3..6]);

        let paint =
            container::decode_material_file(&std::fs::read(&summary.material_files[0]).unwrap())
                .unwrap();
        assert_eq!(paint, result.materials[1]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn compression_flag_still_writes_plain_container() {
        let dir = unique_dir("compress");
        let result = sample_result();
        let options = ExportOptions::builder()
            .output_directory(&dir)
            .use_compression(true)
            .build();
        let summary = MeshExporter.export_mesh(&result, &options).unwrap();

        let mut expected = Vec::new();
        container::write_mesh_file(&mut expected, &result, &result.submeshes[0]).unwrap();
        assert_eq!(std::fs::read(&summary.mesh_files[0]).unwrap(), expected);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn duplicate_names_do_not_overwrite() {
        let dir = unique_dir("dupes");
        let mut result = sample_result();
        result.submeshes[2].name = Name::new("body");
        let options = ExportOptions::builder().output_directory(&dir).build();
        let summary = MeshExporter.export_mesh(&result, &options).unwrap();

        assert_eq!(summary.mesh_files[0], dir.join("scene/body.mesh"));
        assert_eq!(summary.mesh_files[2], dir.join("scene/body_2.mesh"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_materials_directory_aborts_after_mesh_files() {
        let dir = unique_dir("nomat");
        std::fs::remove_dir(dir.join(MATERIALS_DIRECTORY)).unwrap();
        let options = ExportOptions::builder().output_directory(&dir).build();

        let err = MeshExporter.export_mesh(&sample_result(), &options).unwrap_err();
        assert!(matches!(err.current_context(), PackError::ExportOpen { .. }));
        // Earlier files are not rolled back.
        assert!(dir.join("scene/body.mesh").is_file());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_output_directory_fails_on_first_file() {
        let dir = std::env::temp_dir().join("meshpack_export_does_not_exist/nested");
        let options = ExportOptions::builder().output_directory(&dir).build();
        let err = MeshExporter.export_mesh(&sample_result(), &options).unwrap_err();
        assert!(matches!(err.current_context(), PackError::ExportOpen { .. }));
    }

    #[test]
    fn scene_without_materials_writes_no_material_files() {
        let dir = unique_dir("nomaterials");
        let mut result = sample_result();
        result.materials.clear();
        let options = ExportOptions::builder().output_directory(&dir).build();
        let summary = MeshExporter.export_mesh(&result, &options).unwrap();
        assert_eq!(summary.mesh_files.len(), 3);
        assert!(summary.material_files.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn renamed_stems_never_collide_with_real_names() {
        let mut taken = HashSet::new();
        let first = unique_stem(&mut taken, "x", "submesh", 0);
        let second = unique_stem(&mut taken, "x_2", "submesh", 1);
        let third = unique_stem(&mut taken, "x", "submesh", 2);
        assert_eq!(first, "x");
        assert_eq!(second, "x_2");
        assert_eq!(third, "x_2_1");
    }

    #[test]
    fn colliding_submesh_names_write_distinct_files() {
        let dir = unique_dir("renamed");
        let mut result = sample_result();
        result.submeshes[0].name = Name::new("x");
        result.submeshes[1].name = Name::new("x_2");
        result.submeshes[2].name = Name::new("x");
        let options = ExportOptions::builder().output_directory(&dir).build();
        let summary = MeshExporter.export_mesh(&result, &options).unwrap();

        let unique: HashSet<_> = summary.mesh_files.iter().collect();
        assert_eq!(unique.len(), 3);
        let second = container::decode_mesh_file(&std::fs::read(&summary.mesh_files[1]).unwrap())
            .unwrap();
        assert_eq!(second.header.name.as_str(), "x_2");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn mesh_directory_is_named_after_the_scene() {
        let out = Path::new("out");
        assert_eq!(mesh_directory(out, "car"), out.join("car"));
        assert_eq!(mesh_directory(out, "a/b"), out.join("a_b"));
        assert_eq!(mesh_directory(out, ""), out.join("scene"));
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_file_name("Default Material"), "Default Material");
    }

    #[cfg(feature = "json")]
    #[test]
    fn metadata_sidecar_is_written_on_request() {
        let dir = unique_dir("meta");
        let options = ExportOptions::builder()
            .output_directory(&dir)
            .output_metadata(true)
            .build();
        let summary = MeshExporter.export_mesh(&sample_result(), &options).unwrap();

        let path = summary.metadata_file.unwrap();
        assert_eq!(path, dir.join("scene.meta.json"));
        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["submeshes"].as_array().map(Vec::len), Some(3));

        std::fs::remove_dir_all(&dir).ok();
    }
}
