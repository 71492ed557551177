//! Wavefront OBJ + MTL loader.
//!
//! A new source mesh starts at every `o`, `g` or `usemtl` statement. Polygons
//! are fan-triangulated and each distinct position/uv/normal triple becomes
//! one vertex. OBJ files carry no node hierarchy, so the root has no children.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3};
use rootcause::Report;
use tracing::{debug, warn};
use winnow::Parser;
use winnow::ascii::{dec_int, float, space0};
use winnow::combinator::{opt, preceded, repeat};
use winnow::error::{ContextError, ErrMode};

use super::{SceneError, SourceMaterial, SourceMesh, SourceNode, SourceScene, TextureSlot};

type WResult<T> = Result<T, ErrMode<ContextError>>;

/// One corner of a face, already resolved to zero-based indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Corner {
    position: usize,
    tex_coord: Option<usize>,
    normal: Option<usize>,
}

/// Corner as written: one-based, or negative for relative references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawCorner {
    position: i64,
    tex_coord: Option<i64>,
    normal: Option<i64>,
}

#[derive(Debug, Default)]
struct FaceGroup {
    name: String,
    material: Option<String>,
    faces: Vec<Vec<Corner>>,
}

#[derive(Debug, Default)]
struct ObjDocument {
    positions: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    normals: Vec<Vec3>,
    groups: Vec<FaceGroup>,
    material_libraries: Vec<String>,
}

impl ObjDocument {
    fn current_group(&mut self) -> &mut FaceGroup {
        if self.groups.is_empty() {
            self.groups.push(FaceGroup::default());
        }
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }

    /// Begin a new group, reusing the current one if it has no faces yet.
    fn start_group(&mut self, name: Option<&str>, material: Option<&str>) {
        let current = self.current_group();
        let name = name.map(str::to_string).unwrap_or_else(|| current.name.clone());
        let material = material
            .map(str::to_string)
            .or_else(|| current.material.clone());

        if current.faces.is_empty() {
            current.name = name;
            current.material = material;
        } else {
            self.groups.push(FaceGroup {
                name,
                material,
                faces: Vec::new(),
            });
        }
    }
}

fn number(input: &mut &str) -> WResult<f32> {
    preceded(space0, float).parse_next(input)
}

fn vec3(input: &mut &str) -> WResult<Vec3> {
    let x = number.parse_next(input)?;
    let y = number.parse_next(input)?;
    let z = number.parse_next(input)?;
    // Optional `w` or per-vertex color components.
    let _: () = repeat(0.., number).parse_next(input)?;
    Ok(Vec3::new(x, y, z))
}

fn tex_coord(input: &mut &str) -> WResult<Vec2> {
    let u = number.parse_next(input)?;
    let v = opt(number).parse_next(input)?.unwrap_or(0.0);
    let _: () = repeat(0.., number).parse_next(input)?;
    Ok(Vec2::new(u, v))
}

fn index(input: &mut &str) -> WResult<i64> {
    dec_int.parse_next(input)
}

fn corner(input: &mut &str) -> WResult<RawCorner> {
    let position = preceded(space0, index).parse_next(input)?;
    let mut tex_coord = None;
    let mut normal = None;
    if opt('/').parse_next(input)?.is_some() {
        tex_coord = opt(index).parse_next(input)?;
        if opt('/').parse_next(input)?.is_some() {
            normal = opt(index).parse_next(input)?;
        }
    }
    Ok(RawCorner {
        position,
        tex_coord,
        normal,
    })
}

fn face(input: &mut &str) -> WResult<Vec<RawCorner>> {
    repeat(1.., corner).parse_next(input)
}

/// Run `parser` over a statement's arguments, requiring it to consume them all.
fn parse_args<T>(
    args: &str,
    line: usize,
    mut parser: impl FnMut(&mut &str) -> WResult<T>,
) -> Result<T, Report<SceneError>> {
    let input = &mut args.trim();
    let value = parser(&mut *input).map_err(|e| {
        Report::new(SceneError::Obj {
            line,
            detail: format!("malformed arguments {args:?}: {e}"),
        })
    })?;
    if !input.trim().is_empty() {
        return Err(Report::new(SceneError::Obj {
            line,
            detail: format!("unexpected trailing input {:?}", input.trim()),
        }));
    }
    Ok(value)
}

/// Zero-based index for a one-based or relative OBJ reference into a list of `len` items.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    match index {
        i if i > 0 => {
            let i = (i - 1) as usize;
            (i < len).then_some(i)
        }
        i if i < 0 => len.checked_sub(i.unsigned_abs() as usize),
        _ => None,
    }
}

fn resolve_corner(
    raw: RawCorner,
    doc: &ObjDocument,
    line: usize,
) -> Result<Corner, Report<SceneError>> {
    let out_of_range = |what: &str, index: i64| {
        Report::new(SceneError::Obj {
            line,
            detail: format!("{what} index {index} out of range"),
        })
    };

    let position = resolve_index(raw.position, doc.positions.len())
        .ok_or_else(|| out_of_range("position", raw.position))?;
    let tex_coord = raw
        .tex_coord
        .map(|i| resolve_index(i, doc.tex_coords.len()).ok_or_else(|| out_of_range("uv", i)))
        .transpose()?;
    let normal = raw
        .normal
        .map(|i| resolve_index(i, doc.normals.len()).ok_or_else(|| out_of_range("normal", i)))
        .transpose()?;

    Ok(Corner {
        position,
        tex_coord,
        normal,
    })
}

/// Split a statement into its keyword and argument text, dropping comments.
fn statement(raw: &str) -> Option<(&str, &str)> {
    let line = raw.split('#').next().unwrap_or_default().trim();
    if line.is_empty() {
        return None;
    }
    Some(
        line.split_once(char::is_whitespace)
            .map(|(keyword, args)| (keyword, args.trim()))
            .unwrap_or((line, "")),
    )
}

fn parse_obj(text: &str) -> Result<ObjDocument, Report<SceneError>> {
    let mut doc = ObjDocument::default();

    for (line_index, raw) in text.lines().enumerate() {
        let line = line_index + 1;
        let Some((keyword, args)) = statement(raw) else {
            continue;
        };

        match keyword {
            "v" => doc.positions.push(parse_args(args, line, vec3)?),
            "vt" => doc.tex_coords.push(parse_args(args, line, tex_coord)?),
            "vn" => doc.normals.push(parse_args(args, line, vec3)?),
            "f" => {
                let corners = parse_args(args, line, face)?
                    .into_iter()
                    .map(|raw| resolve_corner(raw, &doc, line))
                    .collect::<Result<Vec<_>, _>>()?;
                doc.current_group().faces.push(corners);
            }
            "o" | "g" => doc.start_group(Some(args), None),
            "usemtl" => doc.start_group(None, Some(args)),
            "mtllib" => doc
                .material_libraries
                .extend(args.split_whitespace().map(str::to_string)),
            // Smoothing groups, lines, points and free-form geometry are ignored.
            _ => {}
        }
    }

    Ok(doc)
}

fn parse_mtl(text: &str) -> Result<Vec<SourceMaterial>, Report<SceneError>> {
    let mut materials: Vec<SourceMaterial> = Vec::new();

    for (line_index, raw) in text.lines().enumerate() {
        let line = line_index + 1;
        let Some((keyword, args)) = statement(raw) else {
            continue;
        };

        if keyword == "newmtl" {
            materials.push(SourceMaterial {
                name: args.to_string(),
                ..Default::default()
            });
            continue;
        }
        let Some(material) = materials.last_mut() else {
            continue;
        };

        let slot = match keyword {
            "Kd" => {
                match parse_args(args, line, vec3) {
                    Ok(color) => material.diffuse_color = Some(color.extend(1.0).to_array()),
                    Err(e) => warn!("skipping malformed Kd statement: {e}"),
                }
                continue;
            }
            "map_Kd" => TextureSlot::Diffuse,
            "map_Ns" => TextureSlot::Shininess,
            "map_Ka" => TextureSlot::Ambient,
            "map_Bump" | "map_bump" | "bump" | "norm" => TextureSlot::Normals,
            _ => continue,
        };
        // Texture options such as `-bm 0.5` precede the file name.
        if let Some(file) = args.split_whitespace().last() {
            material.textures.insert(slot, file.to_string());
        }
    }

    Ok(materials)
}

/// Resolves `usemtl` names to material indices, adding placeholders as needed.
struct MaterialTable {
    materials: Vec<SourceMaterial>,
    by_name: HashMap<String, usize>,
    default_index: Option<usize>,
}

impl MaterialTable {
    fn new(materials: Vec<SourceMaterial>) -> Self {
        let mut by_name = HashMap::new();
        for (i, material) in materials.iter().enumerate() {
            by_name.entry(material.name.clone()).or_insert(i);
        }
        Self {
            materials,
            by_name,
            default_index: None,
        }
    }

    fn index_of(&mut self, name: Option<&str>) -> usize {
        match name {
            Some(name) => {
                if let Some(&i) = self.by_name.get(name) {
                    return i;
                }
                warn!("material {name:?} is not defined in any material library");
                let i = self.materials.len();
                self.materials.push(SourceMaterial {
                    name: name.to_string(),
                    ..Default::default()
                });
                self.by_name.insert(name.to_string(), i);
                i
            }
            None => *self.default_index.get_or_insert_with(|| {
                self.materials.push(SourceMaterial::default());
                self.materials.len() - 1
            }),
        }
    }
}

fn build_mesh(group: &FaceGroup, doc: &ObjDocument, material_index: usize) -> SourceMesh {
    let corners = || group.faces.iter().flatten();
    let has_uvs = corners().any(|c| c.tex_coord.is_some());
    let has_normals = corners().all(|c| c.normal.is_some());

    let mut welded: HashMap<Corner, u32> = HashMap::new();
    let mut mesh = SourceMesh {
        name: group.name.clone(),
        tex_coords: has_uvs.then(Vec::new),
        material_index,
        ..Default::default()
    };

    let mut vertex = |corner: Corner, mesh: &mut SourceMesh| -> u32 {
        *welded.entry(corner).or_insert_with(|| {
            mesh.positions.push(doc.positions[corner.position]);
            if has_normals {
                let normal = corner.normal.map(|n| doc.normals[n]).unwrap_or_default();
                mesh.normals.push(normal);
            }
            if let Some(tex_coords) = &mut mesh.tex_coords {
                let uv = corner.tex_coord.map(|t| doc.tex_coords[t]).unwrap_or_default();
                tex_coords.push(uv);
            }
            (mesh.positions.len() - 1) as u32
        })
    };

    for polygon in &group.faces {
        if polygon.len() < 3 {
            continue;
        }
        let hub = vertex(polygon[0], &mut mesh);
        for pair in polygon[1..].windows(2) {
            let b = vertex(pair[0], &mut mesh);
            let c = vertex(pair[1], &mut mesh);
            mesh.faces.push([hub, b, c]);
        }
    }

    mesh
}

fn build_scene(
    doc: ObjDocument,
    materials: Vec<SourceMaterial>,
    root_name: &str,
) -> SourceScene {
    let mut table = MaterialTable::new(materials);
    let meshes: Vec<SourceMesh> = doc
        .groups
        .iter()
        .filter(|group| group.faces.iter().any(|polygon| polygon.len() >= 3))
        .map(|group| {
            let material_index = table.index_of(group.material.as_deref());
            build_mesh(group, &doc, material_index)
        })
        .collect();

    SourceScene {
        root: SourceNode::new(root_name),
        meshes,
        materials: table.materials,
    }
}

pub fn load(path: &Path) -> Result<SourceScene, Report<SceneError>> {
    let text = fs::read_to_string(path).map_err(|source| {
        Report::new(SceneError::Read {
            path: path.to_path_buf(),
            source,
        })
    })?;
    let doc = parse_obj(&text)?;

    let base = path.parent().unwrap_or(Path::new(""));
    let mut materials = Vec::new();
    for library in &doc.material_libraries {
        let library_path = base.join(library);
        match fs::read_to_string(&library_path) {
            Ok(text) => materials.extend(parse_mtl(&text)?),
            Err(e) => warn!("could not read material library {library_path:?}: {e}"),
        }
    }

    let scene = build_scene(doc, materials, "Root");
    debug!(
        "loaded OBJ scene: {} meshes, {} materials",
        scene.meshes.len(),
        scene.materials.len()
    );
    Ok(scene)
}
