//! Versioned binary container for meshes and materials.
//!
//! All values are little-endian and sections follow each other without
//! padding. A mesh file is:
//!
//! | section | size |
//! |---|---|
//! | [`BinaryFileHeader`] | 10 |
//! | [`BinaryMeshHeader`] | 198 |
//! | vertices | `vertex_count * 44` |
//! | skeletal vertices | `skeletal_vertex_count * 32` |
//! | indices | `index_count * 4` |
//!
//! A material file is a [`BinaryFileHeader`] followed by one
//! [`MATERIAL_RECORD_SIZE`]-byte record.

use std::convert::Infallible;
use std::io::{self, Write};

use glam::{Vec2, Vec3};
use rootcause::Report;
use thiserror::Error;
use winnow::Parser;
use winnow::binary::{le_f32, le_u8, le_u32};
use winnow::combinator::repeat;
use winnow::error::ContextError;
use winnow::token::take;

use crate::fixed_str::{FixedStr, FixedStrError};
use crate::types::{
    Channel, Extents, FactorValue, ImportResult, MaterialData, NAME_CAPACITY, Name,
    SkeletalVertex, SubMesh, TEXTURE_PATH_CAPACITY, TexturePath, Vertex,
};

type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

pub const MAGIC: [u8; 8] = *b"MESHPACK";
pub const FORMAT_VERSION: u8 = 1;

pub const FILE_HEADER_SIZE: usize = 10;
pub const MESH_HEADER_SIZE: usize = 5 * 4 + 6 * 4 + NAME_CAPACITY + 4;
pub const VERTEX_SIZE: usize = 11 * 4;
pub const SKELETAL_VERTEX_SIZE: usize = 8 * 4;
pub const INDEX_SIZE: usize = 4;
const CHANNEL_SIZE: usize = 1 + 4 * 4 + TEXTURE_PATH_CAPACITY;
pub const MATERIAL_RECORD_SIZE: usize = NAME_CAPACITY + 4 * CHANNEL_SIZE;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("bad magic {0:02X?}")]
    BadMagic([u8; 8]),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("unknown asset type {0}")]
    UnknownAssetType(u8),
    #[error("expected a {expected:?} asset, found {found:?}")]
    UnexpectedAssetType { expected: AssetType, found: AssetType },
    #[error("truncated {section}: need {needed} bytes, have {available}")]
    Truncated {
        section: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("{0} trailing bytes after the last section")]
    TrailingBytes(usize),
    #[error("invalid {field} field: {source}")]
    InvalidName {
        field: &'static str,
        #[source]
        source: FixedStrError,
    },
    #[error("invalid kind {kind} for the {channel} channel")]
    InvalidChannelKind { channel: &'static str, kind: u8 },
    #[error("winnow parse error at 0x{offset:X}: {detail}")]
    WinnowError { offset: usize, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AssetType {
    Mesh = 0,
    Material = 1,
}

impl TryFrom<u8> for AssetType {
    type Error = ContainerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AssetType::Mesh),
            1 => Ok(AssetType::Material),
            other => Err(ContainerError::UnknownAssetType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryFileHeader {
    pub magic: [u8; 8],
    pub version: u8,
    pub asset_type: AssetType,
}

impl BinaryFileHeader {
    pub fn new(asset_type: AssetType) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            asset_type,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.magic);
        out.push(self.version);
        out.push(self.asset_type as u8);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMeshHeader {
    /// Submeshes in the whole scene.
    pub mesh_count: u32,
    /// Materials in the whole scene.
    pub material_count: u32,
    pub vertex_count: u32,
    pub skeletal_vertex_count: u32,
    pub index_count: u32,
    /// Extents of this submesh only.
    pub extents: Extents,
    pub name: Name,
    pub material_index: u32,
}

impl BinaryMeshHeader {
    pub fn for_submesh(result: &ImportResult, submesh: &SubMesh) -> Self {
        Self {
            mesh_count: result.submeshes.len() as u32,
            material_count: result.materials.len() as u32,
            vertex_count: submesh.vertex_count,
            skeletal_vertex_count: result.skeletal_vertices.len() as u32,
            index_count: submesh.index_count,
            extents: submesh.extents,
            name: submesh.name,
            material_index: submesh.material_index,
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        for count in [
            self.mesh_count,
            self.material_count,
            self.vertex_count,
            self.skeletal_vertex_count,
            self.index_count,
        ] {
            out.extend_from_slice(&count.to_le_bytes());
        }
        put_vec3(out, self.extents.min);
        put_vec3(out, self.extents.max);
        out.extend_from_slice(self.name.as_bytes());
        out.extend_from_slice(&self.material_index.to_le_bytes());
    }
}

fn put_f32s(out: &mut Vec<u8>, values: impl IntoIterator<Item = f32>) {
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
}

fn put_vec3(out: &mut Vec<u8>, v: Vec3) {
    put_f32s(out, v.to_array());
}

fn encode_vertex(out: &mut Vec<u8>, vertex: &Vertex) {
    put_vec3(out, vertex.position);
    put_vec3(out, vertex.normal);
    put_vec3(out, vertex.tangent);
    put_f32s(out, vertex.uv.to_array());
}

fn encode_skeletal_vertex(out: &mut Vec<u8>, vertex: &SkeletalVertex) {
    for index in vertex.bone_indices {
        out.extend_from_slice(&index.to_le_bytes());
    }
    put_f32s(out, vertex.bone_weights);
}

/// Write the mesh file for one submesh of `result`.
///
/// The skeletal buffer is written whole, not sliced to the submesh. Fails
/// with [`io::ErrorKind::InvalidInput`] if the submesh ranges fall outside
/// the result's buffers.
pub fn write_mesh_file(
    out: &mut impl Write,
    result: &ImportResult,
    submesh: &SubMesh,
) -> io::Result<()> {
    let out_of_range = |what: &str| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{what} range of submesh {:?} is outside the flattened buffers",
                submesh.name
            ),
        )
    };
    let vertices = result
        .vertices
        .get(submesh.vertex_range())
        .ok_or_else(|| out_of_range("vertex"))?;
    let indices = result
        .indices
        .get(submesh.index_range())
        .ok_or_else(|| out_of_range("index"))?;

    let mut header = Vec::with_capacity(FILE_HEADER_SIZE + MESH_HEADER_SIZE);
    BinaryFileHeader::new(AssetType::Mesh).encode(&mut header);
    BinaryMeshHeader::for_submesh(result, submesh).encode(&mut header);
    out.write_all(&header)?;

    let mut payload = Vec::with_capacity(vertices.len() * VERTEX_SIZE);
    for vertex in vertices {
        encode_vertex(&mut payload, vertex);
    }
    out.write_all(&payload)?;

    payload.clear();
    for vertex in &result.skeletal_vertices {
        encode_skeletal_vertex(&mut payload, vertex);
    }
    out.write_all(&payload)?;

    payload.clear();
    for index in indices {
        payload.extend_from_slice(&index.to_le_bytes());
    }
    out.write_all(&payload)
}

const CHANNEL_ABSENT: u8 = 0;
const CHANNEL_TEXTURE: u8 = 1;
const CHANNEL_FACTOR: u8 = 2;

fn encode_channel<F: FactorValue>(out: &mut Vec<u8>, channel: &Channel<F>) {
    let (kind, lanes, path) = match channel {
        Channel::Absent => (CHANNEL_ABSENT, [0.0; 4], TexturePath::default()),
        Channel::Texture(path) => (CHANNEL_TEXTURE, [0.0; 4], *path),
        Channel::Factor(value) => (CHANNEL_FACTOR, value.to_lanes(), TexturePath::default()),
    };
    out.push(kind);
    put_f32s(out, lanes);
    out.extend_from_slice(path.as_bytes());
}

pub fn write_material_file(out: &mut impl Write, material: &MaterialData) -> io::Result<()> {
    let mut data = Vec::with_capacity(FILE_HEADER_SIZE + MATERIAL_RECORD_SIZE);
    BinaryFileHeader::new(AssetType::Material).encode(&mut data);
    data.extend_from_slice(material.name.as_bytes());
    encode_channel(&mut data, &material.albedo);
    encode_channel(&mut data, &material.roughness);
    encode_channel(&mut data, &material.metallic);
    encode_channel(&mut data, &material.normal);
    out.write_all(&data)
}

/// A decoded mesh file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshFile {
    pub file_header: BinaryFileHeader,
    pub header: BinaryMeshHeader,
    pub vertices: Vec<Vertex>,
    pub skeletal_vertices: Vec<SkeletalVertex>,
    pub indices: Vec<u32>,
}

fn parse_fixed<const N: usize>(input: &mut &[u8]) -> WResult<[u8; N]> {
    let bytes: &[u8] = take(N).parse_next(input)?;
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

fn parse_vec3(input: &mut &[u8]) -> WResult<Vec3> {
    let x = le_f32.parse_next(input)?;
    let y = le_f32.parse_next(input)?;
    let z = le_f32.parse_next(input)?;
    Ok(Vec3::new(x, y, z))
}

fn parse_lanes(input: &mut &[u8]) -> WResult<[f32; 4]> {
    Ok([
        le_f32.parse_next(input)?,
        le_f32.parse_next(input)?,
        le_f32.parse_next(input)?,
        le_f32.parse_next(input)?,
    ])
}

fn parse_file_header_fields(input: &mut &[u8]) -> WResult<([u8; 8], u8, u8)> {
    let magic = parse_fixed::<8>.parse_next(input)?;
    let version = le_u8.parse_next(input)?;
    let asset_type = le_u8.parse_next(input)?;
    Ok((magic, version, asset_type))
}

/// Raw mesh header; the name is validated separately.
fn parse_mesh_header_fields(
    input: &mut &[u8],
) -> WResult<([u32; 5], Extents, [u8; NAME_CAPACITY], u32)> {
    let mut counts = [0u32; 5];
    for count in &mut counts {
        *count = le_u32.parse_next(input)?;
    }
    let min = parse_vec3(input)?;
    let max = parse_vec3(input)?;
    let name = parse_fixed::<NAME_CAPACITY>.parse_next(input)?;
    let material_index = le_u32.parse_next(input)?;
    Ok((counts, Extents { min, max }, name, material_index))
}

fn parse_vertex(input: &mut &[u8]) -> WResult<Vertex> {
    let position = parse_vec3(input)?;
    let normal = parse_vec3(input)?;
    let tangent = parse_vec3(input)?;
    let u = le_f32.parse_next(input)?;
    let v = le_f32.parse_next(input)?;
    Ok(Vertex {
        position,
        normal,
        tangent,
        uv: Vec2::new(u, v),
    })
}

fn parse_skeletal_vertex(input: &mut &[u8]) -> WResult<SkeletalVertex> {
    let mut bone_indices = [0u32; 4];
    for index in &mut bone_indices {
        *index = le_u32.parse_next(input)?;
    }
    let bone_weights = parse_lanes(input)?;
    Ok(SkeletalVertex {
        bone_indices,
        bone_weights,
    })
}

fn parse_channel_fields(input: &mut &[u8]) -> WResult<(u8, [f32; 4], [u8; TEXTURE_PATH_CAPACITY])> {
    let kind = le_u8.parse_next(input)?;
    let lanes = parse_lanes(input)?;
    let path = parse_fixed::<TEXTURE_PATH_CAPACITY>.parse_next(input)?;
    Ok((kind, lanes, path))
}

struct Decoder<'a> {
    data: &'a [u8],
    input: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, input: data }
    }

    fn offset(&self) -> usize {
        self.data.len() - self.input.len()
    }

    fn require(&self, section: &'static str, needed: usize) -> Result<(), Report<ContainerError>> {
        if self.input.len() < needed {
            return Err(Report::new(ContainerError::Truncated {
                section,
                needed,
                available: self.input.len(),
            }));
        }
        Ok(())
    }

    fn parse<T>(
        &mut self,
        section: &'static str,
        size: usize,
        mut parser: impl FnMut(&mut &'a [u8]) -> WResult<T>,
    ) -> Result<T, Report<ContainerError>> {
        self.require(section, size)?;
        let offset = self.offset();
        parser(&mut self.input).map_err(|e| {
            Report::new(ContainerError::WinnowError {
                offset,
                detail: format!("{e}"),
            })
        })
    }

    fn parse_many<T>(
        &mut self,
        section: &'static str,
        count: usize,
        element_size: usize,
        parser: fn(&mut &'a [u8]) -> WResult<T>,
    ) -> Result<Vec<T>, Report<ContainerError>> {
        let needed = count.checked_mul(element_size).ok_or_else(|| {
            Report::new(ContainerError::Truncated {
                section,
                needed: usize::MAX,
                available: self.input.len(),
            })
        })?;
        self.parse(section, needed, |input| repeat(count, parser).parse_next(input))
    }

    fn file_header(&mut self, expected: AssetType) -> Result<BinaryFileHeader, Report<ContainerError>> {
        let (magic, version, asset_type) =
            self.parse("file header", FILE_HEADER_SIZE, parse_file_header_fields)?;
        if magic != MAGIC {
            return Err(Report::new(ContainerError::BadMagic(magic)));
        }
        if version != FORMAT_VERSION {
            return Err(Report::new(ContainerError::UnsupportedVersion(version)));
        }
        let found = AssetType::try_from(asset_type).map_err(Report::new)?;
        if found != expected {
            return Err(Report::new(ContainerError::UnexpectedAssetType { expected, found }));
        }
        Ok(BinaryFileHeader {
            magic,
            version,
            asset_type: found,
        })
    }

    fn finish(&self) -> Result<(), Report<ContainerError>> {
        if self.input.is_empty() {
            Ok(())
        } else {
            Err(Report::new(ContainerError::TrailingBytes(self.input.len())))
        }
    }
}

fn fixed_str<const N: usize>(
    field: &'static str,
    bytes: [u8; N],
) -> Result<FixedStr<N>, Report<ContainerError>> {
    FixedStr::from_bytes(bytes)
        .map_err(|source| Report::new(ContainerError::InvalidName { field, source }))
}

pub fn decode_mesh_file(data: &[u8]) -> Result<MeshFile, Report<ContainerError>> {
    let mut decoder = Decoder::new(data);
    let file_header = decoder.file_header(AssetType::Mesh)?;

    let (counts, extents, name, material_index) =
        decoder.parse("mesh header", MESH_HEADER_SIZE, parse_mesh_header_fields)?;
    let [mesh_count, material_count, vertex_count, skeletal_vertex_count, index_count] = counts;
    let header = BinaryMeshHeader {
        mesh_count,
        material_count,
        vertex_count,
        skeletal_vertex_count,
        index_count,
        extents,
        name: fixed_str("mesh name", name)?,
        material_index,
    };

    let vertices = decoder.parse_many("vertices", vertex_count as usize, VERTEX_SIZE, parse_vertex)?;
    let skeletal_vertices = decoder.parse_many(
        "skeletal vertices",
        skeletal_vertex_count as usize,
        SKELETAL_VERTEX_SIZE,
        parse_skeletal_vertex,
    )?;
    let indices = decoder.parse_many("indices", index_count as usize, INDEX_SIZE, |input| {
        le_u32.parse_next(input)
    })?;
    decoder.finish()?;

    Ok(MeshFile {
        file_header,
        header,
        vertices,
        skeletal_vertices,
        indices,
    })
}

fn decode_channel<F: FactorValue>(
    channel: &'static str,
    (kind, lanes, path): (u8, [f32; 4], [u8; TEXTURE_PATH_CAPACITY]),
) -> Result<Channel<F>, Report<ContainerError>> {
    let invalid = || Report::new(ContainerError::InvalidChannelKind { channel, kind });
    match kind {
        CHANNEL_ABSENT => Ok(Channel::Absent),
        CHANNEL_TEXTURE => Ok(Channel::Texture(fixed_str("texture path", path)?)),
        CHANNEL_FACTOR => F::from_lanes(lanes).map(Channel::Factor).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

pub fn decode_material_file(data: &[u8]) -> Result<MaterialData, Report<ContainerError>> {
    let mut decoder = Decoder::new(data);
    decoder.file_header(AssetType::Material)?;
    decoder.require("material record", MATERIAL_RECORD_SIZE)?;

    let name = decoder.parse("material name", NAME_CAPACITY, parse_fixed::<NAME_CAPACITY>)?;
    let albedo = decoder.parse("albedo channel", CHANNEL_SIZE, parse_channel_fields)?;
    let roughness = decoder.parse("roughness channel", CHANNEL_SIZE, parse_channel_fields)?;
    let metallic = decoder.parse("metallic channel", CHANNEL_SIZE, parse_channel_fields)?;
    let normal = decoder.parse("normal channel", CHANNEL_SIZE, parse_channel_fields)?;
    decoder.finish()?;

    Ok(MaterialData {
        name: fixed_str("material name", name)?,
        albedo: decode_channel::<[f32; 4]>("albedo", albedo)?,
        roughness: decode_channel::<f32>("roughness", roughness)?,
        metallic: decode_channel::<f32>("metallic", metallic)?,
        normal: decode_channel::<Infallible>("normal", normal)?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{Node, NodeKind};

    fn sample_result() -> ImportResult {
        let vertices: Vec<Vertex> = (0..7)
            .map(|i| Vertex {
                position: Vec3::new(i as f32, -(i as f32), 0.5),
                normal: Vec3::Z,
                tangent: Vec3::X,
                uv: Vec2::new(0.25 * i as f32, 1.0),
            })
            .collect();
        let first = SubMesh {
            material_index: 0,
            index_count: 3,
            vertex_count: 3,
            base_vertex: 0,
            base_index: 0,
            extents: Extents {
                min: Vec3::new(0.0, -2.0, 0.5),
                max: Vec3::new(2.0, 0.0, 0.5),
            },
            name: Name::new("hull"),
            material_name: Name::new("Steel"),
        };
        let second = SubMesh {
            material_index: 0,
            index_count: 6,
            vertex_count: 4,
            base_vertex: 3,
            base_index: 3,
            extents: Extents {
                min: Vec3::new(3.0, -6.0, 0.5),
                max: Vec3::new(6.0, -3.0, 0.5),
            },
            name: Name::new(&"x".repeat(400)),
            material_name: Name::new("Steel"),
        };
        ImportResult {
            name: "ship".to_string(),
            hierarchy: Node::new("ship", NodeKind::Transform),
            vertices,
            skeletal_vertices: Vec::new(),
            indices: vec![0, 1, 2, 0, 1, 2, 0, 2, 3],
            submeshes: vec![first, second],
            materials: vec![steel()],
            extents: Extents {
                min: Vec3::new(0.0, -6.0, 0.5),
                max: Vec3::new(6.0, 0.0, 0.5),
            },
        }
    }

    fn steel() -> MaterialData {
        MaterialData {
            name: Name::new("Steel"),
            albedo: Channel::Texture(TexturePath::new("textures/steel.png")),
            roughness: Channel::Factor(0.25),
            metallic: Channel::Factor(1.0),
            normal: Channel::Absent,
        }
    }

    fn encode_submesh(result: &ImportResult, index: usize) -> Vec<u8> {
        let mut data = Vec::new();
        write_mesh_file(&mut data, result, &result.submeshes[index]).unwrap();
        data
    }

    #[test]
    fn layout_sizes() {
        assert_eq!(MESH_HEADER_SIZE, 198);
        assert_eq!(VERTEX_SIZE, 44);
        assert_eq!(SKELETAL_VERTEX_SIZE, 32);
        assert_eq!(MATERIAL_RECORD_SIZE, 1242);
    }

    #[test]
    fn mesh_file_has_exact_section_sizes() {
        let result = sample_result();
        let data = encode_submesh(&result, 1);
        assert_eq!(data.len(), FILE_HEADER_SIZE + MESH_HEADER_SIZE + 4 * VERTEX_SIZE + 6 * INDEX_SIZE);
        assert_eq!(&data[..8], b"MESHPACK");
        assert_eq!(data[8], FORMAT_VERSION);
        assert_eq!(data[9], AssetType::Mesh as u8);
    }

    #[test]
    fn mesh_file_decodes_to_the_submesh_slices() {
        let result = sample_result();
        let decoded = decode_mesh_file(&encode_submesh(&result, 1)).unwrap();

        assert_eq!(decoded.file_header, BinaryFileHeader::new(AssetType::Mesh));
        assert_eq!(decoded.header.mesh_count, 2);
        assert_eq!(decoded.header.material_count, 1);
        assert_eq!(decoded.header.vertex_count, 4);
        assert_eq!(decoded.header.skeletal_vertex_count, 0);
        assert_eq!(decoded.header.index_count, 6);
        assert_eq!(decoded.header.extents, result.submeshes[1].extents);
        assert_eq!(decoded.header.material_index, 0);
        assert_eq!(decoded.vertices, result.vertices[3..7]);
        assert_eq!(decoded.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(decoded.skeletal_vertices.is_empty());
    }

    #[test]
    fn long_names_are_truncated_and_terminated() {
        let result = sample_result();
        let data = encode_submesh(&result, 1);
        let name_start = FILE_HEADER_SIZE + 5 * 4 + 6 * 4;
        let name_field = &data[name_start..name_start + NAME_CAPACITY];
        assert_eq!(name_field[NAME_CAPACITY - 1], 0);

        let decoded = decode_mesh_file(&data).unwrap();
        assert_eq!(decoded.header.name.as_str(), "x".repeat(NAME_CAPACITY - 1));
    }

    #[test]
    fn skeletal_buffer_is_written_whole() {
        let mut result = sample_result();
        result.skeletal_vertices = (0..7)
            .map(|i| SkeletalVertex {
                bone_indices: [i, 0, 0, 0],
                bone_weights: [1.0, 0.0, 0.0, 0.0],
            })
            .collect();

        let decoded = decode_mesh_file(&encode_submesh(&result, 0)).unwrap();
        assert_eq!(decoded.header.skeletal_vertex_count, 7);
        assert_eq!(decoded.skeletal_vertices, result.skeletal_vertices);
        assert_eq!(decoded.vertices.len(), 3);
    }

    #[test]
    fn out_of_range_submesh_is_rejected() {
        let mut result = sample_result();
        result.submeshes[1].vertex_count = 40;
        let mut data = Vec::new();
        let err = write_mesh_file(&mut data, &result, &result.submeshes[1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(data.is_empty());
    }

    #[test]
    fn corrupt_headers_are_rejected() {
        let result = sample_result();
        let data = encode_submesh(&result, 0);

        let mut bad_magic = data.clone();
        bad_magic[0] = b'X';
        assert!(matches!(
            decode_mesh_file(&bad_magic).unwrap_err().current_context(),
            ContainerError::BadMagic(_)
        ));

        let mut bad_version = data.clone();
        bad_version[8] = 2;
        assert!(matches!(
            decode_mesh_file(&bad_version).unwrap_err().current_context(),
            ContainerError::UnsupportedVersion(2)
        ));

        assert!(matches!(
            decode_material_file(&data).unwrap_err().current_context(),
            ContainerError::UnexpectedAssetType { .. }
        ));

        assert!(matches!(
            decode_mesh_file(&data[..data.len() - 1]).unwrap_err().current_context(),
            ContainerError::Truncated { section: "indices", .. }
        ));

        let mut trailing = data.clone();
        trailing.push(0);
        assert!(matches!(
            decode_mesh_file(&trailing).unwrap_err().current_context(),
            ContainerError::TrailingBytes(1)
        ));
    }

    #[test]
    fn unterminated_name_is_rejected() {
        let result = sample_result();
        let mut data = encode_submesh(&result, 0);
        let name_start = FILE_HEADER_SIZE + 5 * 4 + 6 * 4;
        data[name_start..name_start + NAME_CAPACITY].fill(b'a');
        assert!(matches!(
            decode_mesh_file(&data).unwrap_err().current_context(),
            ContainerError::InvalidName { .. }
        ));
    }

    #[test]
    fn material_file_roundtrip() {
        let mut data = Vec::new();
        write_material_file(&mut data, &steel()).unwrap();
        assert_eq!(data.len(), FILE_HEADER_SIZE + MATERIAL_RECORD_SIZE);
        assert_eq!(data[9], AssetType::Material as u8);

        let decoded = decode_material_file(&data).unwrap();
        assert_eq!(decoded, steel());
    }

    #[test]
    fn factor_on_normal_channel_is_rejected() {
        let mut data = Vec::new();
        write_material_file(&mut data, &steel()).unwrap();
        let normal_kind = FILE_HEADER_SIZE + NAME_CAPACITY + 3 * CHANNEL_SIZE;
        data[normal_kind] = CHANNEL_FACTOR;
        assert!(matches!(
            decode_material_file(&data).unwrap_err().current_context(),
            ContainerError::InvalidChannelKind { channel: "normal", .. }
        ));
    }
}
