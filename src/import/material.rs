//! Resolves source materials into texture-or-factor channels.

use tracing::debug;

use crate::scene::{SourceMaterial, TextureSlot};
use crate::types::{Channel, MaterialData, Name, TexturePath};

/// Albedo used when a material has neither a diffuse texture nor a diffuse
/// color. Magenta, so untextured materials stand out.
pub const DEFAULT_ALBEDO: [f32; 4] = [1.0, 0.0, 1.0, 1.0];
pub const DEFAULT_ROUGHNESS: f32 = 0.25;
pub const DEFAULT_METALLIC: f32 = 1.0;
pub const DEFAULT_MATERIAL_NAME: &str = "Default Material";

/// How roughness and metallic values are laid out in the source material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bin", derive(clap::ValueEnum))]
pub enum MaterialConvention {
    /// One texture feeds both roughness and metallic (glTF).
    MetallicRoughness,
    /// Roughness comes from the shininess slot, metallic from the ambient slot.
    SpecularAmbient,
}

impl MaterialConvention {
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "gltf" | "glb" => MaterialConvention::MetallicRoughness,
            _ => MaterialConvention::SpecularAmbient,
        }
    }
}

/// Normalise a texture reference and place it under `materials_dir`.
///
/// `materials_dir` is used as a plain prefix and should end in `/` unless empty.
pub fn texture_path(materials_dir: &str, reference: &str) -> TexturePath {
    let normalized = reference.replace('\\', "/");
    let relative = normalized.strip_prefix("./").unwrap_or(&normalized);
    TexturePath::new(&format!("{materials_dir}{relative}"))
}

fn find_texture(source: &SourceMaterial, slot: TextureSlot, materials_dir: &str) -> Option<TexturePath> {
    source
        .texture(slot)
        .filter(|reference| !reference.is_empty())
        .map(|reference| texture_path(materials_dir, reference))
}

fn texture_or<F>(texture: Option<TexturePath>, fallback: F) -> Channel<F> {
    match texture {
        Some(path) => Channel::Texture(path),
        None => Channel::Factor(fallback),
    }
}

pub fn resolve_material(
    source: &SourceMaterial,
    materials_dir: &str,
    convention: MaterialConvention,
) -> MaterialData {
    let name = if source.name.is_empty() {
        DEFAULT_MATERIAL_NAME
    } else {
        source.name.as_str()
    };

    let albedo = texture_or(
        find_texture(source, TextureSlot::Diffuse, materials_dir),
        source.diffuse_color.unwrap_or(DEFAULT_ALBEDO),
    );

    let roughness_factor = source.roughness_factor.unwrap_or(DEFAULT_ROUGHNESS);
    let metallic_factor = source.metallic_factor.unwrap_or(DEFAULT_METALLIC);
    let (roughness, metallic) = match convention {
        MaterialConvention::MetallicRoughness => {
            match find_texture(source, TextureSlot::Unknown, materials_dir) {
                Some(path) => (Channel::Texture(path), Channel::Texture(path)),
                None => (
                    Channel::Factor(roughness_factor),
                    Channel::Factor(metallic_factor),
                ),
            }
        }
        MaterialConvention::SpecularAmbient => (
            texture_or(
                find_texture(source, TextureSlot::Shininess, materials_dir),
                roughness_factor,
            ),
            texture_or(
                find_texture(source, TextureSlot::Ambient, materials_dir),
                metallic_factor,
            ),
        ),
    };

    let normal = match find_texture(source, TextureSlot::Normals, materials_dir) {
        Some(path) => Channel::Texture(path),
        None => Channel::Absent,
    };

    let material = MaterialData {
        name: Name::new(name),
        albedo,
        roughness,
        metallic,
        normal,
    };
    debug!(
        "material {:?}: albedo={:?} roughness={:?} metallic={:?} normal={:?}",
        name, material.albedo, material.roughness, material.metallic, material.normal
    );
    material
}
