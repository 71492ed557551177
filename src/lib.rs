/// Error definitions
pub mod error;
/// Bounded, NUL-terminated string fields used by the container format
pub mod fixed_str;
/// Flattened scene types shared by the importer and exporter
pub mod types;
/// Source scene description and the glTF/OBJ loaders that produce it
pub mod scene;
/// Hierarchy extraction, material resolution and mesh flattening
pub mod import;
/// Binary container encoding, decoding and file output
pub mod export;
