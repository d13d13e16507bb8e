//! Strata Assets - glTF 2.0 parsing, dependency resolution and assembly
//!
//! The stages of a load that do not depend on scheduling live here:
//! - `parser`: JSON/GLB bytes to a validated [`ParsedDocument`] (schema via the `gltf` crate)
//! - `resolver`: buffer and image references to bytes
//! - `animation`: animation channels to an [`AnimationSet`](strata_core::AnimationSet)
//! - `assembler`: everything above to an immutable [`Asset`]

mod animation;
mod assembler;
mod asset;
mod error;
mod mesh;
mod parser;
mod resolver;
mod strict;
mod texture;
mod validate;

pub use animation::{decode_animations, ANIMATION_DECODER_VERSION};
pub use assembler::assemble;
pub use asset::{
    AlphaMode, Asset, Camera, Material, Node, Projection, Sampler, Scene, Skin, Texture, TextureRef,
    Transform,
};
pub use error::AssetError;
pub use mesh::{generate_smooth_normals, MeshAsset, MeshPrimitive, MorphTarget};
pub use parser::{parse_document, ParsedDocument};
pub use resolver::{
    buffer_slices, decode_data_uri, resolve_dependencies, resolve_dependencies_with_progress, DependencyRef,
    ResolvedDependency,
};
pub use texture::{DefaultImageCodec, ImageCodec, TextureAsset, TextureFormat};
pub use validate::MAX_UNBACKED_ACCESSOR_BYTES;
