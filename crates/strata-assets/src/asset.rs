//! The materialized asset handed to consumers.
//!
//! Mirrors the validated document with every accessor decoded, images turned
//! into pixels and node transforms resolved.

use glam::{Mat4, Quat, Vec3};
use serde_json::Value;
use strata_core::AnimationSet;

use crate::mesh::MeshAsset;
use crate::texture::TextureAsset;

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub version: String,
    pub generator: Option<String>,
    pub scenes: Vec<Scene>,
    pub default_scene: Option<usize>,
    pub nodes: Vec<Node>,
    pub meshes: Vec<MeshAsset>,
    pub materials: Vec<Material>,
    pub textures: Vec<Texture>,
    /// Decoded images, indexed like the document's `images`.
    pub images: Vec<TextureAsset>,
    pub cameras: Vec<Camera>,
    pub skins: Vec<Skin>,
    pub animations: AnimationSet,
    /// Raw buffer payloads, indexed like the document's `buffers`.
    pub buffers: Vec<Vec<u8>>,
    pub extensions_used: Vec<String>,
    pub extras: Option<Value>,
}

impl Asset {
    /// The default scene, or the first one when none is marked.
    pub fn scene(&self) -> Option<&Scene> {
        self.default_scene
            .and_then(|i| self.scenes.get(i))
            .or_else(|| self.scenes.first())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub camera: Option<usize>,
    pub transform: Transform,
    pub weights: Option<Vec<f32>>,
    pub extras: Option<Value>,
}

/// Local transform of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Decompose a column-major matrix.
    pub fn from_matrix(columns: &[[f32; 4]; 4]) -> Self {
        let (scale, rotation, translation) = Mat4::from_cols_array_2d(columns).to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

impl From<gltf::material::AlphaMode> for AlphaMode {
    fn from(mode: gltf::material::AlphaMode) -> Self {
        match mode {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        }
    }
}

/// Reference from a material to a texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRef {
    pub texture: usize,
    pub tex_coord: u32,
    /// Normal scale or occlusion strength, where applicable.
    pub factor: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureRef>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub occlusion_texture: Option<TextureRef>,
    pub emissive_texture: Option<TextureRef>,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color_factor: [1.0; 4],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            emissive_factor: [0.0; 3],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
        }
    }
}

/// Sampler settings as raw GL enum values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    pub wrap_s: u32,
    pub wrap_t: u32,
}

impl Default for Sampler {
    fn default() -> Self {
        // 10497 = REPEAT
        Self {
            mag_filter: None,
            min_filter: None,
            wrap_s: 10497,
            wrap_t: 10497,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: Option<String>,
    /// Index into [`Asset::images`].
    pub image: Option<usize>,
    pub sampler: Sampler,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        aspect_ratio: Option<f32>,
        yfov: f32,
        znear: f32,
        zfar: Option<f32>,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    pub name: Option<String>,
    pub joints: Vec<usize>,
    pub skeleton: Option<usize>,
    /// One per joint; identity when the document omits them.
    pub inverse_bind_matrices: Vec<Mat4>,
}
