//! Field scan of the raw JSON for strict validation.
//!
//! The `gltf` schema ignores members it does not model, so strict mode needs
//! its own pass over the document as written. `extras` is always accepted;
//! `extensions` objects are reported separately so the caller can decide.

use serde_json::Value;

#[derive(Clone, Copy)]
enum Field {
    Leaf,
    One(Kind),
    Many(Kind),
}

#[derive(Clone, Copy)]
enum Kind {
    Root,
    Asset,
    Scene,
    Node,
    Mesh,
    Primitive,
    Material,
    Pbr,
    TextureInfo,
    Texture,
    Image,
    Sampler,
    Camera,
    Perspective,
    Orthographic,
    Skin,
    Animation,
    Channel,
    Target,
    AnimationSampler,
    Accessor,
    Sparse,
    SparseIndices,
    SparseValues,
    BufferView,
    Buffer,
}

fn fields(kind: Kind) -> &'static [(&'static str, Field)] {
    use Field::{Leaf, Many, One};
    match kind {
        Kind::Root => &[
            ("asset", One(Kind::Asset)),
            ("scene", Leaf),
            ("scenes", Many(Kind::Scene)),
            ("nodes", Many(Kind::Node)),
            ("meshes", Many(Kind::Mesh)),
            ("materials", Many(Kind::Material)),
            ("textures", Many(Kind::Texture)),
            ("images", Many(Kind::Image)),
            ("samplers", Many(Kind::Sampler)),
            ("cameras", Many(Kind::Camera)),
            ("skins", Many(Kind::Skin)),
            ("animations", Many(Kind::Animation)),
            ("accessors", Many(Kind::Accessor)),
            ("bufferViews", Many(Kind::BufferView)),
            ("buffers", Many(Kind::Buffer)),
            ("extensionsUsed", Leaf),
            ("extensionsRequired", Leaf),
        ],
        Kind::Asset => &[
            ("version", Leaf),
            ("minVersion", Leaf),
            ("generator", Leaf),
            ("copyright", Leaf),
        ],
        Kind::Scene => &[("name", Leaf), ("nodes", Leaf)],
        Kind::Node => &[
            ("name", Leaf),
            ("children", Leaf),
            ("mesh", Leaf),
            ("skin", Leaf),
            ("camera", Leaf),
            ("matrix", Leaf),
            ("rotation", Leaf),
            ("scale", Leaf),
            ("translation", Leaf),
            ("weights", Leaf),
        ],
        Kind::Mesh => &[
            ("name", Leaf),
            ("primitives", Many(Kind::Primitive)),
            ("weights", Leaf),
        ],
        Kind::Primitive => &[
            ("attributes", Leaf),
            ("indices", Leaf),
            ("material", Leaf),
            ("mode", Leaf),
            ("targets", Leaf),
        ],
        Kind::Material => &[
            ("name", Leaf),
            ("pbrMetallicRoughness", One(Kind::Pbr)),
            ("normalTexture", One(Kind::TextureInfo)),
            ("occlusionTexture", One(Kind::TextureInfo)),
            ("emissiveTexture", One(Kind::TextureInfo)),
            ("emissiveFactor", Leaf),
            ("alphaMode", Leaf),
            ("alphaCutoff", Leaf),
            ("doubleSided", Leaf),
        ],
        Kind::Pbr => &[
            ("baseColorFactor", Leaf),
            ("baseColorTexture", One(Kind::TextureInfo)),
            ("metallicFactor", Leaf),
            ("roughnessFactor", Leaf),
            ("metallicRoughnessTexture", One(Kind::TextureInfo)),
        ],
        Kind::TextureInfo => &[
            ("index", Leaf),
            ("texCoord", Leaf),
            ("scale", Leaf),
            ("strength", Leaf),
        ],
        Kind::Texture => &[("name", Leaf), ("sampler", Leaf), ("source", Leaf)],
        Kind::Image => &[
            ("name", Leaf),
            ("uri", Leaf),
            ("mimeType", Leaf),
            ("bufferView", Leaf),
        ],
        Kind::Sampler => &[
            ("name", Leaf),
            ("magFilter", Leaf),
            ("minFilter", Leaf),
            ("wrapS", Leaf),
            ("wrapT", Leaf),
        ],
        Kind::Camera => &[
            ("name", Leaf),
            ("type", Leaf),
            ("perspective", One(Kind::Perspective)),
            ("orthographic", One(Kind::Orthographic)),
        ],
        Kind::Perspective => &[
            ("aspectRatio", Leaf),
            ("yfov", Leaf),
            ("zfar", Leaf),
            ("znear", Leaf),
        ],
        Kind::Orthographic => &[("xmag", Leaf), ("ymag", Leaf), ("zfar", Leaf), ("znear", Leaf)],
        Kind::Skin => &[
            ("name", Leaf),
            ("inverseBindMatrices", Leaf),
            ("skeleton", Leaf),
            ("joints", Leaf),
        ],
        Kind::Animation => &[
            ("name", Leaf),
            ("channels", Many(Kind::Channel)),
            ("samplers", Many(Kind::AnimationSampler)),
        ],
        Kind::Channel => &[("sampler", Leaf), ("target", One(Kind::Target))],
        Kind::Target => &[("node", Leaf), ("path", Leaf)],
        Kind::AnimationSampler => &[("input", Leaf), ("interpolation", Leaf), ("output", Leaf)],
        Kind::Accessor => &[
            ("name", Leaf),
            ("bufferView", Leaf),
            ("byteOffset", Leaf),
            ("componentType", Leaf),
            ("normalized", Leaf),
            ("count", Leaf),
            ("type", Leaf),
            ("max", Leaf),
            ("min", Leaf),
            ("sparse", One(Kind::Sparse)),
        ],
        Kind::Sparse => &[
            ("count", Leaf),
            ("indices", One(Kind::SparseIndices)),
            ("values", One(Kind::SparseValues)),
        ],
        Kind::SparseIndices => &[("bufferView", Leaf), ("byteOffset", Leaf), ("componentType", Leaf)],
        Kind::SparseValues => &[("bufferView", Leaf), ("byteOffset", Leaf)],
        Kind::BufferView => &[
            ("name", Leaf),
            ("buffer", Leaf),
            ("byteOffset", Leaf),
            ("byteLength", Leaf),
            ("byteStride", Leaf),
            ("target", Leaf),
        ],
        Kind::Buffer => &[("name", Leaf), ("uri", Leaf), ("byteLength", Leaf)],
    }
}

/// Paths the schema does not recognize, e.g. `nodes[2].foo`.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    pub unknown: Vec<String>,
    /// Paths of non-empty `extensions` objects.
    pub extensions: Vec<String>,
}

pub(crate) fn scan(root: &Value) -> Findings {
    let mut findings = Findings::default();
    visit(root, "", Kind::Root, &mut findings);
    findings
}

fn visit(value: &Value, path: &str, kind: Kind, findings: &mut Findings) {
    // Shape errors are the schema's to report.
    let Some(object) = value.as_object() else { return };
    let known = fields(kind);

    for (key, child) in object {
        let at = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };
        match key.as_str() {
            "extras" => continue,
            "extensions" => {
                if child.as_object().map_or(true, |e| !e.is_empty()) {
                    findings.extensions.push(at);
                }
                continue;
            }
            _ => {}
        }
        match known.iter().find(|(name, _)| name == key) {
            None => findings.unknown.push(at),
            Some((_, Field::Leaf)) => {}
            Some((_, Field::One(kind))) => visit(child, &at, *kind, findings),
            Some((_, Field::Many(kind))) => {
                for (i, item) in child.as_array().into_iter().flatten().enumerate() {
                    visit(item, &format!("{}[{}]", at, i), *kind, findings);
                }
            }
        }
    }
}
