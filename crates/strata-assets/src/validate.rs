//! Checks the `gltf` crate leaves to its callers.
//!
//! `Document::from_json` covers required fields, enumerated values and most
//! index bounds. Byte ranges, element formats, the node forest and version
//! numbers are checked here. The `gltf` readers assume all of them hold.

use gltf::accessor::{DataType, Dimensions};
use gltf::animation::Property;
use gltf::json::validation::Checked;
use gltf::{buffer, json, Accessor, Document, Semantic};

use crate::error::AssetError;

const MIN_STRIDE: usize = 4;
const MAX_STRIDE: usize = 252;

/// Largest element data an accessor without a buffer view may expand to.
/// Such accessors are zero-filled, so their size is not bounded by any payload.
pub const MAX_UNBACKED_ACCESSOR_BYTES: usize = 64 << 20;

/// References `Document::from_json` does not check, or indexes before checking.
pub(crate) fn check_json(root: &json::Root) -> Result<(), AssetError> {
    for (m, mesh) in root.meshes.iter().enumerate() {
        for (p, primitive) in mesh.primitives.iter().enumerate() {
            if let Some(index) = primitive.attributes.get(&Checked::Valid(Semantic::Positions)) {
                if index.value() >= root.accessors.len() {
                    return Err(AssetError::invalid(format!(
                        "mesh {} primitive {} POSITION refers to missing accessor {}",
                        m,
                        p,
                        index.value()
                    )));
                }
            }
        }
    }
    for (a, animation) in root.animations.iter().enumerate() {
        for (c, channel) in animation.channels.iter().enumerate() {
            if channel.target.node.value() >= root.nodes.len() {
                return Err(AssetError::invalid(format!(
                    "animation {} channel {} targets missing node {}",
                    a,
                    c,
                    channel.target.node.value()
                )));
            }
            if !matches!(channel.target.path, Checked::Valid(_)) {
                return Err(AssetError::invalid(format!(
                    "animation {} channel {} has an unknown target path",
                    a, c
                )));
            }
        }
    }
    for (i, camera) in root.cameras.iter().enumerate() {
        let ok = match camera.type_ {
            Checked::Valid(json::camera::Type::Perspective) => camera.perspective.is_some(),
            Checked::Valid(json::camera::Type::Orthographic) => camera.orthographic.is_some(),
            Checked::Invalid => false,
        };
        if !ok {
            return Err(AssetError::invalid(format!("camera {} is missing its projection", i)));
        }
    }
    Ok(())
}

/// Check every range and format the readers rely on.
///
/// `has_bin` says whether a GLB binary chunk is available to back buffer 0.
pub fn validate(doc: &Document, has_bin: bool) -> Result<(), AssetError> {
    check_version(&doc.as_json().asset)?;
    check_forest(doc)?;
    check_buffers(doc, has_bin)?;
    check_accessors(doc)?;
    check_images(doc)?;
    check_meshes(doc)?;
    check_skins(doc)?;
    check_animations(doc)?;
    Ok(())
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

fn check_version(asset: &json::Asset) -> Result<(), AssetError> {
    let version = parse_version(&asset.version)
        .ok_or_else(|| AssetError::invalid(format!("malformed asset.version '{}'", asset.version)))?;
    if version.0 != 2 {
        return Err(AssetError::invalid(format!("unsupported asset.version '{}'", asset.version)));
    }
    if let Some(min) = &asset.min_version {
        let parsed = parse_version(min)
            .ok_or_else(|| AssetError::invalid(format!("malformed asset.minVersion '{}'", min)))?;
        if parsed > (2, 0) {
            return Err(AssetError::invalid(format!("asset.minVersion '{}' is newer than 2.0", min)));
        }
    }
    Ok(())
}

fn check_forest(doc: &Document) -> Result<(), AssetError> {
    let count = doc.nodes().count();
    let mut parent: Vec<Option<usize>> = vec![None; count];

    for node in doc.nodes() {
        let i = node.index();
        for child in node.children() {
            let child = child.index();
            if child == i {
                return Err(AssetError::invalid(format!("node {} lists itself as a child", i)));
            }
            if let Some(existing) = parent[child] {
                return Err(AssetError::invalid(format!(
                    "node {} has two parents ({} and {})",
                    child, existing, i
                )));
            }
            parent[child] = Some(i);
        }
    }

    // With at most one parent per node, a cycle shows up as a walk upward
    // that never reaches a root.
    for start in 0..count {
        let mut current = start;
        let mut steps = 0;
        while let Some(up) = parent[current] {
            steps += 1;
            if up == start || steps > count {
                return Err(AssetError::invalid(format!(
                    "node hierarchy has a cycle through node {}",
                    start
                )));
            }
            current = up;
        }
    }
    Ok(())
}

fn check_buffers(doc: &Document, has_bin: bool) -> Result<(), AssetError> {
    for buffer in doc.buffers() {
        if let buffer::Source::Bin = buffer.source() {
            if !(buffer.index() == 0 && has_bin) {
                return Err(AssetError::invalid(format!(
                    "buffer {} has no uri and no binary chunk backs it",
                    buffer.index()
                )));
            }
        }
    }
    for view in doc.views() {
        let declared = view.buffer().length();
        let end = view.offset().checked_add(view.length());
        if end.map_or(true, |end| end > declared) {
            return Err(AssetError::invalid(format!(
                "buffer view {} (offset {}, length {}) exceeds buffer {} of {} bytes",
                view.index(),
                view.offset(),
                view.length(),
                view.buffer().index(),
                declared
            )));
        }
        if let Some(stride) = view.stride() {
            if !(MIN_STRIDE..=MAX_STRIDE).contains(&stride) || stride % 4 != 0 {
                return Err(AssetError::invalid(format!(
                    "buffer view {} has invalid byteStride {}",
                    view.index(),
                    stride
                )));
            }
        }
    }
    Ok(())
}

/// Bytes needed to hold `count` elements of `element` bytes laid out `stride`
/// apart, starting at `offset`. `None` on overflow.
fn span(offset: usize, stride: usize, count: usize, element: usize) -> Option<usize> {
    let last = count.checked_sub(1)?;
    stride.checked_mul(last)?.checked_add(offset)?.checked_add(element)
}

fn check_accessors(doc: &Document) -> Result<(), AssetError> {
    for accessor in doc.accessors() {
        let i = accessor.index();
        let count = accessor.count();
        if count == 0 {
            return Err(AssetError::invalid(format!("accessor {} has count 0", i)));
        }
        let element = accessor.size();

        match accessor.view() {
            Some(view) => {
                let stride = view.stride().unwrap_or(element);
                if stride < element {
                    return Err(AssetError::invalid(format!(
                        "accessor {} elements of {} bytes do not fit buffer view {} stride {}",
                        i,
                        element,
                        view.index(),
                        stride
                    )));
                }
                let needed = span(accessor.offset(), stride, count, element);
                if needed.map_or(true, |needed| needed > view.length()) {
                    return Err(AssetError::invalid(format!(
                        "accessor {} with {} elements overruns buffer view {} of {} bytes",
                        i,
                        count,
                        view.index(),
                        view.length()
                    )));
                }
            }
            None => {
                // Decoded as floats (or u32) per component.
                let decoded = count
                    .checked_mul(accessor.dimensions().multiplicity())
                    .and_then(|n| n.checked_mul(4));
                if decoded.map_or(true, |bytes| bytes > MAX_UNBACKED_ACCESSOR_BYTES) {
                    return Err(AssetError::invalid(format!(
                        "accessor {} has no buffer view and {} elements, more than can be zero-filled",
                        i, count
                    )));
                }
            }
        }

        if let Some(sparse) = accessor.sparse() {
            let sparse_count = sparse.count();
            if sparse_count == 0 || sparse_count > count {
                return Err(AssetError::invalid(format!(
                    "accessor {} has sparse count {} for {} elements",
                    i, sparse_count, count
                )));
            }

            let indices = sparse.indices();
            let index_size = indices.index_type().size();
            let view = indices.view();
            let stride = view.stride().unwrap_or(index_size);
            let needed = span(indices.offset(), stride, sparse_count, index_size);
            if needed.map_or(true, |needed| needed > view.length()) {
                return Err(AssetError::invalid(format!(
                    "accessor {} sparse indices overrun buffer view {}",
                    i,
                    view.index()
                )));
            }

            let values = sparse.values();
            let view = values.view();
            let stride = view.stride().unwrap_or(element);
            let needed = span(values.offset(), stride.max(element), sparse_count, element);
            if needed.map_or(true, |needed| needed > view.length()) {
                return Err(AssetError::invalid(format!(
                    "accessor {} sparse values overrun buffer view {}",
                    i,
                    view.index()
                )));
            }
        }
    }
    Ok(())
}

fn check_images(doc: &Document) -> Result<(), AssetError> {
    for (i, image) in doc.as_json().images.iter().enumerate() {
        match (image.uri.is_some(), image.buffer_view.is_some()) {
            (true, false) => {}
            (false, true) => {
                if image.mime_type.is_none() {
                    return Err(AssetError::invalid(format!(
                        "image {} is stored in a buffer view but has no mimeType",
                        i
                    )));
                }
            }
            _ => {
                return Err(AssetError::invalid(format!(
                    "image {} must have exactly one of uri or bufferView",
                    i
                )))
            }
        }
    }
    Ok(())
}

fn expect_format(
    accessor: &Accessor,
    role: impl FnOnce() -> String,
    dimensions: &[Dimensions],
    types: &[DataType],
) -> Result<(), AssetError> {
    if dimensions.contains(&accessor.dimensions()) && types.contains(&accessor.data_type()) {
        return Ok(());
    }
    Err(AssetError::invalid(format!(
        "{} cannot use accessor {} ({:?} of {:?})",
        role(),
        accessor.index(),
        accessor.dimensions(),
        accessor.data_type()
    )))
}

const FLOAT: &[DataType] = &[DataType::F32];
const UNORM: &[DataType] = &[DataType::F32, DataType::U8, DataType::U16];
const INDEX: &[DataType] = &[DataType::U8, DataType::U16, DataType::U32];
const SNORM: &[DataType] = &[
    DataType::F32,
    DataType::I8,
    DataType::U8,
    DataType::I16,
    DataType::U16,
];

fn check_meshes(doc: &Document) -> Result<(), AssetError> {
    for mesh in doc.meshes() {
        let m = mesh.index();
        if mesh.primitives().count() == 0 {
            return Err(AssetError::invalid(format!("mesh {} has no primitives", m)));
        }
        for primitive in mesh.primitives() {
            let p = primitive.index();
            let role = |what: &str| format!("mesh {} primitive {} {}", m, p, what);

            for (semantic, accessor) in primitive.attributes() {
                let name = semantic.to_string();
                let role = || role(&name);
                match semantic {
                    Semantic::Positions | Semantic::Normals => {
                        expect_format(&accessor, role, &[Dimensions::Vec3], FLOAT)?
                    }
                    Semantic::Tangents => expect_format(&accessor, role, &[Dimensions::Vec4], FLOAT)?,
                    Semantic::TexCoords(_) => expect_format(&accessor, role, &[Dimensions::Vec2], UNORM)?,
                    Semantic::Colors(_) => {
                        expect_format(&accessor, role, &[Dimensions::Vec3, Dimensions::Vec4], UNORM)?
                    }
                    Semantic::Joints(_) => {
                        expect_format(&accessor, role, &[Dimensions::Vec4], &[DataType::U8, DataType::U16])?
                    }
                    Semantic::Weights(_) => expect_format(&accessor, role, &[Dimensions::Vec4], UNORM)?,
                    Semantic::Extras(_) => {}
                }
            }
            if let Some(indices) = primitive.indices() {
                expect_format(&indices, || role("indices"), &[Dimensions::Scalar], INDEX)?;
            }
            for target in primitive.morph_targets() {
                for accessor in [target.positions(), target.normals(), target.tangents()]
                    .into_iter()
                    .flatten()
                {
                    expect_format(&accessor, || role("morph target"), &[Dimensions::Vec3], FLOAT)?;
                }
            }
        }
    }
    Ok(())
}

fn check_skins(doc: &Document) -> Result<(), AssetError> {
    for skin in doc.skins() {
        let joints = skin.joints().count();
        if joints == 0 {
            return Err(AssetError::invalid(format!("skin {} has no joints", skin.index())));
        }
        if let Some(matrices) = skin.inverse_bind_matrices() {
            expect_format(
                &matrices,
                || format!("skin {} inverseBindMatrices", skin.index()),
                &[Dimensions::Mat4],
                FLOAT,
            )?;
            if matrices.count() < joints {
                return Err(AssetError::invalid(format!(
                    "skin {} has {} joints but {} inverse bind matrices",
                    skin.index(),
                    joints,
                    matrices.count()
                )));
            }
        }
    }
    Ok(())
}

fn check_animations(doc: &Document) -> Result<(), AssetError> {
    for animation in doc.animations() {
        let a = animation.index();
        for channel in animation.channels() {
            let c = channel.index();
            let role = || format!("animation {} channel {}", a, c);
            let sampler = channel.sampler();
            expect_format(&sampler.input(), role, &[Dimensions::Scalar], FLOAT)?;

            let output = sampler.output();
            match channel.target().property() {
                Property::Translation | Property::Scale => {
                    expect_format(&output, role, &[Dimensions::Vec3], FLOAT)?
                }
                Property::Rotation => expect_format(&output, role, &[Dimensions::Vec4], SNORM)?,
                Property::MorphTargetWeights => {
                    expect_format(&output, role, &[Dimensions::Scalar], SNORM)?
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::{ErrorKind, LoadOptions};

    use crate::parser::parse_document;

    fn parse(value: serde_json::Value) -> Result<(), AssetError> {
        let bytes = serde_json::to_vec(&value).unwrap();
        parse_document(&bytes, &LoadOptions::default()).map(|_| ())
    }

    fn base() -> serde_json::Value {
        json!({
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [{"mesh": 0}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "accessors": [{
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            }],
            "bufferViews": [{"buffer": 0, "byteLength": 36}],
            "buffers": [{"uri": "data:application/octet-stream;base64,", "byteLength": 36}]
        })
    }

    #[test]
    fn accepts_minimal_document() {
        parse(base()).unwrap();
    }

    #[test]
    fn rejects_mesh_index_beyond_meshes() {
        let mut value = base();
        value["nodes"][0]["mesh"] = json!(3);
        let err = parse(value).unwrap_err();
        assert!(matches!(err, AssetError::Gltf(_)), "unexpected error: {:?}", err);
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut value = base();
        value["asset"]["version"] = json!("1.0");
        assert!(matches!(parse(value), Err(AssetError::Invalid(_))));

        let mut value = base();
        value["asset"]["minVersion"] = json!("2.1");
        assert!(parse(value).is_err());
    }

    #[test]
    fn rejects_node_with_two_parents() {
        let mut value = base();
        value["nodes"] = json!([{"children": [2]}, {"children": [2]}, {}]);
        value["scenes"] = json!([{"nodes": [0, 1]}]);
        assert!(parse(value).is_err());
    }

    #[test]
    fn rejects_cycle() {
        let mut value = base();
        value["scenes"] = json!([]);
        value.as_object_mut().unwrap().remove("scene");
        value["nodes"] = json!([{"children": [1]}, {"children": [0]}]);
        let err = parse(value).unwrap_err();
        assert!(err.to_string().contains("cycle"), "unexpected error: {}", err);
    }

    #[test]
    fn rejects_buffer_view_past_buffer_end() {
        let mut value = base();
        value["bufferViews"][0]["byteOffset"] = json!(8);
        assert!(parse(value).is_err());
    }

    #[test]
    fn rejects_accessor_past_view_end() {
        let mut value = base();
        value["accessors"][0]["count"] = json!(4);
        assert!(parse(value).is_err());
    }

    #[test]
    fn huge_count_is_rejected_without_overflow() {
        let mut value = base();
        value["accessors"][0]["count"] = json!(4611686018427387905u64);
        let err = parse(value).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn huge_accessor_without_view_is_rejected() {
        let mut value = base();
        value["accessors"].as_array_mut().unwrap().extend([
            json!({"componentType": 5126, "count": 1099511627776u64, "type": "SCALAR"}),
            json!({"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3"}),
        ]);
        value["animations"] = json!([{
            "channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}],
            "samplers": [{"input": 1, "output": 2}]
        }]);
        match parse(value) {
            Err(AssetError::Invalid(message)) => assert!(message.contains("accessor 1"), "{}", message),
            other => panic!("expected Invalid, got: {:?}", other),
        }
    }

    #[test]
    fn small_accessor_without_view_is_accepted() {
        let mut value = base();
        value["accessors"]
            .as_array_mut()
            .unwrap()
            .push(json!({"componentType": 5126, "count": 16, "type": "VEC3"}));
        parse(value).unwrap();
    }

    #[test]
    fn sparse_ranges_are_checked() {
        let mut value = base();
        value["accessors"][0]["sparse"] = json!({
            "count": 2,
            "indices": {"bufferView": 0, "byteOffset": 32, "componentType": 5125},
            "values": {"bufferView": 0}
        });
        assert!(parse(value.clone()).is_err());

        value["accessors"][0]["sparse"]["indices"]["byteOffset"] = json!(0);
        value["accessors"][0]["sparse"]["count"] = json!(4611686018427387905u64);
        assert!(parse(value.clone()).is_err());

        value["accessors"][0]["sparse"]["count"] = json!(2);
        parse(value).unwrap();
    }

    #[test]
    fn attribute_formats_are_enforced() {
        let mut value = base();
        value["meshes"][0]["primitives"][0]["attributes"]["TEXCOORD_0"] = json!(0);
        let err = parse(value).unwrap_err();
        assert!(err.to_string().contains("TEXCOORD_0"), "unexpected error: {}", err);
    }

    #[test]
    fn animation_output_must_match_path() {
        let mut value = base();
        value["accessors"]
            .as_array_mut()
            .unwrap()
            .push(json!({"bufferView": 0, "componentType": 5126, "count": 9, "type": "SCALAR"}));
        value["animations"] = json!([{
            "channels": [{"sampler": 0, "target": {"node": 0, "path": "rotation"}}],
            "samplers": [{"input": 1, "output": 0}]
        }]);
        assert!(matches!(parse(value), Err(AssetError::Invalid(_))));
    }

    #[test]
    fn channel_sampler_must_belong_to_its_animation() {
        let mut value = base();
        value["animations"] = json!([{
            "channels": [{"sampler": 1, "target": {"node": 0, "path": "translation"}}],
            "samplers": [{"input": 0, "output": 0}]
        }]);
        assert!(parse(value).is_err());
    }

    #[test]
    fn channel_target_must_exist() {
        let mut value = base();
        value["animations"] = json!([{
            "channels": [{"sampler": 0, "target": {"node": 9, "path": "translation"}}],
            "samplers": [{"input": 0, "output": 0}]
        }]);
        assert!(matches!(parse(value), Err(AssetError::Invalid(_))));
    }

    #[test]
    fn camera_needs_its_projection() {
        let mut value = base();
        value["cameras"] = json!([{"type": "perspective", "orthographic": {"xmag": 1, "ymag": 1, "znear": 0.1, "zfar": 10}}]);
        assert!(parse(value).is_err());
    }

    #[test]
    fn uri_less_buffer_needs_binary_chunk() {
        let mut value = base();
        value["buffers"][0] = json!({"byteLength": 36});
        assert!(parse(value).is_err());
    }
}
