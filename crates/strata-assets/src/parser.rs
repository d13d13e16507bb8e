use serde_json::Value;
use strata_core::LoadOptions;
use tracing::{debug, warn};

use crate::error::AssetError;
use crate::strict;
use crate::validate::{check_json, validate};

const GLB_MAGIC: &[u8; 4] = b"glTF";

/// A validated document plus the GLB binary chunk, if the source had one.
///
/// `json` is the document as written, so `extras` and anything else the
/// schema does not model stay reachable.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub document: gltf::Document,
    pub json: Value,
    pub bin: Option<Vec<u8>>,
}

impl ParsedDocument {
    pub fn is_binary(&self) -> bool {
        self.bin.is_some()
    }
}

/// Parse and validate a JSON glTF document or a GLB container.
pub fn parse_document(bytes: &[u8], options: &LoadOptions) -> Result<ParsedDocument, AssetError> {
    let (json, bin) = if bytes.starts_with(GLB_MAGIC) {
        let glb = gltf::Glb::from_slice(bytes).map_err(|e| AssetError::Container(e.to_string()))?;
        debug!(
            "GLB container: {} bytes of JSON, {} bytes of binary",
            glb.json.len(),
            glb.bin.as_ref().map_or(0, |b| b.len())
        );
        (glb.json.into_owned(), glb.bin.map(|b| b.into_owned()))
    } else {
        (bytes.to_vec(), None)
    };

    let raw: Value = serde_json::from_slice(&json)?;
    let findings = strict::scan(&raw);
    let mut root: gltf::json::Root = serde_json::from_value(raw.clone())?;

    if options.validate_strict {
        if !findings.unknown.is_empty() {
            return Err(AssetError::UnknownField(findings.unknown.join(", ")));
        }
        let mut rejected = findings.extensions;
        rejected.extend(root.extensions_used.iter().map(|e| format!("extensionsUsed: {}", e)));
        rejected.extend(root.extensions_required.iter().map(|e| format!("extensionsRequired: {}", e)));
        if !rejected.is_empty() {
            return Err(AssetError::Extension(rejected.join(", ")));
        }
    } else {
        if !findings.unknown.is_empty() {
            debug!(
                "ignoring {} unrecognized fields: {}",
                findings.unknown.len(),
                findings.unknown.join(", ")
            );
        }
        if !root.extensions_required.is_empty() {
            warn!(
                "document requires unsupported extensions: {}",
                root.extensions_required.join(", ")
            );
            root.extensions_required.clear();
        }
    }

    check_json(&root)?;
    let document = gltf::Document::from_json(root)?;
    validate(&document, bin.is_some())?;

    debug!(
        "parsed glTF {}: {} nodes, {} meshes, {} animations, {} buffers",
        document.as_json().asset.version,
        document.nodes().count(),
        document.meshes().count(),
        document.animations().count(),
        document.buffers().count()
    );

    Ok(ParsedDocument {
        document,
        json: raw,
        bin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> Value {
        json!({
            "asset": {"version": "2.0", "generator": "test"},
            "nodes": [{"name": "root"}]
        })
    }

    fn glb(json: &[u8], bin: &[u8]) -> Vec<u8> {
        let pad = |len: usize| (4 - len % 4) % 4;
        let json_len = json.len() + pad(json.len());
        let bin_len = bin.len() + pad(bin.len());
        let total = 12 + 8 + json_len + 8 + bin_len;

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_len as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(json);
        out.extend(std::iter::repeat(b' ').take(pad(json.len())));
        out.extend_from_slice(&(bin_len as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(bin);
        out.extend(std::iter::repeat(0u8).take(pad(bin.len())));
        out
    }

    fn strict() -> LoadOptions {
        LoadOptions::default().with_strict_validation(true)
    }

    #[test]
    fn parses_json_document() {
        let bytes = serde_json::to_vec(&minimal()).unwrap();
        let parsed = parse_document(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(parsed.document.as_json().asset.generator.as_deref(), Some("test"));
        assert_eq!(parsed.document.nodes().next().and_then(|n| n.name()), Some("root"));
        assert!(!parsed.is_binary());
    }

    #[test]
    fn malformed_json_fails() {
        let err = parse_document(b"{\"asset\": ", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AssetError::Json(_)));
    }

    #[test]
    fn missing_asset_fails() {
        let err = parse_document(b"{\"nodes\": []}", &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, AssetError::Json(_)));
    }

    #[test]
    fn negative_index_fails() {
        let bytes = br#"{"asset": {"version": "2.0"}, "nodes": [{"mesh": -1}]}"#;
        assert!(parse_document(bytes, &LoadOptions::default()).is_err());
    }

    #[test]
    fn unknown_fields_only_fail_in_strict_mode() {
        let mut value = minimal();
        value["nodes"][0]["vendorFlag"] = json!(true);
        let bytes = serde_json::to_vec(&value).unwrap();

        let parsed = parse_document(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(parsed.json["nodes"][0]["vendorFlag"], json!(true));

        match parse_document(&bytes, &strict()) {
            Err(AssetError::UnknownField(field)) => assert_eq!(field, "nodes[0].vendorFlag"),
            other => panic!("expected UnknownField, got: {:?}", other),
        }
    }

    #[test]
    fn required_extensions_fail_in_strict_mode() {
        let mut value = minimal();
        value["extensionsUsed"] = json!(["EXT_meshopt_compression"]);
        value["extensionsRequired"] = json!(["EXT_meshopt_compression"]);
        let bytes = serde_json::to_vec(&value).unwrap();

        parse_document(&bytes, &LoadOptions::default()).unwrap();
        assert!(matches!(parse_document(&bytes, &strict()), Err(AssetError::Extension(_))));
    }

    #[test]
    fn strict_mode_rejects_any_extension_data() {
        let mut used = minimal();
        used["extensionsUsed"] = json!(["KHR_materials_emissive_strength"]);
        let used = serde_json::to_vec(&used).unwrap();

        let mut object = minimal();
        object["nodes"][0]["extensions"] = json!({"KHR_lights_punctual": {"light": 0}});
        let object = serde_json::to_vec(&object).unwrap();

        for bytes in [&used, &object] {
            parse_document(bytes, &LoadOptions::default()).unwrap();
            match parse_document(bytes, &strict()) {
                Err(err @ AssetError::Extension(_)) => {
                    assert_eq!(err.kind(), strata_core::ErrorKind::Parse)
                }
                other => panic!("expected Extension, got: {:?}", other),
            }
        }
    }

    #[test]
    fn strict_mode_accepts_extras_and_empty_extensions() {
        let mut value = minimal();
        value["extras"] = json!({"author": "someone"});
        value["nodes"][0]["extensions"] = json!({});
        let bytes = serde_json::to_vec(&value).unwrap();
        let parsed = parse_document(&bytes, &strict()).unwrap();
        assert_eq!(parsed.json["extras"]["author"], json!("someone"));
    }

    #[test]
    fn parses_glb_with_binary_chunk() {
        let json = serde_json::to_vec(&json!({
            "asset": {"version": "2.0"},
            "buffers": [{"byteLength": 4}]
        }))
        .unwrap();
        let bytes = glb(&json, &[1, 2, 3, 4]);
        let parsed = parse_document(&bytes, &LoadOptions::default()).unwrap();
        assert_eq!(parsed.bin.as_deref(), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn truncated_glb_is_a_container_error() {
        let json = serde_json::to_vec(&minimal()).unwrap();
        let mut bytes = glb(&json, &[]);
        bytes.truncate(16);
        assert!(matches!(
            parse_document(&bytes, &LoadOptions::default()),
            Err(AssetError::Container(_))
        ));
    }
}
