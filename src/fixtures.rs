//! Test documents and collaborators shared by the loader tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;
use strata_fetch::{FetchError, Location, ResourceFetcher};
use tokio::sync::Semaphore;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("strata=debug")
        .with_test_writer()
        .try_init();
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Positions (36 bytes), u16 indices (6 + 2 padding), keyframe times (8) and
/// translations (24) in one 76 byte buffer.
fn triangle_buffer() -> Vec<u8> {
    let mut buffer = f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    for i in [0u16, 1, 2] {
        buffer.extend_from_slice(&i.to_le_bytes());
    }
    buffer.extend_from_slice(&[0, 0]);
    buffer.extend(f32_bytes(&[0.0, 1.0]));
    buffer.extend(f32_bytes(&[0.0, 0.0, 0.0, 0.0, 2.0, 0.0]));
    buffer
}

fn triangle_document(animated: bool, mesh_index: usize) -> serde_json::Value {
    let uri = format!(
        "data:application/octet-stream;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(triangle_buffer())
    );
    let mut doc = json!({
        "asset": {"version": "2.0", "generator": "strata-tests"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [{"name": "triangle", "mesh": mesh_index}],
        "meshes": [{"name": "tri", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
             "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"},
            {"bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR"},
            {"bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 6},
            {"buffer": 0, "byteOffset": 44, "byteLength": 8},
            {"buffer": 0, "byteOffset": 52, "byteLength": 24}
        ],
        "buffers": [{"uri": uri, "byteLength": 76}]
    });
    if animated {
        doc["animations"] = json!([{
            "name": "slide",
            "channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}],
            "samplers": [{"input": 2, "output": 3, "interpolation": "LINEAR"}]
        }]);
    }
    doc
}

/// One mesh, no animations.
pub(crate) fn static_triangle() -> Vec<u8> {
    serde_json::to_vec(&triangle_document(false, 0)).unwrap()
}

/// One mesh and one translation channel.
pub(crate) fn animated_triangle() -> Vec<u8> {
    serde_json::to_vec(&triangle_document(true, 0)).unwrap()
}

/// A node pointing at mesh 5 of 1.
pub(crate) fn dangling_mesh_reference() -> Vec<u8> {
    serde_json::to_vec(&triangle_document(false, 5)).unwrap()
}

fn with_broken_image(mut doc: serde_json::Value) -> Vec<u8> {
    doc["images"] = json!([{"uri": "data:image/png;base64,AAAA"}]);
    doc["textures"] = json!([{"source": 0}]);
    serde_json::to_vec(&doc).unwrap()
}

/// An image the codec has to decode; the payload is never a valid image.
pub(crate) fn document_with_image() -> Vec<u8> {
    with_broken_image(triangle_document(false, 0))
}

/// Decodable animations, but assembly fails on the image.
pub(crate) fn animated_document_with_image() -> Vec<u8> {
    with_broken_image(triangle_document(true, 0))
}

/// Triangle whose buffer lives next to the document as `scene.bin`.
pub(crate) fn external_buffer_document() -> Vec<u8> {
    let mut doc = triangle_document(false, 0);
    doc["buffers"][0]["uri"] = json!("scene.bin");
    serde_json::to_vec(&doc).unwrap()
}

/// Serves fixed payloads by URL and counts calls. Unknown URLs fail with a
/// network error. With a gate, every fetch waits for a permit first.
#[derive(Default)]
pub(crate) struct MockFetcher {
    files: HashMap<String, Vec<u8>>,
    calls: Arc<AtomicUsize>,
    gate: Option<Arc<Semaphore>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_file(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), bytes);
        self
    }

    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ResourceFetcher for MockFetcher {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| FetchError::Network("gate closed".into()))?;
        }
        self.files
            .get(location.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("connection refused: {}", location)))
    }
}
