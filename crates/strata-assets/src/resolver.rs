//! Dependency resolution: turning buffer and image references into bytes.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use base64::Engine;
use futures::stream::{self, StreamExt};
use gltf::{buffer, image};
use strata_fetch::{FetchError, Location, ResourceFetcher};
use tracing::{debug, warn};

use crate::error::AssetError;
use crate::parser::ParsedDocument;

/// What a resolved payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyRef {
    Buffer(usize),
    Image(usize),
}

/// A reference together with its payload.
#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub reference: DependencyRef,
    pub bytes: Vec<u8>,
}

struct PendingFetch {
    reference: DependencyRef,
    uri: String,
    location: Location,
}

/// Resolve every buffer and URI-addressed image of `parsed`.
///
/// Embedded payloads (data URIs, the GLB binary chunk) are decoded in place.
/// External ones are fetched, at most `max_concurrent` at a time. After the
/// first failed fetch no new fetch starts; the ones already running are
/// awaited before that first failure is returned.
pub async fn resolve_dependencies(
    parsed: &ParsedDocument,
    base: Option<&Location>,
    fetcher: &dyn ResourceFetcher,
    max_concurrent: usize,
) -> Result<Vec<ResolvedDependency>, AssetError> {
    resolve_dependencies_with_progress(parsed, base, fetcher, max_concurrent, &|_, _| {}).await
}

/// [`resolve_dependencies`], calling `on_progress(resolved, total)` each time
/// a dependency becomes available.
pub async fn resolve_dependencies_with_progress(
    parsed: &ParsedDocument,
    base: Option<&Location>,
    fetcher: &dyn ResourceFetcher,
    max_concurrent: usize,
    on_progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<Vec<ResolvedDependency>, AssetError> {
    let doc = &parsed.document;
    let mut resolved = Vec::new();
    let mut pending = Vec::new();

    for buffer in doc.buffers() {
        let reference = DependencyRef::Buffer(buffer.index());
        match buffer.source() {
            buffer::Source::Bin => {
                let bin = parsed.bin.as_ref().ok_or_else(|| {
                    AssetError::Assembly(format!(
                        "buffer {} has no uri and no binary chunk",
                        buffer.index()
                    ))
                })?;
                resolved.push(ResolvedDependency {
                    reference,
                    bytes: bin.clone(),
                });
            }
            buffer::Source::Uri(uri) if is_data_uri(uri) => resolved.push(ResolvedDependency {
                reference,
                bytes: decode_data_uri(uri)?,
            }),
            buffer::Source::Uri(uri) => pending.push(PendingFetch {
                reference,
                uri: uri.to_string(),
                location: locate(base, uri)?,
            }),
        }
    }

    for image in doc.images() {
        let image::Source::Uri { uri, .. } = image.source() else { continue };
        let reference = DependencyRef::Image(image.index());
        if is_data_uri(uri) {
            resolved.push(ResolvedDependency {
                reference,
                bytes: decode_data_uri(uri)?,
            });
        } else {
            pending.push(PendingFetch {
                reference,
                uri: uri.to_string(),
                location: locate(base, uri)?,
            });
        }
    }

    let total = resolved.len() + pending.len();
    for done in 1..=resolved.len() {
        on_progress(done, total);
    }

    if !pending.is_empty() {
        debug!("fetching {} external dependencies", pending.len());
        let done = AtomicUsize::new(resolved.len());
        let report = || on_progress(done.fetch_add(1, Ordering::AcqRel) + 1, total);
        resolved.extend(fetch_all(pending, fetcher, max_concurrent, &report).await?);
    }

    check_buffer_lengths(doc, &resolved)?;
    Ok(resolved)
}

async fn fetch_all(
    pending: Vec<PendingFetch>,
    fetcher: &dyn ResourceFetcher,
    max_concurrent: usize,
    fetched: &(dyn Fn() + Sync),
) -> Result<Vec<ResolvedDependency>, AssetError> {
    let failed = AtomicBool::new(false);
    let failed = &failed;

    let outcomes: Vec<_> = stream::iter(pending)
        .map(|job| async move {
            if failed.load(Ordering::Acquire) {
                return None;
            }
            let result = fetcher.fetch(&job.location).await;
            match &result {
                Ok(_) => fetched(),
                Err(_) => failed.store(true, Ordering::Release),
            }
            Some((job, result))
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let mut resolved = Vec::with_capacity(outcomes.len());
    let mut first_error = None;
    let mut skipped = 0;

    for outcome in outcomes {
        match outcome {
            Some((job, Ok(bytes))) => resolved.push(ResolvedDependency {
                reference: job.reference,
                bytes,
            }),
            Some((job, Err(source))) => {
                if first_error.is_none() {
                    first_error = Some(AssetError::Fetch {
                        reference: job.uri,
                        source,
                    });
                } else {
                    warn!("additional fetch failure for '{}': {}", job.uri, source);
                }
            }
            None => skipped += 1,
        }
    }

    match first_error {
        Some(err) => {
            debug!("dependency fetch failed; {} fetches were not started", skipped);
            Err(err)
        }
        None => Ok(resolved),
    }
}

fn check_buffer_lengths(doc: &gltf::Document, resolved: &[ResolvedDependency]) -> Result<(), AssetError> {
    let declared: Vec<usize> = doc.buffers().map(|b| b.length()).collect();
    for dependency in resolved {
        if let DependencyRef::Buffer(index) = dependency.reference {
            let expected = declared.get(index).copied().unwrap_or(0);
            if dependency.bytes.len() < expected {
                return Err(AssetError::BufferLength {
                    index,
                    expected,
                    actual: dependency.bytes.len(),
                });
            }
        }
    }
    Ok(())
}

fn locate(base: Option<&Location>, uri: &str) -> Result<Location, AssetError> {
    let located = match base {
        Some(base) => base.join(uri),
        None if uri.contains("://") => Location::parse(uri),
        None => Err(FetchError::InvalidLocation(
            uri.to_string(),
            "relative reference in a document loaded from memory".into(),
        )),
    };
    located.map_err(|source| AssetError::Fetch {
        reference: uri.to_string(),
        source,
    })
}

fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Decode a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let short = || uri.chars().take(48).collect::<String>();
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| AssetError::Codec(short(), "data URI has no payload separator".into()))?;
    if !header.ends_with(";base64") {
        return Err(AssetError::Codec(short(), "only base64 data URIs are supported".into()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| AssetError::Codec(short(), e.to_string()))
}

/// Buffer payloads in buffer-index order.
pub fn buffer_slices<'a>(
    doc: &gltf::Document,
    resolved: &'a [ResolvedDependency],
) -> Result<Vec<&'a [u8]>, AssetError> {
    doc.buffers()
        .map(|buffer| {
            let index = buffer.index();
            resolved
                .iter()
                .find(|d| d.reference == DependencyRef::Buffer(index))
                .map(|d| d.bytes.as_slice())
                .ok_or_else(|| AssetError::Assembly(format!("buffer {} was not resolved", index)))
        })
        .collect()
}
