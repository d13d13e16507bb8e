//! One load, start to finish: fetch, parse, resolve, animations, assemble.

use std::sync::Arc;
use std::time::Instant;

use strata_assets::{
    assemble, buffer_slices, decode_animations, parse_document, resolve_dependencies_with_progress,
    AssetError, ImageCodec, ParsedDocument, ResolvedDependency,
};
use strata_cache::AnimationCache;
use strata_core::{AnimationSet, CacheKey, ErrorKind};
use strata_fetch::ResourceFetcher;
use tracing::{debug, info, warn};

use crate::error::{LoadError, LoadResult};
use crate::progress::{LoadProgress, ProgressSink};
use crate::request::{Source, ValidatedRequest};

/// Shared collaborators of every pipeline run by one loader.
#[derive(Clone)]
pub(crate) struct Pipeline {
    pub fetcher: Arc<dyn ResourceFetcher>,
    pub codec: Arc<dyn ImageCodec>,
    pub max_concurrent_fetches: usize,
}

impl Pipeline {
    pub(crate) async fn run(self, request: ValidatedRequest, progress: ProgressSink) -> LoadResult {
        let started = Instant::now();
        let ValidatedRequest {
            source,
            key,
            options,
            cache,
            override_cache,
            ..
        } = request;
        let label = source.describe();

        let (bytes, base) = match source {
            Source::Location(location) => {
                debug!("fetching document {}", location);
                let bytes = self.fetcher.fetch(&location).await.map_err(|e| {
                    LoadError::new(ErrorKind::Fetch, format!("failed to fetch '{}': {}", location, e))
                })?;
                (bytes, Some(location))
            }
            Source::Bytes(bytes) => (bytes, None),
        };
        progress.emit(LoadProgress::Fetched { bytes: bytes.len() });

        let parse_options = options.clone();
        let parsed = blocking("parse", move || parse_document(&bytes, &parse_options)).await?;
        progress.emit(LoadProgress::Parsed {
            meshes: parsed.document.meshes().count(),
            animations: parsed.document.animations().count(),
        });

        let report = |resolved: usize, total: usize| progress.emit(LoadProgress::DependencyResolved { resolved, total });
        let dependencies = resolve_dependencies_with_progress(
            &parsed,
            base.as_ref(),
            self.fetcher.as_ref(),
            self.max_concurrent_fetches,
            &report,
        )
        .await?;
        debug!("{}: resolved {} dependencies", label, dependencies.len());

        let sink = progress.clone();
        let (parsed, dependencies, animations, pending_store) = blocking("animation", move || {
            let (animations, fresh) =
                cached_or_decoded(&parsed, &dependencies, cache.as_ref(), override_cache, &key, &sink)?;
            let pending_store = if fresh { cache } else { None };
            Ok((parsed, dependencies, animations, pending_store))
        })
        .await?;

        // The cache is written only once the asset is complete, so a failed
        // forced load leaves the previous entry in place.
        let codec = Arc::clone(&self.codec);
        let asset = blocking("assembly", move || {
            let asset = assemble(parsed, dependencies, animations, &options, codec.as_ref())?;
            if let Some(cache) = pending_store {
                if let Err(e) = cache.store(&key, &asset.animations) {
                    warn!("{}: {}; continuing with decoded animations", ErrorKind::Cache, e);
                }
            }
            Ok(asset)
        })
        .await?;

        info!(
            "loaded {} in {:.1?}: {} meshes, {} animation channels",
            label,
            started.elapsed(),
            asset.meshes.len(),
            asset.animations.channel_count()
        );
        Ok(Arc::new(asset))
    }
}

/// Cache lookup-or-decode. A present cache with no override is consulted
/// first. The flag is true when the animations were freshly decoded.
fn cached_or_decoded(
    parsed: &ParsedDocument,
    dependencies: &[ResolvedDependency],
    cache: Option<&AnimationCache>,
    override_cache: bool,
    key: &CacheKey,
    progress: &ProgressSink,
) -> Result<(AnimationSet, bool), AssetError> {
    if let Some(cache) = cache {
        if !override_cache {
            if let Some(animations) = cache.lookup(key) {
                progress.emit(LoadProgress::CacheHit);
                return Ok((animations, false));
            }
        }
        progress.emit(LoadProgress::CacheMiss);
    }

    let buffers = buffer_slices(&parsed.document, dependencies)?;
    let animations = decode_animations(&parsed.document, &buffers)?;
    Ok((animations, true))
}

/// Run a CPU-bound stage off the async workers. A panic inside it becomes an
/// assembly failure instead of tearing down the load.
async fn blocking<T, F>(stage: &'static str, f: F) -> Result<T, LoadError>
where
    F: FnOnce() -> Result<T, AssetError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(LoadError::from),
        Err(e) if e.is_panic() => Err(LoadError::new(
            ErrorKind::Assembly,
            format!("{} stage panicked", stage),
        )),
        Err(_) => Err(LoadError::new(
            ErrorKind::Shutdown,
            format!("{} stage was cancelled", stage),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, MockFetcher};
    use strata_assets::{DefaultImageCodec, ANIMATION_DECODER_VERSION};
    use parking_lot::Mutex;
    use strata_cache::MemoryStore;
    use strata_core::{AnimationClip, LoadOptions};

    impl Pipeline {
        async fn run_quiet(self, request: ValidatedRequest) -> LoadResult {
            self.run(request, ProgressSink::default()).await
        }
    }

    fn recorder(sink: &ProgressSink) -> Arc<Mutex<Vec<LoadProgress>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&events);
        sink.attach(Arc::new(move |e: &LoadProgress| recorded.lock().push(e.clone())));
        events
    }

    fn pipeline(fetcher: MockFetcher) -> Pipeline {
        Pipeline {
            fetcher: Arc::new(fetcher),
            codec: Arc::new(DefaultImageCodec),
            max_concurrent_fetches: 4,
        }
    }

    fn request(bytes: Vec<u8>, cache: Option<AnimationCache>, override_cache: bool) -> ValidatedRequest {
        let options = LoadOptions::default();
        ValidatedRequest {
            key: CacheKey::for_bytes(&bytes, &options),
            source: Source::Bytes(bytes),
            options,
            cache,
            override_cache,
            progress: None,
        }
    }

    #[tokio::test]
    async fn loads_document_with_animation() {
        let asset = pipeline(MockFetcher::new())
            .run_quiet(request(fixtures::animated_triangle(), None, false))
            .await
            .unwrap();
        assert_eq!(asset.meshes.len(), 1);
        assert_eq!(asset.animations.channel_count(), 1);
    }

    #[tokio::test]
    async fn stores_decoded_animations() {
        let store = Arc::new(MemoryStore::new());
        let cache = AnimationCache::new(store.clone(), ANIMATION_DECODER_VERSION);
        let bytes = fixtures::animated_triangle();
        let key = CacheKey::for_bytes(&bytes, &LoadOptions::default());

        let asset = pipeline(MockFetcher::new())
            .run_quiet(request(bytes, Some(cache.clone()), false))
            .await
            .unwrap();
        assert_eq!(cache.lookup(&key).as_ref(), Some(&asset.animations));
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_fail_the_load() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let store = Arc::new(strata_cache::FileStore::new(blocker.join("cache")));
        let cache = AnimationCache::new(store, ANIMATION_DECODER_VERSION);

        let asset = pipeline(MockFetcher::new())
            .run_quiet(request(fixtures::animated_triangle(), Some(cache), false))
            .await
            .unwrap();
        assert_eq!(asset.animations.channel_count(), 1);
    }

    #[tokio::test]
    async fn external_buffer_failure_is_a_fetch_error() {
        let fetcher = MockFetcher::new().with_file("https://example.com/scene.gltf", fixtures::external_buffer_document());
        let location = strata_fetch::Location::parse("https://example.com/scene.gltf").unwrap();
        let options = LoadOptions::default();
        let request = ValidatedRequest {
            key: CacheKey::for_location(location.as_str(), &options),
            source: Source::Location(location),
            options,
            cache: None,
            override_cache: false,
            progress: None,
        };
        let err = pipeline(fetcher).run(request, ProgressSink::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(err.message.contains("scene.bin"), "unexpected message: {}", err.message);
    }

    #[tokio::test]
    async fn forced_load_that_fails_keeps_the_cached_entry() {
        let store = Arc::new(MemoryStore::new());
        let cache = AnimationCache::new(store.clone(), ANIMATION_DECODER_VERSION);
        let bytes = fixtures::animated_document_with_image();
        let key = CacheKey::for_bytes(&bytes, &LoadOptions::default());
        let previous = AnimationSet {
            clips: vec![AnimationClip {
                name: Some("previous".into()),
                channels: Vec::new(),
                duration: 0.0,
            }],
        };
        cache.store(&key, &previous).unwrap();

        let err = pipeline(MockFetcher::new())
            .run_quiet(request(bytes, Some(cache.clone()), true))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
        assert_eq!(cache.lookup(&key), Some(previous));
    }

    #[tokio::test]
    async fn failed_assembly_stores_nothing() {
        let store = Arc::new(MemoryStore::new());
        let cache = AnimationCache::new(store.clone(), ANIMATION_DECODER_VERSION);
        let err = pipeline(MockFetcher::new())
            .run_quiet(request(fixtures::animated_document_with_image(), Some(cache), false))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Codec);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn progress_reports_each_stage() {
        let store = Arc::new(MemoryStore::new());
        let cache = AnimationCache::new(store, ANIMATION_DECODER_VERSION);
        let bytes = fixtures::animated_triangle();
        let size = bytes.len();

        let sink = ProgressSink::default();
        let events = recorder(&sink);
        pipeline(MockFetcher::new())
            .run(request(bytes.clone(), Some(cache.clone()), false), sink)
            .await
            .unwrap();
        assert_eq!(
            *events.lock(),
            vec![
                LoadProgress::Fetched { bytes: size },
                LoadProgress::Parsed { meshes: 1, animations: 1 },
                LoadProgress::DependencyResolved { resolved: 1, total: 1 },
                LoadProgress::CacheMiss,
            ]
        );

        let sink = ProgressSink::default();
        let events = recorder(&sink);
        pipeline(MockFetcher::new())
            .run(request(bytes, Some(cache), false), sink)
            .await
            .unwrap();
        assert_eq!(events.lock().last(), Some(&LoadProgress::CacheHit));
    }

    #[tokio::test]
    async fn progress_without_cache_has_no_cache_events() {
        let sink = ProgressSink::default();
        let events = recorder(&sink);
        pipeline(MockFetcher::new())
            .run(request(fixtures::static_triangle(), None, false), sink)
            .await
            .unwrap();
        let events = events.lock();
        assert_eq!(events.len(), 3);
        assert!(!events
            .iter()
            .any(|e| matches!(e, LoadProgress::CacheHit | LoadProgress::CacheMiss)));
    }
}
