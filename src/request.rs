use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use strata_assets::ANIMATION_DECODER_VERSION;
use strata_cache::{AnimationCache, CacheStore, FileStore};
use strata_core::{CacheKey, LoadOptions, OptionsError};
use strata_fetch::Location;

use crate::error::LoadError;
use crate::progress::{LoadProgress, Observer, ProgressObserver};

/// Where decoded animations are persisted between loads.
#[derive(Clone)]
pub enum CacheLocation {
    /// One file per entry in this directory (created on first write).
    Directory(PathBuf),
    /// A caller-provided store.
    Store(Arc<dyn CacheStore>),
}

impl CacheLocation {
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        CacheLocation::Directory(path.into())
    }

    pub fn store(store: Arc<dyn CacheStore>) -> Self {
        CacheLocation::Store(store)
    }

    fn open(self) -> AnimationCache {
        let store: Arc<dyn CacheStore> = match self {
            CacheLocation::Directory(path) => Arc::new(FileStore::new(path)),
            CacheLocation::Store(store) => store,
        };
        AnimationCache::new(store, ANIMATION_DECODER_VERSION)
    }
}

impl fmt::Debug for CacheLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheLocation::Directory(path) => f.debug_tuple("Directory").field(path).finish(),
            CacheLocation::Store(_) => f.write_str("Store(..)"),
        }
    }
}

/// A request to load one document.
///
/// Exactly one of a location or a byte buffer must be set. Problems with the
/// request are reported through the completion handler as
/// [`ErrorKind::InvalidRequest`](strata_core::ErrorKind::InvalidRequest), like
/// any other failure.
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    location: Option<String>,
    bytes: Option<Vec<u8>>,
    options: LoadOptions,
    options_error: Option<OptionsError>,
    cache: Option<CacheLocation>,
    override_cache: bool,
    progress: Option<Observer>,
}

impl LoadRequest {
    /// An empty request; set a source before submitting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a URL (`http`, `https`, `file`) or a filesystem path.
    pub fn from_location(location: impl Into<String>) -> Self {
        Self::new().with_location(location)
    }

    /// Load a JSON or GLB document already in memory.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new().with_bytes(bytes)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_bytes(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.bytes = Some(bytes.into());
        self
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self.options_error = None;
        self
    }

    /// Options in name/value form. Unrecognized names are ignored; a
    /// recognized name with a bad value makes the request invalid.
    pub fn with_option_map(mut self, map: &Map<String, Value>) -> Self {
        match LoadOptions::from_map(map) {
            Ok(options) => {
                self.options = options;
                self.options_error = None;
            }
            Err(e) => self.options_error = Some(e),
        }
        self
    }

    pub fn with_cache(mut self, cache: CacheLocation) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Ignore and replace any cached animations for this source.
    pub fn with_override_cache(mut self, override_cache: bool) -> Self {
        self.override_cache = override_cache;
        self
    }

    /// Report each step of the load to `observer`, on a loader thread.
    pub fn with_progress<F>(mut self, observer: F) -> Self
    where
        F: Fn(&LoadProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Observer(Arc::new(observer)));
        self
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn override_cache(&self) -> bool {
        self.override_cache
    }

    /// Check the request and derive its cache key.
    pub(crate) fn validate(self) -> Result<ValidatedRequest, LoadError> {
        if let Some(e) = self.options_error {
            return Err(e.into());
        }

        let source = match (self.location, self.bytes) {
            (None, None) => return Err(LoadError::invalid_request("request has no source")),
            (Some(_), Some(_)) => {
                return Err(LoadError::invalid_request(
                    "request has both a location and a byte buffer",
                ))
            }
            (Some(location), None) => Source::Location(
                Location::parse(&location).map_err(|e| LoadError::invalid_request(e.to_string()))?,
            ),
            (None, Some(bytes)) if bytes.is_empty() => {
                return Err(LoadError::invalid_request("byte buffer is empty"))
            }
            (None, Some(bytes)) => Source::Bytes(bytes),
        };

        let key = match &source {
            Source::Location(location) => CacheKey::for_location(location.as_str(), &self.options),
            Source::Bytes(bytes) => CacheKey::for_bytes(bytes, &self.options),
        };

        Ok(ValidatedRequest {
            source,
            key,
            options: self.options,
            cache: self.cache.map(CacheLocation::open),
            override_cache: self.override_cache,
            progress: self.progress.map(|o| o.0),
        })
    }
}

pub(crate) enum Source {
    Location(Location),
    Bytes(Vec<u8>),
}

impl Source {
    pub(crate) fn describe(&self) -> String {
        match self {
            Source::Location(location) => location.to_string(),
            Source::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

pub(crate) struct ValidatedRequest {
    pub source: Source,
    pub key: CacheKey,
    pub options: LoadOptions,
    pub cache: Option<AnimationCache>,
    pub override_cache: bool,
    pub progress: Option<ProgressObserver>,
}
