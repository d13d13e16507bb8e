use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_core::{AnimationSet, CacheKey};
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::store::CacheStore;

/// What actually lands in the store.
#[derive(Serialize, Deserialize)]
struct Envelope {
    format_version: u32,
    key: CacheKey,
    animations: AnimationSet,
}

/// Versioned animation cache over a [`CacheStore`].
#[derive(Clone)]
pub struct AnimationCache {
    store: Arc<dyn CacheStore>,
    format_version: u32,
}

impl AnimationCache {
    /// `format_version` is the decoder version; entries written by any other
    /// version are misses.
    pub fn new(store: Arc<dyn CacheStore>, format_version: u32) -> Self {
        Self { store, format_version }
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    /// The cached animations for `key`, or `None` on a miss.
    ///
    /// Unreadable, corrupt and stale entries are all misses. Corrupt and stale
    /// ones are removed so the next store starts clean.
    pub fn lookup(&self, key: &CacheKey) -> Option<AnimationSet> {
        let bytes = match self.store.read(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("animation cache miss for {:?}", key);
                return None;
            }
            Err(e) => {
                warn!("animation cache read failed for {:?}: {}", key, e);
                return None;
            }
        };

        match self.decode(key, &bytes) {
            Ok(animations) => {
                debug!(
                    "animation cache hit for {:?} ({} channels)",
                    key,
                    animations.channel_count()
                );
                Some(animations)
            }
            Err(e) => {
                warn!("discarding animation cache entry {:?}: {}", key, e);
                self.invalidate(key);
                None
            }
        }
    }

    /// Persist `animations` under `key`, replacing any existing entry.
    pub fn store(&self, key: &CacheKey, animations: &AnimationSet) -> Result<(), CacheError> {
        #[derive(Serialize)]
        struct EnvelopeRef<'a> {
            format_version: u32,
            key: CacheKey,
            animations: &'a AnimationSet,
        }

        let bytes = bincode::serde::encode_to_vec(
            EnvelopeRef {
                format_version: self.format_version,
                key: *key,
                animations,
            },
            bincode::config::standard(),
        )?;
        self.store.write(key, &bytes)?;
        debug!("stored {} byte animation cache entry for {:?}", bytes.len(), key);
        Ok(())
    }

    /// Drop the entry for `key`. Failures are logged, not returned.
    pub fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.store.remove(key) {
            warn!("failed to invalidate animation cache entry {:?}: {}", key, e);
        }
    }

    fn decode(&self, key: &CacheKey, bytes: &[u8]) -> Result<AnimationSet, CacheError> {
        let (envelope, _): (Envelope, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        if envelope.format_version != self.format_version {
            return Err(CacheError::VersionMismatch {
                found: envelope.format_version,
                expected: self.format_version,
            });
        }
        if envelope.key != *key {
            return Err(CacheError::KeyMismatch);
        }
        Ok(envelope.animations)
    }
}
