use std::fmt;

use serde::{Deserialize, Serialize};

use crate::options::LoadOptions;

/// Deterministic fingerprint of a load: source identity plus option values.
///
/// Addresses animation cache entries and deduplicates in-flight loads.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Fingerprint a load addressed by location (URL or path string).
    pub fn for_location(location: &str, options: &LoadOptions) -> Self {
        Self::derive("location", location.as_bytes(), options)
    }

    /// Fingerprint a load of an in-memory document; identity is the content itself.
    pub fn for_bytes(bytes: &[u8], options: &LoadOptions) -> Self {
        let content = blake3::hash(bytes);
        Self::derive("bytes", content.as_bytes(), options)
    }

    fn derive(kind: &str, identity: &[u8], options: &LoadOptions) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(kind.as_bytes());
        hasher.update(&[0]);
        hasher.update(identity);
        hasher.update(&[0]);
        hasher.update(options.fingerprint_fields().as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex form, suitable for file names.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        write!(f, "CacheKey({})", &self.to_hex()[..12])
    }
}
