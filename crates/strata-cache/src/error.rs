use std::path::PathBuf;

/// Errors from the animation cache. None of them fail a load.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error on {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode cache entry: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("cache entry was written by decoder version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("cache entry belongs to a different key")]
    KeyMismatch,
}
