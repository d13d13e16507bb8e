//! Strata Core - Types shared by every stage of the loading pipeline
//!
//! This crate provides the vocabulary the other crates agree on:
//! - Error classification for terminal load results
//! - Loading options with documented defaults
//! - Content fingerprints used as cache keys and deduplication keys
//! - Decoded animation data, as produced by the decoder and persisted by the cache

pub mod animation;
pub mod error;
pub mod key;
pub mod options;

pub use animation::{AnimationChannel, AnimationClip, AnimationSet, Interpolation, TargetPath};
pub use error::{ErrorKind, OptionsError};
pub use key::CacheKey;
pub use options::LoadOptions;
