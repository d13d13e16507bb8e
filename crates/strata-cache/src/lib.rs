//! Strata Cache - Decoded animation persistence
//!
//! Stores the output of animation decoding keyed by [`CacheKey`](strata_core::CacheKey)
//! so repeat loads can skip it. Entries carry the decoder version that wrote
//! them; a version mismatch reads as a miss.

mod cache;
mod error;
mod store;

pub use cache::AnimationCache;
pub use error::CacheError;
pub use store::{CacheStore, FileStore, MemoryStore};
