//! Strata Fetch - Raw byte retrieval
//!
//! Resolves locations (URLs or filesystem paths) to bytes. No caching happens
//! here; timeouts are owned by the individual fetchers.

mod error;
mod fetcher;
mod file;
mod http;
mod location;

pub use error::FetchError;
pub use fetcher::{DefaultFetcher, ResourceFetcher};
pub use file::FileFetcher;
pub use http::HttpFetcher;
pub use location::Location;
