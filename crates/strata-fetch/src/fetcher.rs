use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::file::FileFetcher;
use crate::http::HttpFetcher;
use crate::location::Location;

/// Retrieves the raw bytes behind a location.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, FetchError>;
}

/// Routes `http`/`https` locations to an [`HttpFetcher`] and `file` locations
/// to a [`FileFetcher`].
pub struct DefaultFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl DefaultFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpFetcher::new(timeout, user_agent)?,
            file: FileFetcher,
        })
    }
}

#[async_trait]
impl ResourceFetcher for DefaultFetcher {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, FetchError> {
        match location.scheme() {
            "http" | "https" => self.http.fetch(location).await,
            "file" => self.file.fetch(location).await,
            other => Err(FetchError::UnsupportedScheme(other.to_string())),
        }
    }
}
