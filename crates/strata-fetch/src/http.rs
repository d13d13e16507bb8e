use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::FetchError;
use crate::fetcher::ResourceFetcher;
use crate::location::Location;

/// Fetches `http`/`https` resources with a shared connection pool.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, FetchError> {
        debug!("GET {}", location);
        let response = self.client.get(location.url().clone()).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(location.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                location: location.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        debug!("fetched {} bytes from {}", bytes.len(), location);
        Ok(bytes.to_vec())
    }
}
