use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;
use crate::fetcher::ResourceFetcher;
use crate::location::Location;

/// Reads `file://` locations from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

#[async_trait]
impl ResourceFetcher for FileFetcher {
    async fn fetch(&self, location: &Location) -> Result<Vec<u8>, FetchError> {
        let path = location
            .to_file_path()
            .ok_or_else(|| FetchError::UnsupportedScheme(location.scheme().to_string()))?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(FetchError::Io(path.display().to_string(), e)),
        }
    }
}
