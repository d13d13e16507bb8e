use thiserror::Error;

/// Errors that can occur while fetching a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid location '{0}': {1}")]
    InvalidLocation(String, String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("I/O error reading '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    #[error("server returned {status} for '{location}'")]
    Status { location: String, status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err.to_string())
        }
    }
}
