use std::sync::Arc;

use strata_assets::{Asset, AssetError};
use strata_core::{ErrorKind, OptionsError};
use strata_fetch::FetchError;

/// Terminal failure of a load: the stage it came from and that stage's message.
///
/// `Clone` so every caller attached to a shared load gets its own copy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct LoadError {
    pub kind: ErrorKind,
    pub message: String,
}

impl LoadError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<AssetError> for LoadError {
    fn from(e: AssetError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<FetchError> for LoadError {
    fn from(e: FetchError) -> Self {
        Self::new(ErrorKind::Fetch, e.to_string())
    }
}

impl From<OptionsError> for LoadError {
    fn from(e: OptionsError) -> Self {
        Self::invalid_request(e.to_string())
    }
}

/// What a completion handler receives.
pub type LoadResult = Result<Arc<Asset>, LoadError>;
