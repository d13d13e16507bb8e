use strata_core::ErrorKind;
use strata_fetch::FetchError;

/// Errors that can occur while turning document bytes into an asset.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid binary container: {0}")]
    Container(String),

    #[error("{0}")]
    Gltf(#[from] gltf::Error),

    #[error("invalid document: {0}")]
    Invalid(String),

    #[error("unrecognized field '{0}' rejected by strict validation")]
    UnknownField(String),

    #[error("extension data rejected by strict validation: {0}")]
    Extension(String),

    #[error("failed to fetch '{reference}': {source}")]
    Fetch {
        reference: String,
        #[source]
        source: FetchError,
    },

    #[error("buffer {index} declares {expected} bytes but only {actual} were loaded")]
    BufferLength {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("failed to decode {0}: {1}")]
    Codec(String, String),

    #[error("assembly invariant violated: {0}")]
    Assembly(String),
}

impl AssetError {
    /// The pipeline stage this error is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssetError::Json(_)
            | AssetError::Container(_)
            | AssetError::Gltf(_)
            | AssetError::Invalid(_)
            | AssetError::UnknownField(_)
            | AssetError::Extension(_)
            | AssetError::BufferLength { .. } => ErrorKind::Parse,
            AssetError::Fetch { .. } => ErrorKind::Fetch,
            AssetError::Codec(..) => ErrorKind::Codec,
            AssetError::Assembly(_) => ErrorKind::Assembly,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AssetError::Invalid(message.into())
    }
}
