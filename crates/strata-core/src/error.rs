use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a failed load, one per pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The request itself was malformed (no source, two sources, bad location).
    InvalidRequest,
    /// The document or one of its dependencies could not be fetched.
    Fetch,
    /// The document is malformed or fails validation.
    Parse,
    /// A buffer or image payload could not be decoded.
    Codec,
    /// Internal invariant violation while linking the final asset.
    Assembly,
    /// Animation cache failure. Never terminal; logged and recovered.
    Cache,
    /// The loader was dropped before the load finished.
    Shutdown,
}

impl ErrorKind {
    /// Whether a failure of this kind ends the load.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ErrorKind::Cache)
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::Fetch => "FetchError",
            ErrorKind::Parse => "ParseError",
            ErrorKind::Codec => "CodecError",
            ErrorKind::Assembly => "AssemblyError",
            ErrorKind::Cache => "CacheError",
            ErrorKind::Shutdown => "Shutdown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced while interpreting a loading options map.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptionsError {
    #[error("option '{key}' expects {expected}, got {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("option '{key}' is out of range: {value}")]
    OutOfRange { key: String, value: String },
}
