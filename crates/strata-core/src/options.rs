//! Loading options
//!
//! Callers historically pass options as a loose name/value map. Here they are
//! a struct with named fields; maps are still accepted through
//! [`LoadOptions::from_map`], which ignores keys it does not recognize.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::OptionsError;

/// Recognized option names in the map form.
pub const GENERATE_NORMALS_IF_MISSING: &str = "generateNormalsIfMissing";
pub const VALIDATE_STRICT: &str = "validateStrict";
pub const MAX_TEXTURE_SIZE: &str = "maxTextureSize";

/// Options that affect how a document is parsed and assembled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadOptions {
    /// Compute smooth normals for triangle primitives that have none. Default: false.
    pub generate_normals_if_missing: bool,
    /// Reject documents carrying fields this loader does not recognize. Default: false.
    pub validate_strict: bool,
    /// Largest allowed texture edge in pixels; larger images are downsized. Default: unlimited.
    pub max_texture_size: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            generate_normals_if_missing: false,
            validate_strict: false,
            max_texture_size: None,
        }
    }
}

impl LoadOptions {
    /// Build options from a name/value map. Unknown keys are ignored; known keys
    /// with the wrong type are rejected.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, OptionsError> {
        let mut options = Self::default();

        if let Some(value) = map.get(GENERATE_NORMALS_IF_MISSING) {
            options.generate_normals_if_missing = expect_bool(GENERATE_NORMALS_IF_MISSING, value)?;
        }
        if let Some(value) = map.get(VALIDATE_STRICT) {
            options.validate_strict = expect_bool(VALIDATE_STRICT, value)?;
        }
        if let Some(value) = map.get(MAX_TEXTURE_SIZE) {
            options.max_texture_size = match value {
                Value::Null => None,
                Value::Number(n) => {
                    let size = n.as_u64().ok_or_else(|| OptionsError::OutOfRange {
                        key: MAX_TEXTURE_SIZE.into(),
                        value: n.to_string(),
                    })?;
                    if size == 0 || size > u32::MAX as u64 {
                        return Err(OptionsError::OutOfRange {
                            key: MAX_TEXTURE_SIZE.into(),
                            value: n.to_string(),
                        });
                    }
                    Some(size as u32)
                }
                other => {
                    return Err(OptionsError::WrongType {
                        key: MAX_TEXTURE_SIZE.into(),
                        expected: "an integer",
                        found: other.to_string(),
                    })
                }
            };
        }

        Ok(options)
    }

    pub fn with_generate_normals(mut self, enabled: bool) -> Self {
        self.generate_normals_if_missing = enabled;
        self
    }

    pub fn with_strict_validation(mut self, enabled: bool) -> Self {
        self.validate_strict = enabled;
        self
    }

    pub fn with_max_texture_size(mut self, size: Option<u32>) -> Self {
        self.max_texture_size = size;
        self
    }

    /// Stable textual form used when fingerprinting a request.
    pub fn fingerprint_fields(&self) -> String {
        format!(
            "normals={};strict={};max_texture={}",
            self.generate_normals_if_missing,
            self.validate_strict,
            self.max_texture_size.map_or(0, |s| s)
        )
    }
}

fn expect_bool(key: &str, value: &Value) -> Result<bool, OptionsError> {
    value.as_bool().ok_or_else(|| OptionsError::WrongType {
        key: key.into(),
        expected: "a boolean",
        found: value.to_string(),
    })
}
