use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::FetchError;

/// An absolute address of a resource: an `http(s)://` or `file://` URL.
///
/// Plain filesystem paths are accepted and converted to `file://` URLs, with
/// relative paths resolved against the current directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location(Url);

impl Location {
    pub fn parse(input: &str) -> Result<Self, FetchError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(FetchError::InvalidLocation(input.into(), "empty location".into()));
        }

        if input.contains("://") {
            return Url::parse(input)
                .map(Self)
                .map_err(|e| FetchError::InvalidLocation(input.into(), e.to_string()));
        }

        Self::from_path(Path::new(input))
    }

    pub fn from_path(path: &Path) -> Result<Self, FetchError> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| FetchError::Io(path.display().to_string(), e))?
                .join(path)
        };

        Url::from_file_path(&absolute).map(Self).map_err(|_| {
            FetchError::InvalidLocation(absolute.display().to_string(), "not a valid file path".into())
        })
    }

    /// Resolve a reference found inside the document at this location.
    pub fn join(&self, reference: &str) -> Result<Self, FetchError> {
        self.0
            .join(reference)
            .map(Self)
            .map_err(|e| FetchError::InvalidLocation(reference.into(), e.to_string()))
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    /// Filesystem path for `file://` locations.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.scheme() == "file" {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_http_urls() {
        let loc = Location::parse("https://cdn.example.com/models/fox.gltf").unwrap();
        assert_eq!(loc.scheme(), "https");
        assert!(loc.to_file_path().is_none());
    }

    #[test]
    fn absolute_paths_become_file_urls() {
        let loc = Location::parse("/tmp/models/fox.gltf").unwrap();
        assert_eq!(loc.scheme(), "file");
        assert_eq!(loc.to_file_path(), Some(PathBuf::from("/tmp/models/fox.gltf")));
    }

    #[test]
    fn relative_references_join_against_the_document() {
        let doc = Location::parse("https://cdn.example.com/models/fox.gltf").unwrap();
        let buffer = doc.join("fox.bin").unwrap();
        assert_eq!(buffer.as_str(), "https://cdn.example.com/models/fox.bin");

        let texture = doc.join("../textures/fur.png").unwrap();
        assert_eq!(texture.as_str(), "https://cdn.example.com/textures/fur.png");
    }

    #[test]
    fn absolute_references_replace_the_base() {
        let doc = Location::parse("/tmp/a/scene.gltf").unwrap();
        let other = doc.join("https://example.com/b.bin").unwrap();
        assert_eq!(other.scheme(), "https");
    }

    #[test]
    fn empty_and_garbage_locations_fail() {
        assert!(Location::parse("").is_err());
        assert!(Location::parse("http://[::1").is_err());
    }
}
