//! Core traits for Strata
//!
//! This module defines the traits shared across the workspace: identity keys
//! for deduplicated collections and file persistence for manifests.

use crate::error::{EngineError, EngineResult};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;

// ============================================================================
// Keyed Trait
// ============================================================================

/// Trait for values whose membership in a collection is decided by an
/// identity key rather than full-value equality.
///
/// # Example
///
/// ```rust,ignore
/// use strata_core::Keyed;
///
/// struct FileEntry {
///     file: String,
///     hash: String,
/// }
///
/// impl Keyed for FileEntry {
///     fn key(&self) -> String {
///         self.file.clone()
///     }
/// }
/// ```
pub trait Keyed {
    /// The identity key of this value
    fn key(&self) -> String;
}

// ============================================================================
// Persistable Trait
// ============================================================================

/// Supported on-disk encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Pick the format from a path's extension (`.yaml`/`.yml` → YAML, else JSON)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// Trait for types that can be serialized to and deserialized from files
pub trait Persistable: Serialize + DeserializeOwned + Sized {
    /// Encode to a string in the given format
    fn encode(&self, format: Format) -> EngineResult<String> {
        match format {
            Format::Json => serde_json::to_string_pretty(self).map_err(Into::into),
            Format::Yaml => serde_yaml::to_string(self).map_err(Into::into),
        }
    }

    /// Decode from a string in the given format
    fn decode(text: &str, format: Format) -> EngineResult<Self> {
        match format {
            Format::Json => serde_json::from_str(text).map_err(Into::into),
            Format::Yaml => serde_yaml::from_str(text).map_err(Into::into),
        }
    }

    /// Save to a file, format chosen by extension
    fn save_to_file(&self, path: &Path) -> EngineResult<()> {
        let text = self.encode(Format::from_path(path))?;
        std::fs::write(path, text).map_err(|e| EngineError::FileWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from a file, format chosen by extension
    fn load_from_file(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::decode(&text, Format::from_path(path))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    impl Persistable for Sample {}

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("m.yaml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("m.yml")), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("m.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("manifest")), Format::Json);
    }

    #[test]
    fn test_save_and_load_both_formats() {
        let dir = TempDir::new().unwrap();
        let sample = Sample {
            name: "users".to_string(),
            count: 3,
        };

        for file in ["s.json", "s.yaml"] {
            let path = dir.path().join(file);
            sample.save_to_file(&path).unwrap();
            assert_eq!(Sample::load_from_file(&path).unwrap(), sample);
        }
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = Sample::load_from_file(Path::new("/nonexistent/s.json")).unwrap_err();
        assert!(err.is_io());
    }
}
