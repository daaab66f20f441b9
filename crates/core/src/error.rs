//! Error types for Strata
//!
//! This module provides unified error handling across the manifest engine,
//! including fingerprint failures, manifest IO, input parsing and
//! configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Strata
#[derive(Debug, Error)]
pub enum EngineError {
    // ========================================================================
    // Fingerprint Errors
    // ========================================================================
    /// Canonical serialization of a creation context failed
    #[error("Failed to compute fingerprint for table '{table}': {message}")]
    Fingerprint { table: String, message: String },

    // ========================================================================
    // Manifest Errors
    // ========================================================================
    /// Manifest file could not be parsed
    #[error("Invalid manifest '{path}': {message}")]
    InvalidManifest { path: PathBuf, message: String },

    /// Entity input could not be parsed
    #[error("Invalid entity input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// File IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File read error
    #[error("Failed to read file '{path}': {message}")]
    FileRead { path: PathBuf, message: String },

    /// File write error
    #[error("Failed to write file '{path}': {message}")]
    FileWrite { path: PathBuf, message: String },

    /// Directory creation failed
    #[error("Failed to create directory '{path}': {message}")]
    DirectoryCreate { path: PathBuf, message: String },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML serialization error: {0}")]
    YamlSerialization(#[from] serde_yaml::Error),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Error with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },
}

impl EngineError {
    /// Create a fingerprint error for a table
    pub fn fingerprint(table: impl Into<String>, msg: impl Into<String>) -> Self {
        EngineError::Fingerprint {
            table: table.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        EngineError::InvalidInput(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        EngineError::InvalidConfig(msg.into())
    }

    /// Check if this error is an IO error
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            EngineError::Io(_)
                | EngineError::FileRead { .. }
                | EngineError::FileWrite { .. }
                | EngineError::DirectoryCreate { .. }
        )
    }

    /// Check if this error came from (de)serialization
    pub fn is_serialization(&self) -> bool {
        matches!(
            self,
            EngineError::JsonSerialization(_)
                | EngineError::YamlSerialization(_)
                | EngineError::InvalidManifest { .. }
                | EngineError::InvalidInput(_)
                | EngineError::Fingerprint { .. }
        )
    }
}

/// Result type alias using EngineError
pub type EngineResult<T> = Result<T, EngineError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn with_context<C: Into<String>>(self, context: C) -> EngineResult<T>;
}

impl<T, E: Into<EngineError>> ResultExt<T> for Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> EngineResult<T> {
        self.map_err(|e| {
            let err: EngineError = e.into();
            EngineError::WithContext {
                context: context.into(),
                message: err.to_string(),
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_error() {
        let err = EngineError::fingerprint("users", "unserializable value");
        assert!(err.is_serialization());
        assert!(!err.is_io());
        assert_eq!(
            err.to_string(),
            "Failed to compute fingerprint for table 'users': unserializable value"
        );
    }

    #[test]
    fn test_invalid_manifest_error() {
        let err = EngineError::InvalidManifest {
            path: PathBuf::from("schema/manifest.json"),
            message: "expected value at line 1".to_string(),
        };
        assert!(err.is_serialization());
        assert_eq!(
            err.to_string(),
            "Invalid manifest 'schema/manifest.json': expected value at line 1"
        );
    }

    #[test]
    fn test_result_ext_wraps_message() {
        let res: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.with_context("Loading manifest").unwrap_err();
        assert_eq!(err.to_string(), "Loading manifest: IO error: denied");
    }

    #[test]
    fn test_io_error_classification() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EngineError = io_err.into();
        assert!(err.is_io());
        assert!(!err.is_serialization());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: EngineError = json_err.into();
        assert!(err.is_serialization());
        assert!(err.to_string().starts_with("JSON serialization error"));
    }
}
