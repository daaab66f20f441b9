//! # Strata Codegen
//!
//! Migration engine for Strata.
//!
//! This crate remembers the database schema a generator produced on earlier
//! runs and works out the minimal change set for the current run, so that
//! incremental SQL migrations can be written.
//!
//! ## Features
//!
//! - **Manifest Builder**: idempotent upserts of per-entity schema facts
//! - **Diff Engine**: structured additions, removals and modifications
//! - **Fingerprints**: order-independent "nothing changed" short-circuit
//! - **Generation Session**: per-run orchestration and script numbering
//!

// ============================================================================
// Modules
// ============================================================================

pub mod migrations;
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use migrations::{
    AddedColumn, ColumnChange, DiffResult, ManifestBuilder, diff, fingerprint, fingerprint_with,
};
pub use session::{EntityOutcome, EntityStatus, GenerationSession, SessionSummary};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_core::{EngineError, EngineResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default location of the manifest
pub const DEFAULT_MANIFEST_PATH: &str = "migrations/manifest.json";

// ============================================================================
// GeneratorConfig
// ============================================================================

/// Configuration for a generation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Where the manifest is loaded from and saved to
    pub manifest_path: PathBuf,

    /// Version stamped into the manifest at the end of a run
    pub generator_version: String,

    /// Skip the diff when an entity's fingerprint matches the stored one
    pub short_circuit_unchanged: bool,

    /// Prefix of migration script names (e.g. `V` → `V3__alter_users.sql`)
    pub script_prefix: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            generator_version: VERSION.to_string(),
            short_circuit_unchanged: true,
            script_prefix: "V".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EngineError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration for unusable values
    pub fn validate(&self) -> EngineResult<()> {
        if self.manifest_path.as_os_str().is_empty() {
            return Err(EngineError::invalid_config("manifest_path must not be empty"));
        }
        if self.script_prefix.contains(['/', '\\']) {
            return Err(EngineError::invalid_config(format!(
                "script_prefix '{}' must not contain path separators",
                self.script_prefix
            )));
        }
        Ok(())
    }

    /// Set the manifest path
    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    /// Set the generator version
    pub fn with_generator_version(mut self, version: impl Into<String>) -> Self {
        self.generator_version = version.into();
        self
    }

    /// Always run the diff, even when fingerprints match
    pub fn without_short_circuit(mut self) -> Self {
        self.short_circuit_unchanged = false;
        self
    }

    /// Set the script name prefix
    pub fn with_script_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.script_prefix = prefix.into();
        self
    }

    /// Name of the migration script for a version
    pub fn script_name(&self, version: u32, description: &str) -> String {
        format!("{}{}__{}.sql", self.script_prefix, version, description)
    }
}

// ============================================================================
// Tests
// ============================================================================
