//! Saving and loading manifests and entity inputs
//!
//! Manifests are stored as pretty JSON, or YAML when the path ends in
//! `.yaml`/`.yml`. A manifest that does not exist yet loads as an empty
//! snapshot, which is how the first run of a project starts.

use crate::context::EntityInput;
use crate::state::MigrationState;
use strata_core::{EngineError, EngineResult, Format, Persistable, ResultExt};
use std::path::{Path, PathBuf};

// ============================================================================
// Manifest
// ============================================================================

/// Load a manifest, or return an empty one if the file does not exist.
pub fn load_manifest(path: impl AsRef<Path>) -> EngineResult<MigrationState> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No manifest at {}, starting empty", path.display());
        return Ok(MigrationState::default());
    }

    let text = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    manifest_from_str(&text, Format::from_path(path)).map_err(|e| EngineError::InvalidManifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Save a manifest, creating parent directories as needed.
pub fn save_manifest(state: &MigrationState, path: impl AsRef<Path>) -> EngineResult<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| EngineError::DirectoryCreate {
                path: parent.to_path_buf(),
                message: e.to_string(),
            })?;
        }
    }

    state.save_to_file(path)?;
    tracing::debug!(
        "Saved manifest with {} entities to {}",
        state.entity_count(),
        path.display()
    );
    Ok(())
}

/// Encode a manifest as text
pub fn manifest_to_string(state: &MigrationState, format: Format) -> EngineResult<String> {
    state.encode(format)
}

/// Decode a manifest from text
pub fn manifest_from_str(text: &str, format: Format) -> EngineResult<MigrationState> {
    MigrationState::decode(text, format)
}

/// Copy an existing manifest to `<path>.bak` before it is overwritten.
pub fn backup_manifest(path: impl AsRef<Path>) -> EngineResult<Option<PathBuf>> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(None);
    }

    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    let backup_path = PathBuf::from(backup);

    std::fs::copy(path, &backup_path)
        .with_context(format!("Failed to back up manifest to {}", backup_path.display()))?;

    Ok(Some(backup_path))
}

// ============================================================================
// Entity inputs
// ============================================================================

/// Load the list of entity inputs for a run (JSON or YAML array).
pub fn load_inputs(path: impl AsRef<Path>) -> EngineResult<Vec<EntityInput>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| EngineError::FileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    inputs_from_str(&text, Format::from_path(path))
}

/// Decode entity inputs from text
pub fn inputs_from_str(text: &str, format: Format) -> EngineResult<Vec<EntityInput>> {
    InputList::decode(text, format)
        .map(|list| list.0)
        .map_err(|e| EngineError::invalid_input(e.to_string()))
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
struct InputList(Vec<EntityInput>);

impl Persistable for InputList {}

// ============================================================================
// Tests
// ============================================================================
