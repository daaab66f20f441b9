//! Persisted schema snapshot
//!
//! The manifest is the generator's durable memory of the schema it produced
//! last time. It is loaded once at the start of a run, mutated in memory by
//! the manifest builder, and saved once at the end.

use crate::keyed::KeyedList;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use strata_core::{Keyed, Persistable};

/// Read a stored flag, treating `null` the same as an absent key.
fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

// ============================================================================
// MigrationState
// ============================================================================

/// Root of the persisted manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationState {
    /// Version of the generator that last wrote this manifest
    #[serde(default)]
    pub generator_version: String,

    /// Highest migration script version allocated so far
    #[serde(default)]
    pub last_script_version: u32,

    /// One entry per table, unique by table name
    #[serde(default)]
    pub entities: KeyedList<EntityState>,
}

impl MigrationState {
    /// Create an empty manifest
    pub fn new(generator_version: impl Into<String>) -> Self {
        Self {
            generator_version: generator_version.into(),
            ..Self::default()
        }
    }

    /// Look up an entity by table name
    pub fn entity(&self, table: &str) -> Option<&EntityState> {
        self.entities.get(table)
    }

    /// Look up an entity by table name for mutation
    pub fn entity_mut(&mut self, table: &str) -> Option<&mut EntityState> {
        self.entities.get_mut(table)
    }

    /// Get the entity for `table`, creating an empty one on first reference.
    pub fn get_or_create(&mut self, table: &str) -> &mut EntityState {
        self.entities
            .get_or_insert_with(table, || EntityState::new(table))
    }

    /// Number of tracked tables
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Allocate the next migration script version.
    pub fn next_script_version(&mut self) -> u32 {
        self.last_script_version += 1;
        self.last_script_version
    }
}

impl Persistable for MigrationState {}

// ============================================================================
// EntityState
// ============================================================================

/// Snapshot of one database table
///
/// The table name is the identity key and cannot be changed in place:
///
/// ```compile_fail
/// let mut state = strata_ir::MigrationState::default();
/// state.get_or_create("users").table = "accounts".to_string();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityState {
    /// Logical model name (informational)
    #[serde(default)]
    pub name: Option<String>,

    /// Table name; the lookup key within a manifest
    table: String,

    /// Fingerprint of the creation context that produced this revision
    #[serde(default)]
    pub fingerprint: Option<String>,

    /// Columns by name
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnState>,

    /// Primary key column names, compared as a set
    #[serde(default)]
    pub pk: Vec<String>,

    #[serde(default)]
    pub audit: Option<AuditState>,

    #[serde(default)]
    pub fks: KeyedList<FkState>,

    /// Generated files for this entity
    #[serde(default)]
    pub files: KeyedList<FileState>,

    /// Many-to-many join tables owned by this entity
    #[serde(default)]
    pub joins: KeyedList<JoinState>,
}

impl EntityState {
    /// Create an empty entity for a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether audit columns are enabled for this entity
    pub fn audit_enabled(&self) -> bool {
        self.audit.as_ref().is_some_and(|a| a.enabled)
    }

    /// The stored audit type, if any
    pub fn audit_type(&self) -> Option<&str> {
        self.audit.as_ref().and_then(|a| a.audit_type.as_deref())
    }
}

impl Keyed for EntityState {
    fn key(&self) -> String {
        self.table.clone()
    }
}

// ============================================================================
// ColumnState / AuditState
// ============================================================================

/// A column as last generated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnState {
    /// SQL type
    #[serde(rename = "type")]
    pub sql_type: String,

    #[serde(default, deserialize_with = "null_as_false")]
    pub nullable: bool,

    #[serde(default, deserialize_with = "null_as_false")]
    pub unique: bool,

    #[serde(default)]
    pub default_expr: Option<String>,
}

impl ColumnState {
    /// Create a non-nullable, non-unique column without a default
    pub fn new(sql_type: impl Into<String>) -> Self {
        Self {
            sql_type: sql_type.into(),
            ..Self::default()
        }
    }
}

/// Audit column configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditState {
    #[serde(default, deserialize_with = "null_as_false")]
    pub enabled: bool,

    /// Timestamp representation used for audit columns
    #[serde(rename = "type", default)]
    pub audit_type: Option<String>,
}

// ============================================================================
// FkState
// ============================================================================

/// A foreign key, identified by its `column->refTable(refColumn)` triple
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkState {
    column: String,
    ref_table: String,
    ref_column: String,
}

impl FkState {
    pub fn new(
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            ref_table: ref_table.into(),
            ref_column: ref_column.into(),
        }
    }

    /// Referencing column
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Referenced table
    pub fn ref_table(&self) -> &str {
        &self.ref_table
    }

    /// Referenced column
    pub fn ref_column(&self) -> &str {
        &self.ref_column
    }
}

/// Render the composite identity key of a foreign key.
pub fn fk_composite_key(column: &str, ref_table: &str, ref_column: &str) -> String {
    format!("{}->{}({})", column, ref_table, ref_column)
}

impl Keyed for FkState {
    fn key(&self) -> String {
        fk_composite_key(&self.column, &self.ref_table, &self.ref_column)
    }
}

// ============================================================================
// JoinState
// ============================================================================

/// One side of a many-to-many join table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinSide {
    pub table: String,
    pub column: String,
}

impl JoinSide {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// A many-to-many join table owned by an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinState {
    /// Join table name; the identity key
    table: String,

    #[serde(default)]
    pub left: JoinSide,

    #[serde(default)]
    pub right: JoinSide,

    /// Files generated for this join table
    #[serde(default)]
    pub files: KeyedList<FileState>,
}

impl JoinState {
    /// Create a join with empty sides and no files
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Join table name
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Keyed for JoinState {
    fn key(&self) -> String {
        self.table.clone()
    }
}

// ============================================================================
// FileState
// ============================================================================

/// A generated file and the digest of its content when first registered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    file: String,
    pub hash: String,
}

impl FileState {
    pub fn new(file: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            hash: hash.into(),
        }
    }

    /// File name
    pub fn file(&self) -> &str {
        &self.file
    }
}

impl Keyed for FileState {
    fn key(&self) -> String {
        self.file.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_or_create_initializes_empty_containers() {
        let mut state = MigrationState::new("1.0.0");
        let entity = state.get_or_create("users");
        assert_eq!(entity.table(), "users");
        assert!(entity.columns.is_empty());
        assert!(entity.pk.is_empty());
        assert!(entity.fks.is_empty());
        assert!(entity.files.is_empty());
        assert!(entity.joins.is_empty());
        assert!(entity.audit.is_none());
        assert!(entity.fingerprint.is_none());
    }

    #[test]
    fn test_get_or_create_is_keyed_by_table() {
        let mut state = MigrationState::default();
        state.get_or_create("users").name = Some("User".to_string());
        state.get_or_create("users");
        state.get_or_create("roles");
        assert_eq!(state.entity_count(), 2);
        assert_eq!(state.entity("users").unwrap().name.as_deref(), Some("User"));
    }

    #[test]
    fn test_next_script_version() {
        let mut state = MigrationState::default();
        assert_eq!(state.next_script_version(), 1);
        assert_eq!(state.next_script_version(), 2);
        assert_eq!(state.last_script_version, 2);
    }

    #[test]
    fn test_fk_composite_key() {
        let fk = FkState::new("role_id", "roles", "id");
        assert_eq!(fk.key(), "role_id->roles(id)");
    }

    #[test]
    fn test_audit_accessors() {
        let mut entity = EntityState::new("users");
        assert!(!entity.audit_enabled());
        assert_eq!(entity.audit_type(), None);

        entity.audit = Some(AuditState {
            enabled: true,
            audit_type: Some("Instant".to_string()),
        });
        assert!(entity.audit_enabled());
        assert_eq!(entity.audit_type(), Some("Instant"));
    }

    #[test]
    fn test_manifest_json_shape() {
        let mut state = MigrationState::new("2.1.0");
        let entity = state.get_or_create("users");
        entity
            .columns
            .insert("id".to_string(), ColumnState::new("BIGINT"));
        entity.fks.insert_if_absent(FkState::new("role_id", "roles", "id"));

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["generatorVersion"], "2.1.0");
        assert_eq!(value["lastScriptVersion"], 0);
        assert_eq!(value["entities"][0]["columns"]["id"]["type"], "BIGINT");
        assert_eq!(value["entities"][0]["columns"]["id"]["defaultExpr"], serde_json::Value::Null);
        assert_eq!(value["entities"][0]["fks"][0]["refTable"], "roles");
    }

    #[test]
    fn test_sparse_manifest_loads_with_defaults() {
        let json = r#"{"entities":[{"table":"users","columns":{"id":{"type":"BIGINT"}}}]}"#;
        let state: MigrationState = serde_json::from_str(json).unwrap();
        let users = state.entity("users").unwrap();
        assert_eq!(users.columns["id"], ColumnState::new("BIGINT"));
        assert!(users.fks.is_empty());
        assert_eq!(state.last_script_version, 0);
    }

    #[test]
    fn test_null_flags_read_as_false() {
        let json = r#"{"entities":[{"table":"users",
            "columns":{"id":{"type":"BIGINT","nullable":null,"unique":null,"defaultExpr":null}},
            "audit":{"enabled":null,"type":null}}]}"#;
        let state: MigrationState = serde_json::from_str(json).unwrap();
        let users = state.entity("users").unwrap();
        assert_eq!(users.columns["id"], ColumnState::new("BIGINT"));
        assert_eq!(users.audit, Some(AuditState::default()));
        assert!(!users.audit_enabled());
    }

    #[test]
    fn test_key_accessors() {
        let fk = FkState::new("role_id", "roles", "id");
        assert_eq!((fk.column(), fk.ref_table(), fk.ref_column()), ("role_id", "roles", "id"));
        assert_eq!(JoinState::new("user_groups").table(), "user_groups");
        assert_eq!(FileState::new("User.java", "abc").file(), "User.java");
    }
}
