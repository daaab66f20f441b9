//! Creation contexts
//!
//! A creation context is the per-entity description of the desired schema,
//! produced upstream from the model definitions. Fields are
//! optional because upstream derivation is loosely typed; the coercion rules
//! applied to missing values live here so they are explicit and tested:
//!
//! - booleans count only when they are exactly `true` (a string `"true"`,
//!   `null` or a missing key all read as `false`)
//! - missing text used in identity keys or column types renders as the
//!   literal `"null"`
//! - a primary key CSV of `"null"` (or no value) means no primary key

use crate::state::{ColumnState, FkState, JoinSide, fk_composite_key};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Text rendered for a missing value
pub const NULL_TEXT: &str = "null";

/// Render an optional string, using [`NULL_TEXT`] when absent.
pub fn coerce_text(value: Option<&str>) -> String {
    value.unwrap_or(NULL_TEXT).to_string()
}

/// Split a comma-separated list, trimming tokens and dropping empties.
///
/// `None` and the literal `"null"` both yield an empty list. Duplicates are
/// kept.
pub fn split_csv(csv: Option<&str>) -> Vec<String> {
    match csv {
        None | Some(NULL_TEXT) => Vec::new(),
        Some(text) => text
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn null_text() -> String {
    NULL_TEXT.to_string()
}

/// Deserialize a name that may be missing or `null`, coercing it to [`NULL_TEXT`].
fn text_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(coerce_text(value.as_deref()))
}

/// Deserialize a flag that is only set when the input is exactly boolean `true`.
fn strict_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(matches!(value, Some(Value::Bool(true))))
}

// ============================================================================
// ColumnDef
// ============================================================================

/// A column as described by the creation context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub sql_type: Option<String>,

    #[serde(default, deserialize_with = "strict_true")]
    pub nullable: bool,

    #[serde(default, deserialize_with = "strict_true")]
    pub unique: bool,

    #[serde(default)]
    pub default_expr: Option<String>,
}

impl ColumnDef {
    /// Create a non-nullable, non-unique column
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            sql_type: Some(sql_type.into()),
            ..Self::default()
        }
    }

    /// Mark the column nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the column unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the default expression
    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default_expr = Some(expr.into());
        self
    }

    /// Column name used as the map key
    pub fn key(&self) -> String {
        coerce_text(self.name.as_deref())
    }

    /// Project into the persisted column shape
    pub fn to_state(&self) -> ColumnState {
        ColumnState {
            sql_type: coerce_text(self.sql_type.as_deref()),
            nullable: self.nullable,
            unique: self.unique,
            default_expr: self.default_expr.clone(),
        }
    }
}

// ============================================================================
// FkDef / FkContext
// ============================================================================

/// A foreign key as described by the creation context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FkDef {
    #[serde(default)]
    pub column: Option<String>,

    #[serde(default)]
    pub ref_table: Option<String>,

    #[serde(default)]
    pub ref_column: Option<String>,
}

impl FkDef {
    pub fn new(
        column: impl Into<String>,
        ref_table: impl Into<String>,
        ref_column: impl Into<String>,
    ) -> Self {
        Self {
            column: Some(column.into()),
            ref_table: Some(ref_table.into()),
            ref_column: Some(ref_column.into()),
        }
    }

    /// Composite identity key (`column->refTable(refColumn)`)
    pub fn key(&self) -> String {
        fk_composite_key(
            &coerce_text(self.column.as_deref()),
            &coerce_text(self.ref_table.as_deref()),
            &coerce_text(self.ref_column.as_deref()),
        )
    }

    /// Project into the persisted foreign key shape
    pub fn to_state(&self) -> FkState {
        FkState::new(
            coerce_text(self.column.as_deref()),
            coerce_text(self.ref_table.as_deref()),
            coerce_text(self.ref_column.as_deref()),
        )
    }
}

/// Foreign key bundle handed to the manifest builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FkContext {
    #[serde(default)]
    pub fks: Option<Vec<FkDef>>,
}

impl FkContext {
    pub fn new(fks: Vec<FkDef>) -> Self {
        Self { fks: Some(fks) }
    }

    /// The described foreign keys, empty when absent
    pub fn fks(&self) -> &[FkDef] {
        self.fks.as_deref().unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fks().is_empty()
    }
}

// ============================================================================
// JoinContext
// ============================================================================

/// A many-to-many join descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinContext {
    #[serde(default = "null_text", deserialize_with = "text_or_null")]
    pub join_table: String,

    #[serde(default)]
    pub left: JoinSide,

    #[serde(default)]
    pub right: JoinSide,
}

impl JoinContext {
    pub fn new(join_table: impl Into<String>, left: JoinSide, right: JoinSide) -> Self {
        Self {
            join_table: join_table.into(),
            left,
            right,
        }
    }
}

// ============================================================================
// CreateContext
// ============================================================================

/// Desired schema of one entity for the current run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContext {
    #[serde(default)]
    pub table: Option<String>,

    #[serde(default)]
    pub columns: Option<Vec<ColumnDef>>,

    /// Primary key columns as CSV
    #[serde(default)]
    pub pk_columns: Option<String>,

    #[serde(default, deserialize_with = "strict_true")]
    pub audit_enabled: bool,

    #[serde(default)]
    pub audit_created_type: Option<String>,

    /// Preferred foreign key source
    #[serde(default)]
    pub fks_ctx: Option<FkContext>,

    /// Fallback foreign key source when `fks_ctx` carries none
    #[serde(default)]
    pub fks: Option<Vec<FkDef>>,
}

impl CreateContext {
    /// Create an empty context for a table
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Self::default()
        }
    }

    /// Append a column
    pub fn with_column(mut self, column: ColumnDef) -> Self {
        self.columns.get_or_insert_with(Vec::new).push(column);
        self
    }

    /// Set the primary key CSV
    pub fn with_pk(mut self, csv: impl Into<String>) -> Self {
        self.pk_columns = Some(csv.into());
        self
    }

    /// Enable audit columns with the given type
    pub fn with_audit(mut self, audit_type: impl Into<String>) -> Self {
        self.audit_enabled = true;
        self.audit_created_type = Some(audit_type.into());
        self
    }

    /// Set the foreign keys (as a `fksCtx` bundle)
    pub fn with_fks(mut self, fks: Vec<FkDef>) -> Self {
        self.fks_ctx = Some(FkContext::new(fks));
        self
    }

    /// Table name, coerced
    pub fn table_name(&self) -> String {
        coerce_text(self.table.as_deref())
    }

    /// Column definitions, empty when absent
    pub fn column_defs(&self) -> &[ColumnDef] {
        self.columns.as_deref().unwrap_or(&[])
    }

    /// Columns keyed by name in first-seen order.
    ///
    /// A repeated name keeps its first position and takes the last
    /// definition.
    pub fn ordered_columns(&self) -> Vec<(String, ColumnState)> {
        let mut out: Vec<(String, ColumnState)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for def in self.column_defs() {
            let name = def.key();
            let state = def.to_state();
            match positions.get(&name) {
                Some(&i) => out[i].1 = state,
                None => {
                    positions.insert(name.clone(), out.len());
                    out.push((name, state));
                }
            }
        }
        out
    }

    /// Parsed primary key, in declared order
    pub fn pk_list(&self) -> Vec<String> {
        split_csv(self.pk_columns.as_deref())
    }

    /// Foreign keys from `fks_ctx.fks` if present, else from `fks`.
    pub fn foreign_keys(&self) -> &[FkDef] {
        self.fks_ctx
            .as_ref()
            .and_then(|c| c.fks.as_deref())
            .or(self.fks.as_deref())
            .unwrap_or(&[])
    }

    /// Foreign keys bundled for the manifest builder
    pub fn fk_context(&self) -> FkContext {
        FkContext::new(self.foreign_keys().to_vec())
    }
}

// ============================================================================
// EntityInput
// ============================================================================

/// A generated file to register against an entity or join
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInput {
    #[serde(default = "null_text", deserialize_with = "text_or_null")]
    pub file: String,

    #[serde(default)]
    pub content: String,
}

/// A generated file belonging to one of the entity's join tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinFileInput {
    #[serde(default = "null_text", deserialize_with = "text_or_null")]
    pub join_table: String,

    #[serde(default = "null_text", deserialize_with = "text_or_null")]
    pub file: String,

    #[serde(default)]
    pub content: String,
}

/// Everything one run knows about an entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityInput {
    #[serde(default = "null_text", deserialize_with = "text_or_null")]
    pub model_name: String,

    #[serde(default = "null_text", deserialize_with = "text_or_null")]
    pub table: String,

    #[serde(default)]
    pub create: CreateContext,

    #[serde(default)]
    pub joins: Vec<JoinContext>,

    #[serde(default)]
    pub files: Vec<FileInput>,

    #[serde(default)]
    pub join_files: Vec<JoinFileInput>,
}

impl EntityInput {
    pub fn new(model_name: impl Into<String>, table: impl Into<String>, create: CreateContext) -> Self {
        Self {
            model_name: model_name.into(),
            table: table.into(),
            create,
            ..Self::default()
        }
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
    fn test_split_csv() {
        assert_eq!(split_csv(Some(" id , tenant_id,, ")), vec!["id", "tenant_id"]);
        assert_eq!(split_csv(Some("id,id")), vec!["id", "id"]);
        assert!(split_csv(Some("null")).is_empty());
        assert!(split_csv(None).is_empty());
        assert!(split_csv(Some("  ")).is_empty());
    }

    #[test]
    fn test_flags_are_exactly_true() {
        let json = r#"{
            "table": "users",
            "auditEnabled": "true",
            "columns": [
                {"name": "a", "sqlType": "TEXT", "nullable": true, "unique": 1},
                {"name": "b", "sqlType": "TEXT", "nullable": null}
            ]
        }"#;
        let ctx: CreateContext = serde_json::from_str(json).unwrap();
        assert!(!ctx.audit_enabled);
        let cols = ctx.column_defs();
        assert!(cols[0].nullable);
        assert!(!cols[0].unique);
        assert!(!cols[1].nullable);
        assert!(!cols[1].unique);
    }

    #[test]
    fn test_missing_text_renders_null() {
        let fk = FkDef {
            column: Some("role_id".to_string()),
            ref_table: None,
            ref_column: Some("id".to_string()),
        };
        assert_eq!(fk.key(), "role_id->null(id)");
        assert_eq!(fk.to_state().ref_table(), "null");

        let col = ColumnDef {
            name: Some("x".to_string()),
            ..ColumnDef::default()
        };
        assert_eq!(col.to_state().sql_type, "null");
        assert_eq!(CreateContext::default().table_name(), "null");
    }

    #[test]
    fn test_ordered_columns_keeps_first_position_last_value() {
        let ctx = CreateContext::new("t")
            .with_column(ColumnDef::new("id", "BIGINT"))
            .with_column(ColumnDef::new("name", "TEXT"))
            .with_column(ColumnDef::new("id", "UUID"));
        let cols = ctx.ordered_columns();
        assert_eq!(cols.len(), 2);
        assert_eq!(cols[0].0, "id");
        assert_eq!(cols[0].1.sql_type, "UUID");
        assert_eq!(cols[1].0, "name");
    }

    #[test]
    fn test_foreign_keys_prefers_fks_ctx() {
        let mut ctx = CreateContext::new("users");
        ctx.fks = Some(vec![FkDef::new("a", "b", "c")]);
        assert_eq!(ctx.foreign_keys()[0].key(), "a->b(c)");

        let ctx = ctx.with_fks(vec![FkDef::new("role_id", "roles", "id")]);
        assert_eq!(ctx.foreign_keys().len(), 1);
        assert_eq!(ctx.foreign_keys()[0].key(), "role_id->roles(id)");

        let mut ctx = ctx;
        ctx.fks_ctx = Some(FkContext { fks: None });
        assert_eq!(ctx.foreign_keys()[0].key(), "a->b(c)");
    }

    #[test]
    fn test_pk_list() {
        assert_eq!(CreateContext::new("t").with_pk("tenant_id, id").pk_list(), vec!["tenant_id", "id"]);
        assert!(CreateContext::new("t").with_pk("null").pk_list().is_empty());
        assert!(CreateContext::new("t").pk_list().is_empty());
    }

    #[test]
    fn test_entity_input_from_json() {
        let json = r#"{
            "modelName": "User",
            "table": "users",
            "create": {
                "table": "users",
                "columns": [{"name": "id", "sqlType": "BIGINT"}],
                "pkColumns": "id",
                "auditEnabled": true,
                "auditCreatedType": "Instant",
                "fksCtx": {"fks": [{"column": "role_id", "refTable": "roles", "refColumn": "id"}]}
            },
            "joins": [{
                "joinTable": "user_groups",
                "left": {"table": "users", "column": "user_id"},
                "right": {"table": "groups", "column": "group_id"}
            }],
            "files": [{"file": "User.java", "content": "class User {}"}],
            "joinFiles": [{"joinTable": "user_groups", "file": "UserGroup.java"}]
        }"#;
        let input: EntityInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.model_name, "User");
        assert!(input.create.audit_enabled);
        assert_eq!(input.create.foreign_keys().len(), 1);
        assert_eq!(input.joins[0].right, JoinSide::new("groups", "group_id"));
        assert_eq!(input.join_files[0].content, "");
    }

    #[test]
    fn test_entity_input_missing_names_render_null() {
        let json = r#"{
            "table": null,
            "joins": [{"left": {"table": "users"}}],
            "files": [{"content": "x"}],
            "joinFiles": [{"file": null}]
        }"#;
        let input: EntityInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.model_name, NULL_TEXT);
        assert_eq!(input.table, NULL_TEXT);
        assert_eq!(input.create, CreateContext::default());
        assert_eq!(input.joins[0].join_table, NULL_TEXT);
        assert_eq!(input.joins[0].left, JoinSide::new("users", ""));
        assert_eq!(input.files[0].file, NULL_TEXT);
        assert_eq!(input.join_files[0].join_table, NULL_TEXT);
        assert_eq!(input.join_files[0].file, NULL_TEXT);
    }
}
