//! # Diff Engine
//!
//! Compares the stored [`EntityState`] of a table against the creation
//! context of the current run and reports what a migration has to do.
//!
//! Identity is by name only: a renamed column or foreign key shows up as one
//! removal plus one addition. Primary keys compare as sets, so reordering the
//! key columns is not a change.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use strata_core::Keyed;
use strata_ir::{ColumnState, CreateContext, EntityState, FkState, KeyedList};

// ============================================================================
// Result types
// ============================================================================

/// A column present only in the new context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedColumn {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub unique: bool,
    pub default_expr: Option<String>,
}

impl AddedColumn {
    fn from_state(name: String, column: ColumnState) -> Self {
        Self {
            name,
            sql_type: column.sql_type,
            nullable: column.nullable,
            unique: column.unique,
            default_expr: column.default_expr,
        }
    }
}

/// A column present on both sides whose attributes differ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnChange {
    pub name: String,
    pub before: ColumnState,
    pub after: ColumnState,
    pub type_changed: bool,
    pub nullable_changed: bool,
    pub unique_changed: bool,
    pub default_changed: bool,
}

impl ColumnChange {
    /// Compare two revisions of the same column
    pub fn between(name: impl Into<String>, before: &ColumnState, after: &ColumnState) -> Self {
        Self {
            name: name.into(),
            type_changed: before.sql_type != after.sql_type,
            nullable_changed: before.nullable != after.nullable,
            unique_changed: before.unique != after.unique,
            default_changed: before.default_expr != after.default_expr,
            before: before.clone(),
            after: after.clone(),
        }
    }

    /// Whether any attribute changed
    pub fn has_changes(&self) -> bool {
        self.type_changed || self.nullable_changed || self.unique_changed || self.default_changed
    }
}

/// Structured change set for one entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub added_columns: Vec<AddedColumn>,
    pub removed_columns: Vec<String>,
    pub modified_columns: Vec<ColumnChange>,

    pub pk_changed: bool,
    /// New primary key in declared order; empty unless `pk_changed`
    pub new_pk: Vec<String>,

    pub added_fks: Vec<FkState>,
    pub removed_fks: Vec<FkState>,

    pub audit_added: bool,
    pub audit_removed: bool,
    pub audit_type_changed: bool,
    pub old_audit_type: Option<String>,
    pub new_audit_type: Option<String>,
}

impl DiffResult {
    /// True when there is nothing to migrate.
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
            && !self.pk_changed
            && self.new_pk.is_empty()
            && self.added_fks.is_empty()
            && self.removed_fks.is_empty()
            && !self.audit_added
            && !self.audit_removed
            && !self.audit_type_changed
            && self.old_audit_type.is_none()
            && self.new_audit_type.is_none()
    }

    /// Number of individual changes, for reporting
    pub fn change_count(&self) -> usize {
        self.added_columns.len()
            + self.removed_columns.len()
            + self.modified_columns.len()
            + self.added_fks.len()
            + self.removed_fks.len()
            + usize::from(self.pk_changed)
            + usize::from(self.audit_added || self.audit_removed || self.audit_type_changed)
    }
}

// ============================================================================
// diff
// ============================================================================

/// Compare the stored state of an entity (if any) against a new context.
///
/// `old` of `None` is a brand-new entity: everything in `new_ctx` is an
/// addition.
pub fn diff(old: Option<&EntityState>, new_ctx: &CreateContext) -> DiffResult {
    let mut result = DiffResult::default();
    diff_columns(old, new_ctx, &mut result);
    diff_pk(old, new_ctx, &mut result);
    diff_fks(old, new_ctx, &mut result);
    diff_audit(old, new_ctx, &mut result);
    result
}

fn diff_columns(old: Option<&EntityState>, new_ctx: &CreateContext, result: &mut DiffResult) {
    let new_columns = new_ctx.ordered_columns();

    for (name, column) in &new_columns {
        match old.and_then(|e| e.columns.get(name)) {
            None => result
                .added_columns
                .push(AddedColumn::from_state(name.clone(), column.clone())),
            Some(before) => {
                let change = ColumnChange::between(name.as_str(), before, column);
                if change.has_changes() {
                    result.modified_columns.push(change);
                }
            }
        }
    }

    if let Some(old) = old {
        let new_names: HashSet<&str> = new_columns.iter().map(|(n, _)| n.as_str()).collect();
        result.removed_columns = old
            .columns
            .keys()
            .filter(|name| !new_names.contains(name.as_str()))
            .cloned()
            .collect();
    }
}

fn diff_pk(old: Option<&EntityState>, new_ctx: &CreateContext, result: &mut DiffResult) {
    let new_pk = new_ctx.pk_list();
    let new_set: BTreeSet<&str> = new_pk.iter().map(String::as_str).collect();
    let old_set: BTreeSet<&str> = old
        .map(|e| e.pk.iter().map(String::as_str).collect())
        .unwrap_or_default();

    if new_set != old_set {
        result.pk_changed = true;
        result.new_pk = new_pk;
    }
}

fn diff_fks(old: Option<&EntityState>, new_ctx: &CreateContext, result: &mut DiffResult) {
    let new_fks: KeyedList<FkState> = new_ctx.foreign_keys().iter().map(|fk| fk.to_state()).collect();
    let old_fks = old.map(|e| &e.fks);

    result.added_fks = new_fks
        .iter()
        .filter(|fk| !old_fks.is_some_and(|o| o.contains_key(&fk.key())))
        .cloned()
        .collect();

    if let Some(old_fks) = old_fks {
        result.removed_fks = old_fks
            .iter()
            .filter(|fk| !new_fks.contains_key(&fk.key()))
            .cloned()
            .collect();
    }
}

fn diff_audit(old: Option<&EntityState>, new_ctx: &CreateContext, result: &mut DiffResult) {
    let old_enabled = old.is_some_and(EntityState::audit_enabled);
    let old_type = old.and_then(EntityState::audit_type);
    let new_enabled = new_ctx.audit_enabled;
    let new_type = new_ctx.audit_created_type.as_deref();

    match (old_enabled, new_enabled) {
        (false, true) => {
            result.audit_added = true;
            result.new_audit_type = new_type.map(str::to_string);
        }
        (true, false) => {
            result.audit_removed = true;
            result.old_audit_type = old_type.map(str::to_string);
        }
        (true, true) if old_type != new_type => {
            result.audit_type_changed = true;
            result.old_audit_type = old_type.map(str::to_string);
            result.new_audit_type = new_type.map(str::to_string);
        }
        _ => {}
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::ManifestBuilder;
    use pretty_assertions::assert_eq;
    use strata_ir::{AuditState, ColumnDef, FkDef, MigrationState};

    fn stored(ctx: &CreateContext) -> EntityState {
        let mut builder = ManifestBuilder::new(MigrationState::default());
        let table = ctx.table_name();
        builder.apply_create_context("Model", &table, ctx).unwrap();
        builder.add_foreign_keys(&table, Some(&ctx.fk_context()));
        builder.build().entity(&table).unwrap().clone()
    }

    fn with_pk(pk: &[&str]) -> EntityState {
        let mut e = EntityState::new("t");
        e.pk = pk.iter().map(|s| s.to_string()).collect();
        e
    }

    fn with_audit(enabled: bool, audit_type: Option<&str>) -> EntityState {
        let mut e = EntityState::new("t");
        e.audit = Some(AuditState {
            enabled,
            audit_type: audit_type.map(str::to_string),
        });
        e
    }

    #[test]
    fn test_new_entity_is_all_additions() {
        let ctx = CreateContext::new("users")
            .with_column(ColumnDef::new("id", "BIGINT"))
            .with_column(ColumnDef::new("email", "TEXT").nullable().with_default("''"))
            .with_pk("id")
            .with_fks(vec![FkDef::new("role_id", "roles", "id")]);

        let result = diff(None, &ctx);
        assert_eq!(
            result.added_columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "email"]
        );
        assert!(result.added_columns[1].nullable);
        assert_eq!(result.added_columns[1].default_expr.as_deref(), Some("''"));
        assert!(result.removed_columns.is_empty());
        assert!(result.modified_columns.is_empty());
        assert!(result.pk_changed);
        assert_eq!(result.new_pk, vec!["id"]);
        assert_eq!(result.added_fks, vec![FkState::new("role_id", "roles", "id")]);
        assert!(result.removed_fks.is_empty());
    }

    #[test]
    fn test_removed_column_by_name() {
        let old = stored(
            &CreateContext::new("users")
                .with_column(ColumnDef::new("id", "BIGINT"))
                .with_column(ColumnDef::new("legacy", "TEXT")),
        );
        let new_ctx = CreateContext::new("users").with_column(ColumnDef::new("id", "BIGINT"));

        let result = diff(Some(&old), &new_ctx);
        assert_eq!(result.removed_columns, vec!["legacy"]);
        assert!(result.added_columns.is_empty());
    }

    #[test]
    fn test_rename_is_add_and_remove() {
        let old = stored(&CreateContext::new("users").with_column(ColumnDef::new("mail", "TEXT")));
        let new_ctx = CreateContext::new("users").with_column(ColumnDef::new("email", "TEXT"));

        let result = diff(Some(&old), &new_ctx);
        assert_eq!(result.added_columns.len(), 1);
        assert_eq!(result.added_columns[0].name, "email");
        assert_eq!(result.removed_columns, vec!["mail"]);
    }

    #[test]
    fn test_column_modification_flags() {
        let old = stored(
            &CreateContext::new("t").with_column(ColumnDef::new("id", "BIGINT").with_default("1")),
        );
        let new_ctx = CreateContext::new("t").with_column(
            ColumnDef::new("id", "VARCHAR").nullable().unique().with_default("2"),
        );

        let result = diff(Some(&old), &new_ctx);
        assert_eq!(result.modified_columns.len(), 1);
        let change = &result.modified_columns[0];
        assert_eq!(change.name, "id");
        assert!(change.type_changed);
        assert!(change.nullable_changed);
        assert!(change.unique_changed);
        assert!(change.default_changed);
        assert_eq!(change.before.sql_type, "BIGINT");
        assert_eq!(change.after.sql_type, "VARCHAR");
    }

    #[test]
    fn test_single_flag_change() {
        let old = stored(&CreateContext::new("t").with_column(ColumnDef::new("id", "BIGINT")));
        let new_ctx =
            CreateContext::new("t").with_column(ColumnDef::new("id", "BIGINT").with_default("0"));

        let change = &diff(Some(&old), &new_ctx).modified_columns[0];
        assert!(!change.type_changed);
        assert!(!change.nullable_changed);
        assert!(!change.unique_changed);
        assert!(change.default_changed);
    }

    #[test]
    fn test_pk_order_independent() {
        let old = with_pk(&["id", "tenant_id"]);
        let result = diff(Some(&old), &CreateContext::new("t").with_pk("tenant_id, id"));
        assert!(!result.pk_changed);
        assert!(result.new_pk.is_empty());
    }

    #[test]
    fn test_pk_changed() {
        let old = with_pk(&["id"]);
        let result = diff(Some(&old), &CreateContext::new("t").with_pk("id,tenant_id"));
        assert!(result.pk_changed);
        assert_eq!(result.new_pk, vec!["id", "tenant_id"]);
    }

    #[test]
    fn test_pk_null_literal_is_empty() {
        let result = diff(Some(&with_pk(&[])), &CreateContext::new("t").with_pk("null"));
        assert!(!result.pk_changed);

        let result = diff(Some(&with_pk(&["id"])), &CreateContext::new("t"));
        assert!(result.pk_changed);
        assert!(result.new_pk.is_empty());
    }

    #[test]
    fn test_fk_symmetric_difference() {
        let mut old = EntityState::new("users");
        old.fks.insert_if_absent(FkState::new("role_id", "roles", "id"));
        let new_ctx =
            CreateContext::new("users").with_fks(vec![FkDef::new("tenant_id", "tenants", "id")]);

        let result = diff(Some(&old), &new_ctx);
        assert_eq!(result.added_fks.len(), 1);
        assert_eq!(result.added_fks[0].key(), "tenant_id->tenants(id)");
        assert_eq!(result.removed_fks.len(), 1);
        assert_eq!(result.removed_fks[0].key(), "role_id->roles(id)");
    }

    #[test]
    fn test_fk_fallback_source_and_dedup() {
        let mut new_ctx = CreateContext::new("users");
        new_ctx.fks = Some(vec![
            FkDef::new("role_id", "roles", "id"),
            FkDef::new("role_id", "roles", "id"),
        ]);

        let result = diff(None, &new_ctx);
        assert_eq!(result.added_fks.len(), 1);
    }

    #[test]
    fn test_audit_disabled_to_enabled() {
        let old = with_audit(false, None);
        let result = diff(Some(&old), &CreateContext::new("t").with_audit("Instant"));
        assert!(result.audit_added);
        assert!(!result.audit_removed);
        assert!(!result.audit_type_changed);
        assert_eq!(result.new_audit_type.as_deref(), Some("Instant"));
        assert_eq!(result.old_audit_type, None);
    }

    #[test]
    fn test_audit_missing_to_enabled() {
        let result = diff(Some(&EntityState::new("t")), &CreateContext::new("t").with_audit("Instant"));
        assert!(result.audit_added);
    }

    #[test]
    fn test_audit_enabled_to_disabled() {
        let old = with_audit(true, Some("Instant"));
        let result = diff(Some(&old), &CreateContext::new("t"));
        assert!(!result.audit_added);
        assert!(result.audit_removed);
        assert!(!result.audit_type_changed);
        assert_eq!(result.old_audit_type.as_deref(), Some("Instant"));
        assert_eq!(result.new_audit_type, None);
    }

    #[test]
    fn test_audit_type_changed() {
        let old = with_audit(true, Some("Instant"));
        let result = diff(Some(&old), &CreateContext::new("t").with_audit("LocalDateTime"));
        assert!(!result.audit_added);
        assert!(!result.audit_removed);
        assert!(result.audit_type_changed);
        assert_eq!(result.old_audit_type.as_deref(), Some("Instant"));
        assert_eq!(result.new_audit_type.as_deref(), Some("LocalDateTime"));
    }

    #[test]
    fn test_audit_unchanged() {
        let old = with_audit(true, Some("Instant"));
        let result = diff(Some(&old), &CreateContext::new("t").with_audit("Instant"));
        assert!(!result.audit_added && !result.audit_removed && !result.audit_type_changed);
        assert_eq!(result.old_audit_type, None);
        assert_eq!(result.new_audit_type, None);
    }

    #[test]
    fn test_identical_contexts_are_empty() {
        let ctx = CreateContext::new("users")
            .with_column(ColumnDef::new("id", "BIGINT"))
            .with_column(ColumnDef::new("email", "TEXT").unique())
            .with_pk("id")
            .with_audit("Instant")
            .with_fks(vec![FkDef::new("role_id", "roles", "id")]);

        let result = diff(Some(&stored(&ctx)), &ctx);
        assert!(result.is_empty());
        assert_eq!(result.change_count(), 0);
    }

    #[test]
    fn test_any_difference_is_not_empty() {
        let ctx = CreateContext::new("users")
            .with_column(ColumnDef::new("id", "BIGINT"))
            .with_pk("id");
        let old = stored(&ctx);

        let changed = ctx.clone().with_column(ColumnDef::new("name", "TEXT"));
        let result = diff(Some(&old), &changed);
        assert!(!result.is_empty());
        assert_eq!(result.change_count(), 1);

        // Enabling audit with no type still counts.
        let mut audited = ctx.clone();
        audited.audit_enabled = true;
        assert!(!diff(Some(&old), &audited).is_empty());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let value = serde_json::to_value(diff(None, &CreateContext::new("t").with_pk("id"))).unwrap();
        assert_eq!(value["pkChanged"], true);
        assert_eq!(value["newPk"][0], "id");
        assert!(value["addedColumns"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_wide_table_with_repeated_definitions() {
        let mut old_ctx = CreateContext::new("events");
        for i in 0..2_000 {
            old_ctx = old_ctx.with_column(ColumnDef::new(format!("c{}", i), "TEXT"));
        }
        let old = stored(&old_ctx);

        let mut new_ctx = CreateContext::new("events");
        for i in 1..2_000 {
            new_ctx = new_ctx.with_column(ColumnDef::new(format!("c{}", i), "TEXT"));
        }
        new_ctx = new_ctx.with_column(ColumnDef::new("c5", "BIGINT"));

        let result = diff(Some(&old), &new_ctx);
        assert_eq!(result.removed_columns, vec!["c0"]);
        assert!(result.added_columns.is_empty());
        assert_eq!(result.modified_columns.len(), 1);
        assert_eq!(result.modified_columns[0].name, "c5");
        assert_eq!(new_ctx.ordered_columns()[4].0, "c5");
    }
}
