//! # Manifest Builder
//!
//! Projects the creation contexts of the current run into the persisted
//! [`MigrationState`]. Every operation is idempotent:
//!
//! - columns, primary key and audit settings are replaced wholesale
//! - foreign keys, files and joins are appended, deduplicated by their
//!   identity key; foreign keys leave only through `drop_foreign_keys`
//!
//! The builder owns the manifest for the duration of a run and is not meant
//! to be shared across threads; process entities one at a time.

use std::collections::HashSet;
use strata_core::{ContentHasher, EngineResult, Keyed, Sha256Hasher};
use strata_ir::{
    AuditState, CreateContext, FileState, FkContext, FkState, JoinContext, JoinState,
    MigrationState,
};

use super::fingerprint;

// ============================================================================
// ManifestBuilder
// ============================================================================

/// Upserts per-entity schema facts into a manifest.
#[derive(Debug)]
pub struct ManifestBuilder<H: ContentHasher = Sha256Hasher> {
    state: MigrationState,
    hasher: H,
}

impl ManifestBuilder {
    /// Create a builder over a loaded manifest, hashing with SHA-256.
    pub fn new(state: MigrationState) -> Self {
        Self::with_hasher(state, Sha256Hasher)
    }

    /// SHA-256 fingerprint of a creation context.
    pub fn fingerprint_from_create_ctx(ctx: &CreateContext) -> EngineResult<String> {
        fingerprint::fingerprint(ctx)
    }
}

impl<H: ContentHasher> ManifestBuilder<H> {
    /// Create a builder with a custom content hasher.
    pub fn with_hasher(state: MigrationState, hasher: H) -> Self {
        Self { state, hasher }
    }

    /// The manifest as mutated so far.
    pub fn state(&self) -> &MigrationState {
        &self.state
    }

    /// Finish building and hand back the manifest.
    pub fn build(self) -> MigrationState {
        self.state
    }

    /// Fingerprint a creation context with this builder's hasher.
    pub fn fingerprint(&self, ctx: &CreateContext) -> EngineResult<String> {
        fingerprint::fingerprint_with(ctx, &self.hasher)
    }

    /// Allocate the next migration script version in the manifest.
    pub fn allocate_script_version(&mut self) -> u32 {
        self.state.next_script_version()
    }

    /// Stamp the generator version that wrote the manifest.
    pub fn set_generator_version(&mut self, version: impl Into<String>) {
        self.state.generator_version = version.into();
    }

    // ====================================================================
    // Entity schema
    // ====================================================================

    /// Replace the columns, primary key and audit settings of `table_name`
    /// with what `ctx` describes, and record its fingerprint.
    ///
    /// The fingerprint is computed before anything is mutated, so a failure
    /// leaves the manifest untouched.
    pub fn apply_create_context(
        &mut self,
        model_name: &str,
        table_name: &str,
        ctx: &CreateContext,
    ) -> EngineResult<()> {
        let fingerprint = self.fingerprint(ctx)?;

        let entity = self.state.get_or_create(table_name);
        entity.name = Some(model_name.to_string());
        entity.columns = ctx.ordered_columns().into_iter().collect();
        entity.pk = ctx.pk_list();
        entity.audit = Some(AuditState {
            enabled: ctx.audit_enabled,
            audit_type: ctx.audit_created_type.clone(),
        });
        entity.fingerprint = Some(fingerprint);

        tracing::debug!(
            "Applied create context for '{}' ({} columns, pk {:?})",
            table_name,
            entity.columns.len(),
            entity.pk
        );
        Ok(())
    }

    // ====================================================================
    // Foreign keys
    // ====================================================================

    /// Merge foreign keys into `table_name`, skipping any whose composite
    /// key is already present. Returns how many were added.
    pub fn add_foreign_keys(&mut self, table_name: &str, fk_ctx: Option<&FkContext>) -> usize {
        let Some(fk_ctx) = fk_ctx.filter(|c| !c.is_empty()) else {
            return 0;
        };

        let entity = self.state.get_or_create(table_name);
        let mut added = 0;
        for fk in fk_ctx.fks() {
            if entity.fks.insert_if_absent(fk.to_state()) {
                added += 1;
            } else {
                tracing::debug!("Foreign key {} already recorded on '{}'", fk.key(), table_name);
            }
        }
        added
    }

    /// Forget foreign keys of `table_name` that a migration has dropped.
    /// Returns how many were removed.
    pub fn drop_foreign_keys(&mut self, table_name: &str, dropped: &[FkState]) -> usize {
        let Some(entity) = self.state.entity_mut(table_name) else {
            return 0;
        };
        let keys: HashSet<String> = dropped.iter().map(Keyed::key).collect();
        entity.fks.retain(|fk| !keys.contains(&fk.key()))
    }

    // ====================================================================
    // Joins
    // ====================================================================

    /// Register (or update the sides of) a join table owned by `owner_table`.
    pub fn add_join(&mut self, owner_table: &str, join_ctx: &JoinContext) {
        let entity = self.state.get_or_create(owner_table);
        let join = entity
            .joins
            .get_or_insert_with(&join_ctx.join_table, || JoinState::new(&join_ctx.join_table));
        join.left = join_ctx.left.clone();
        join.right = join_ctx.right.clone();
    }

    // ====================================================================
    // Files
    // ====================================================================

    /// Record a generated file for `table_name`.
    ///
    /// A file name that is already recorded is left alone, even if
    /// `content` differs. Returns `true` if the file was added.
    pub fn add_entity_file(&mut self, table_name: &str, file_name: &str, content: &str) -> bool {
        let hasher = &self.hasher;
        let entity = self.state.get_or_create(table_name);
        if entity.files.contains_key(file_name) {
            return false;
        }
        entity
            .files
            .insert_if_absent(FileState::new(file_name, hasher.digest(content)))
    }

    /// Record a generated file for an existing join of `owner_table`.
    ///
    /// Never creates the owner or the join; returns `false` when either is
    /// missing or the file is already recorded.
    pub fn add_join_file(
        &mut self,
        owner_table: &str,
        join_table: &str,
        file_name: &str,
        content: &str,
    ) -> bool {
        let hasher = &self.hasher;
        let Some(join) = self
            .state
            .entity_mut(owner_table)
            .and_then(|entity| entity.joins.get_mut(join_table))
        else {
            tracing::debug!(
                "Ignoring file '{}' for unknown join '{}' of '{}'",
                file_name,
                join_table,
                owner_table
            );
            return false;
        };

        if join.files.contains_key(file_name) {
            return false;
        }
        join.files
            .insert_if_absent(FileState::new(file_name, hasher.digest(content)))
    }
}

// ============================================================================
// Tests
// ============================================================================
