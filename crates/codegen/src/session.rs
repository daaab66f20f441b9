//! # Generation Session
//!
//! A `GenerationSession` carries everything one generator run needs: the
//! manifest builder, the configuration, and the set of artifacts already
//! generated during this run. It is created per run and passed explicitly,
//! so separate runs (and tests) never share state.
//!
//! ## Pipeline
//!
//! ```text
//! EntityInput
//!     │
//!     ├──► fingerprint and FK keys == stored? ──► Unchanged (diff skipped)
//!     ├──► diff(stored, create)   ──► New / Changed / Unchanged
//!     │
//!     ├──► ManifestBuilder: create context, FKs (minus dropped), joins, files
//!     └──► non-empty diff ──► next script version + script name
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strata_codegen::{GenerationSession, GeneratorConfig};
//! use strata_ir::load_manifest;
//!
//! let config = GeneratorConfig::default();
//! let mut session = GenerationSession::new(load_manifest(&config.manifest_path)?, config);
//! for input in &inputs {
//!     let outcome = session.process_entity(input)?;
//!     println!("{}: {}", outcome.table, outcome.status);
//! }
//! let (state, summary) = session.finish();
//! ```

use serde::Serialize;
use std::collections::HashSet;
use strata_core::{ContentHasher, EngineError, EngineResult, Sha256Hasher};
use strata_ir::{CreateContext, EntityInput, EntityState, MigrationState};

use crate::GeneratorConfig;
use crate::migrations::{DiffResult, ManifestBuilder, diff};

// ============================================================================
// EntityOutcome
// ============================================================================

/// What happened to one entity during a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    /// No prior state in the manifest
    New,
    /// The diff found changes
    Changed,
    /// Fingerprint matched, or the diff was empty
    Unchanged,
}

impl std::fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EntityStatus::New => "new",
            EntityStatus::Changed => "changed",
            EntityStatus::Unchanged => "unchanged",
        };
        f.write_str(label)
    }
}

/// Result of processing one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityOutcome {
    pub table: String,
    pub model_name: String,
    pub status: EntityStatus,
    pub fingerprint: String,

    /// `None` when the fingerprint short-circuit skipped the diff
    pub diff: Option<DiffResult>,

    pub script_version: Option<u32>,
    pub script_name: Option<String>,
}

impl EntityOutcome {
    /// Whether a migration script should be written for this entity
    pub fn needs_migration(&self) -> bool {
        self.diff.as_ref().is_some_and(|d| !d.is_empty())
    }
}

// ============================================================================
// GenerationSession
// ============================================================================

/// Per-run context for manifest updates and change detection.
///
/// Not thread-safe: entities must be processed one at a time.
#[derive(Debug)]
pub struct GenerationSession<H: ContentHasher = Sha256Hasher> {
    config: GeneratorConfig,
    builder: ManifestBuilder<H>,
    generated: HashSet<String>,
    summary: SessionSummary,
}

impl GenerationSession {
    /// Start a session over a loaded manifest.
    pub fn new(state: MigrationState, config: GeneratorConfig) -> Self {
        Self::with_builder(ManifestBuilder::new(state), config)
    }
}

impl<H: ContentHasher> GenerationSession<H> {
    /// Start a session with a preconfigured builder.
    pub fn with_builder(builder: ManifestBuilder<H>, config: GeneratorConfig) -> Self {
        Self {
            config,
            builder,
            generated: HashSet::new(),
            summary: SessionSummary::default(),
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The manifest as mutated so far.
    pub fn state(&self) -> &MigrationState {
        self.builder.state()
    }

    // ====================================================================
    // Generated markers
    // ====================================================================

    /// Mark an artifact as generated in this run.
    ///
    /// Returns `true` the first time a key is marked.
    pub fn mark_generated(&mut self, key: impl Into<String>) -> bool {
        self.generated.insert(key.into())
    }

    /// Check whether an artifact was already generated in this run.
    pub fn is_generated(&self, key: &str) -> bool {
        self.generated.contains(key)
    }

    // ====================================================================
    // Processing
    // ====================================================================

    /// Detect changes for one entity and record its new state.
    ///
    /// # Errors
    ///
    /// Fails if the same table is processed twice in one session, or if the
    /// creation context cannot be fingerprinted. In both cases the manifest
    /// is left untouched for that entity.
    pub fn process_entity(&mut self, input: &EntityInput) -> EngineResult<EntityOutcome> {
        let table = input.table.as_str();
        let marker = format!("entity:{}", table);
        if self.is_generated(&marker) {
            return Err(EngineError::invalid_input(format!(
                "table '{}' was already processed in this session",
                table
            )));
        }

        // ── 1. Change detection ──────────────────────────────────────────
        let fingerprint = self.builder.fingerprint(&input.create)?;
        let stored = self.builder.state().entity(table);

        let (status, result) = match stored {
            None => (EntityStatus::New, Some(diff(None, &input.create))),
            Some(old)
                if self.config.short_circuit_unchanged
                    && old.fingerprint.as_deref() == Some(fingerprint.as_str())
                    && same_foreign_keys(old, &input.create) =>
            {
                tracing::debug!("'{}' fingerprint and foreign keys unchanged, skipping diff", table);
                (EntityStatus::Unchanged, None)
            }
            Some(old) => {
                let result = diff(Some(old), &input.create);
                let status = if result.is_empty() {
                    EntityStatus::Unchanged
                } else {
                    EntityStatus::Changed
                };
                (status, Some(result))
            }
        };

        // ── 2. Record new state ──────────────────────────────────────────
        self.builder
            .apply_create_context(&input.model_name, table, &input.create)?;
        self.mark_generated(marker);

        let fk_ctx = input.create.fk_context();
        self.builder.add_foreign_keys(table, Some(&fk_ctx));
        if let Some(dropped) = result
            .as_ref()
            .map(|d| &d.removed_fks)
            .filter(|f| !f.is_empty())
        {
            self.builder.drop_foreign_keys(table, dropped);
        }
        for join in &input.joins {
            self.builder.add_join(table, join);
        }
        for file in &input.join_files {
            if !self
                .builder
                .add_join_file(table, &file.join_table, &file.file, &file.content)
                && !self.is_known_join_file(table, &file.join_table, &file.file)
            {
                tracing::warn!(
                    "File '{}' targets join '{}' which '{}' does not declare",
                    file.file,
                    file.join_table,
                    table
                );
            }
        }
        for file in &input.files {
            self.builder.add_entity_file(table, &file.file, &file.content);
        }

        // ── 3. Allocate a script for real changes ────────────────────────
        let mut outcome = EntityOutcome {
            table: table.to_string(),
            model_name: input.model_name.clone(),
            status,
            fingerprint,
            diff: result,
            script_version: None,
            script_name: None,
        };

        if outcome.needs_migration() {
            let version = self.builder.allocate_script_version();
            let action = if status == EntityStatus::New {
                "create"
            } else {
                "alter"
            };
            let script = self
                .config
                .script_name(version, &format!("{}_{}", action, table));
            outcome.script_version = Some(version);
            outcome.script_name = Some(script);
        }

        self.summary.record(&outcome);
        tracing::debug!(
            table = %outcome.table,
            status = %outcome.status,
            "entity processed",
        );
        Ok(outcome)
    }

    /// Process every input in order, stopping at the first error.
    pub fn process_all(&mut self, inputs: &[EntityInput]) -> EngineResult<Vec<EntityOutcome>> {
        inputs.iter().map(|input| self.process_entity(input)).collect()
    }

    /// Stamp the generator version and hand back the manifest.
    pub fn finish(mut self) -> (MigrationState, SessionSummary) {
        self.builder
            .set_generator_version(self.config.generator_version.clone());
        let summary = self.summary;
        tracing::info!(
            processed = summary.processed,
            new = summary.new,
            changed = summary.changed,
            unchanged = summary.unchanged,
            scripts = summary.scripts.len(),
            "generation session complete",
        );
        (self.builder.build(), summary)
    }

    fn is_known_join_file(&self, table: &str, join_table: &str, file: &str) -> bool {
        self.builder
            .state()
            .entity(table)
            .and_then(|e| e.joins.get(join_table))
            .is_some_and(|j| j.files.contains_key(file))
    }
}

/// Whether the stored foreign keys are exactly those the context declares.
///
/// Foreign keys are not part of the fingerprint, so a matching fingerprint
/// alone does not prove the entity is unchanged.
fn same_foreign_keys(old: &EntityState, ctx: &CreateContext) -> bool {
    let declared: HashSet<String> = ctx.foreign_keys().iter().map(|fk| fk.key()).collect();
    declared.len() == old.fks.len() && declared.iter().all(|key| old.fks.contains_key(key))
}

// ============================================================================
// SessionSummary
// ============================================================================

/// Counts and script names from a completed session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub processed: usize,
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    /// Script names allocated, in order
    pub scripts: Vec<String>,
}

impl SessionSummary {
    fn record(&mut self, outcome: &EntityOutcome) {
        self.processed += 1;
        match outcome.status {
            EntityStatus::New => self.new += 1,
            EntityStatus::Changed => self.changed += 1,
            EntityStatus::Unchanged => self.unchanged += 1,
        }
        if let Some(script) = &outcome.script_name {
            self.scripts.push(script.clone());
        }
    }

    /// Whether any entity needs a migration
    pub fn has_changes(&self) -> bool {
        !self.scripts.is_empty()
    }

    /// Format the summary as a human-readable string.
    pub fn display(&self) -> String {
        let mut out = String::with_capacity(512);

        out.push_str("╔══════════════════════════════════════════════════╗\n");
        out.push_str("║         Generation Summary                       ║\n");
        out.push_str("╠══════════════════════════════════════════════════╣\n");
        out.push_str(&format!("║  Entities:    {:<35}║\n", self.processed));
        out.push_str(&format!("║    New:       {:<35}║\n", self.new));
        out.push_str(&format!("║    Changed:   {:<35}║\n", self.changed));
        out.push_str(&format!("║    Unchanged: {:<35}║\n", self.unchanged));
        out.push_str(&format!("║  Scripts:     {:<35}║\n", self.scripts.len()));
        out.push_str("╚══════════════════════════════════════════════════╝\n");

        out
    }
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

// ============================================================================
// Tests
// ============================================================================
