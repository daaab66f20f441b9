//! # Schema Manifest & Migration Diff
//!
//! This module keeps track of the schema the generator produced on earlier
//! runs and works out what changed since.
//!
//! ## Pieces
//!
//! - [`builder`]: upserts each entity's creation context into the manifest
//! - [`diff`]: pure comparison of a stored entity against a new context
//! - [`fingerprint`]: order-independent digest of a creation context, used
//!   to skip the diff entirely when nothing changed
//!
//! ## Flow
//!
//! ```text
//! CreateContext ──► fingerprint ──(same as stored?)──► Unchanged
//!       │                                   │ no
//!       │                                   ▼
//!       │                     diff(stored, ctx) ──► DiffResult ──► SQL writer
//!       ▼
//! ManifestBuilder::apply_create_context / add_foreign_keys / add_join / files
//!       │
//!       ▼
//! MigrationState (saved once at the end of the run)
//! ```

pub mod builder;
pub mod diff;
pub mod fingerprint;

pub use builder::ManifestBuilder;
pub use diff::{AddedColumn, ColumnChange, DiffResult, diff};
pub use fingerprint::{fingerprint, fingerprint_with};
