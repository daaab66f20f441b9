//! # Strata IR (Intermediate Representation)
//!
//! This crate holds the data structures the migration engine works on:
//! the persisted schema manifest and the per-entity creation contexts
//! describing the schema wanted by the current run.
//!
//! ## Core Concepts
//!
//! - **MigrationState**: The persisted manifest, one `EntityState` per table
//! - **EntityState**: Columns, primary key, audit settings, foreign keys,
//!   generated files and join tables of one table
//! - **CreateContext**: The desired schema of one entity for this run
//! - **KeyedList**: Insertion-ordered collection deduplicated by identity key
//!

// Module declarations
pub mod context;
pub mod keyed;
pub mod serialization;
pub mod state;

// Re-export commonly used types at crate root
pub use context::{
    ColumnDef, CreateContext, EntityInput, FileInput, FkContext, FkDef, JoinContext,
    JoinFileInput, NULL_TEXT, coerce_text, split_csv,
};
pub use keyed::KeyedList;
pub use serialization::{
    backup_manifest, inputs_from_str, load_inputs, load_manifest, manifest_from_str,
    manifest_to_string, save_manifest,
};
pub use state::{
    AuditState, ColumnState, EntityState, FileState, FkState, JoinSide, JoinState,
    MigrationState, fk_composite_key,
};

// Re-export core types that are commonly used with IR
pub use strata_core::{EngineError, EngineResult, Format, Keyed};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient re-exports for common usage
pub mod prelude {
    pub use crate::{
        ColumnDef, ColumnState, CreateContext, EngineError, EngineResult, EntityInput,
        EntityState, FkContext, FkDef, FkState, JoinContext, JoinSide, MigrationState,
    };
}
