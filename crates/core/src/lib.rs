//! # Strata Core
//!
//! Core types, traits, and error handling for Strata.
//!
//! This crate provides the foundational building blocks used throughout
//! the Strata workspace, including:
//!
//! - **Errors**: Unified error handling with `EngineError` and `EngineResult`
//! - **Traits**: Identity keys (`Keyed`) and manifest persistence (`Persistable`)
//! - **Hashing**: The `ContentHasher` collaborator and its SHA-256 implementation
//!

pub mod error;
pub mod hash;
pub mod traits;

// Re-export commonly used items at crate root
pub use error::{EngineError, EngineResult, ResultExt};
pub use hash::{ContentHasher, Sha256Hasher, sha256_hex};
pub use traits::{Format, Keyed, Persistable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
