//! Creation-context fingerprints
//!
//! A fingerprint is a digest of a canonical encoding of a creation context:
//! table, audit flags, the raw primary key CSV and the columns sorted by
//! name. Column order in the input does not affect the result.

use serde::Serialize;
use std::collections::BTreeMap;
use strata_core::{ContentHasher, EngineError, EngineResult, Sha256Hasher};
use strata_ir::CreateContext;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalContext<'a> {
    table: Option<&'a str>,
    audit_enabled: bool,
    audit_type: Option<&'a str>,
    pk_columns: Option<&'a str>,
    columns: BTreeMap<String, CanonicalColumn>,
}

#[derive(Debug, Serialize)]
struct CanonicalColumn {
    #[serde(rename = "type")]
    sql_type: String,
    nullable: bool,
    unique: bool,
    default: Option<String>,
}

/// Canonical byte encoding of a creation context.
pub fn canonical_bytes(ctx: &CreateContext) -> EngineResult<Vec<u8>> {
    let columns = ctx
        .ordered_columns()
        .into_iter()
        .map(|(name, col)| {
            (
                name,
                CanonicalColumn {
                    sql_type: col.sql_type,
                    nullable: col.nullable,
                    unique: col.unique,
                    default: col.default_expr,
                },
            )
        })
        .collect();

    let canonical = CanonicalContext {
        table: ctx.table.as_deref(),
        audit_enabled: ctx.audit_enabled,
        audit_type: ctx.audit_created_type.as_deref(),
        pk_columns: ctx.pk_columns.as_deref(),
        columns,
    };

    serde_json::to_vec(&canonical).map_err(|e| {
        EngineError::fingerprint(
            ctx.table_name(),
            format!("Failed to serialize canonical creation context: {}", e),
        )
    })
}

/// Fingerprint a creation context with the given hasher.
pub fn fingerprint_with<H: ContentHasher + ?Sized>(
    ctx: &CreateContext,
    hasher: &H,
) -> EngineResult<String> {
    let bytes = canonical_bytes(ctx)?;
    Ok(hasher.digest_bytes(&bytes))
}

/// SHA-256 fingerprint of a creation context.
pub fn fingerprint(ctx: &CreateContext) -> EngineResult<String> {
    fingerprint_with(ctx, &Sha256Hasher)
}

// ============================================================================
// Tests
// ============================================================================
