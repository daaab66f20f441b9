//! Human-readable and JSON rendering of session results

use clap::ValueEnum;
use colored::Colorize;
use strata_codegen::{DiffResult, EntityOutcome, EntityStatus};
use strata_ir::{FkState, MigrationState};

/// Output format options for CLI commands
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted text (default)
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

/// Render one entity outcome with its change list.
pub fn render_outcome(outcome: &EntityOutcome) -> String {
    let marker = match outcome.status {
        EntityStatus::New => "+".green().bold(),
        EntityStatus::Changed => "~".yellow().bold(),
        EntityStatus::Unchanged => "=".dimmed(),
    };

    let mut out = format!("{} {} ({})", marker, outcome.table.bold(), outcome.status);
    if let Some(script) = &outcome.script_name {
        out.push_str(&format!(" -> {}", script.cyan()));
    }
    out.push('\n');

    if let Some(diff) = &outcome.diff {
        for line in diff_lines(diff) {
            out.push_str("    ");
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

fn fk_label(fk: &FkState) -> String {
    format!("{} -> {}({})", fk.column(), fk.ref_table(), fk.ref_column())
}

/// One line per change in a diff.
pub fn diff_lines(diff: &DiffResult) -> Vec<String> {
    let mut lines = Vec::new();

    for col in &diff.added_columns {
        let mut line = format!("add column {} {}", col.name, col.sql_type);
        if !col.nullable {
            line.push_str(" NOT NULL");
        }
        if col.unique {
            line.push_str(" UNIQUE");
        }
        if let Some(default) = &col.default_expr {
            line.push_str(&format!(" DEFAULT {}", default));
        }
        lines.push(line);
    }
    for name in &diff.removed_columns {
        lines.push(format!("drop column {}", name));
    }
    for change in &diff.modified_columns {
        let mut parts = Vec::new();
        if change.type_changed {
            parts.push(format!("type {} -> {}", change.before.sql_type, change.after.sql_type));
        }
        if change.nullable_changed {
            parts.push(format!("nullable {} -> {}", change.before.nullable, change.after.nullable));
        }
        if change.unique_changed {
            parts.push(format!("unique {} -> {}", change.before.unique, change.after.unique));
        }
        if change.default_changed {
            parts.push(format!(
                "default {} -> {}",
                change.before.default_expr.as_deref().unwrap_or("none"),
                change.after.default_expr.as_deref().unwrap_or("none")
            ));
        }
        lines.push(format!("alter column {}: {}", change.name, parts.join(", ")));
    }
    if diff.pk_changed {
        lines.push(format!("primary key ({})", diff.new_pk.join(", ")));
    }
    for fk in &diff.added_fks {
        lines.push(format!("add foreign key {}", fk_label(fk)));
    }
    for fk in &diff.removed_fks {
        lines.push(format!("drop foreign key {}", fk_label(fk)));
    }
    if diff.audit_added {
        lines.push(format!(
            "add audit columns ({})",
            diff.new_audit_type.as_deref().unwrap_or("default")
        ));
    }
    if diff.audit_removed {
        lines.push("drop audit columns".to_string());
    }
    if diff.audit_type_changed {
        lines.push(format!(
            "audit type {} -> {}",
            diff.old_audit_type.as_deref().unwrap_or("none"),
            diff.new_audit_type.as_deref().unwrap_or("none")
        ));
    }
    lines
}

/// Summary table of a stored manifest.
pub fn render_manifest(state: &MigrationState) -> String {
    let mut out = format!(
        "{} (generator {}, last script V{})\n",
        "Manifest".bold(),
        if state.generator_version.is_empty() {
            "unknown"
        } else {
            state.generator_version.as_str()
        },
        state.last_script_version
    );

    for entity in &state.entities {
        out.push_str(&format!(
            "  {:<24} {:>3} cols  pk({})  {} fks  {} joins  {} files\n",
            entity.table(),
            entity.columns.len(),
            entity.pk.join(","),
            entity.fks.len(),
            entity.joins.len(),
            entity.files.len()
        ));
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
