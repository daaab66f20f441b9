//! # Strata CLI
//!
//! Command-line interface for the Strata schema manifest engine.
//!
//! ## Commands
//!
//! - `plan` - Show what changed since the manifest was last written
//! - `apply` - Same as `plan`, then save the updated manifest
//! - `fingerprint` - Print the fingerprint of every entity input
//! - `show` - Summarize the stored manifest
//!

pub mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use strata_codegen::{GenerationSession, GeneratorConfig, ManifestBuilder};
use strata_ir::{backup_manifest, load_inputs, load_manifest, save_manifest};
use tracing_subscriber::EnvFilter;

use output::{OutputFormat, render_manifest, render_outcome};

// Re-export dependencies for use in main.rs
pub use strata_codegen;
pub use strata_core;
pub use strata_ir;

/// CLI version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "strata.toml";

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "strata", version, about = "Schema manifest and migration diff engine")]
#[command(subcommand_required = true, arg_required_else_help = true)]
pub struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to a strata.toml configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show schema changes without saving the manifest
    Plan(RunArgs),

    /// Record schema changes in the manifest
    Apply {
        #[command(flatten)]
        run: RunArgs,

        /// Copy the previous manifest to <manifest>.bak first
        #[arg(long)]
        backup: bool,
    },

    /// Print entity fingerprints
    Fingerprint {
        /// Entity input file (JSON or YAML)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Summarize the stored manifest
    Show {
        /// Manifest file (overrides config)
        #[arg(short, long, env = "STRATA_MANIFEST")]
        manifest: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Entity input file (JSON or YAML)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Manifest file (overrides config)
    #[arg(short, long, env = "STRATA_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Diff every entity even when its fingerprint is unchanged
    #[arg(long)]
    pub no_short_circuit: bool,
}

// ============================================================================
// Entry points
// ============================================================================

/// Install the tracing subscriber (`RUST_LOG` wins over `--verbose`).
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Resolve the configuration: `--config`, else `./strata.toml`, else defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<GeneratorConfig> {
    match explicit {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            GeneratorConfig::load(DEFAULT_CONFIG_FILE).context("loading strata.toml")
        }
        None => Ok(GeneratorConfig::default()),
    }
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }
    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan(run) => {
            execute(&run, config, cli.output, false, false)?;
        }
        Commands::Apply { run, backup } => {
            execute(&run, config, cli.output, true, backup)?;
        }
        Commands::Fingerprint { input } => fingerprint(&input, cli.output)?,
        Commands::Show { manifest } => {
            let path = manifest.unwrap_or(config.manifest_path);
            let state = load_manifest(&path)
                .with_context(|| format!("loading manifest {}", path.display()))?;
            match cli.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
                OutputFormat::Text => print!("{}", render_manifest(&state)),
            }
        }
    }
    Ok(())
}

fn execute(
    run: &RunArgs,
    mut config: GeneratorConfig,
    format: OutputFormat,
    save: bool,
    backup: bool,
) -> Result<()> {
    if let Some(manifest) = &run.manifest {
        config = config.with_manifest_path(manifest);
    }
    if run.no_short_circuit {
        config = config.without_short_circuit();
    }
    let manifest_path = config.manifest_path.clone();

    let state = load_manifest(&manifest_path)
        .with_context(|| format!("loading manifest {}", manifest_path.display()))?;
    let inputs = load_inputs(&run.input)
        .with_context(|| format!("loading entity input {}", run.input.display()))?;
    tracing::info!(
        entities = inputs.len(),
        manifest = %manifest_path.display(),
        "starting session"
    );

    let mut session = GenerationSession::new(state, config);
    let outcomes = session.process_all(&inputs)?;
    let (state, summary) = session.finish();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
        OutputFormat::Text => {
            for outcome in &outcomes {
                print!("{}", render_outcome(outcome));
            }
            print!("{}", summary);
        }
    }

    if save {
        if backup {
            if let Some(path) = backup_manifest(&manifest_path)? {
                tracing::info!("Backed up manifest to {}", path.display());
            }
        }
        save_manifest(&state, &manifest_path)
            .with_context(|| format!("saving manifest {}", manifest_path.display()))?;
        if format == OutputFormat::Text {
            println!("{} {}", "Saved".green().bold(), manifest_path.display());
        }
    }
    Ok(())
}

fn fingerprint(input: &Path, format: OutputFormat) -> Result<()> {
    let inputs =
        load_inputs(input).with_context(|| format!("loading entity input {}", input.display()))?;

    let mut rows = Vec::with_capacity(inputs.len());
    for entity in &inputs {
        let fp = ManifestBuilder::fingerprint_from_create_ctx(&entity.create)
            .with_context(|| format!("fingerprinting {}", entity.table))?;
        rows.push((entity.table.clone(), fp));
    }

    match format {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = rows
                .into_iter()
                .map(|(table, fp)| (table, serde_json::Value::String(fp)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        OutputFormat::Text => {
            for (table, fp) in rows {
                println!("{}  {}", fp, table);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
