//! Strata command-line entry point

use clap::Parser;
use colored::Colorize;
use strata_cli::{Cli, init_tracing, run};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        std::process::exit(1);
    }
}
