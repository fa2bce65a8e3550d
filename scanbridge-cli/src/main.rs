//! scanbridge: sync vulnerability-scan exports into a document store.
//!
//! # Usage
//!
//! ```text
//! scanbridge run      [--config <path>]
//! scanbridge once     [--config <path>] [--resource <name>] [--dry-run] [--json]
//! scanbridge validate [--config <path>]
//! ```
//!
//! Exit codes: 0 on normal shutdown, 1 for configuration problems or an
//! unreachable enrichment feed at startup, 2 for any other fatal error.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{once::OnceArgs, run::RunArgs, validate::ValidateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "scanbridge",
    version,
    about = "Incrementally sync vulnerability-scan results into Elasticsearch or MongoDB",
    long_about = None,
)]
struct Cli {
    /// Configuration file (default: ~/.scanbridge/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the polling scheduler until SIGINT / SIGTERM.
    Run(RunArgs),

    /// Run a single pass and print a per-resource summary.
    Once(OnceArgs),

    /// Check the configuration file and print warnings and problems.
    Validate(ValidateArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.config;
    match cli.command {
        Commands::Run(args) => args.run(config),
        Commands::Once(args) => args.run(config),
        Commands::Validate(args) => args.run(config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(commands::exit_code(&err))
        }
    }
}
