//! `scanbridge once`: a single pass with a printed summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use scanbridge_core::{PassOutcome, PassResult, ResourceName};
use scanbridge_daemon::{init_tracing, run_once, SinkMode};
use scanbridge_sync::{PassSummary, SyncScope};

use super::{load_validated, resolve_config_path};

#[derive(Args, Debug)]
pub struct OnceArgs {
    /// Only sync the resource with this name.
    #[arg(long, value_name = "NAME")]
    pub resource: Option<String>,

    /// Check the sink for existing records but write nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl OnceArgs {
    pub fn run(self, config: Option<PathBuf>) -> Result<()> {
        let path = resolve_config_path(config)?;
        let validated = load_validated(&path)?;
        init_tracing(&validated.config.logging);
        for warning in &validated.warnings {
            eprintln!("{} {warning}", "warning:".yellow().bold());
        }

        let scope = match self.resource {
            Some(name) => SyncScope::Resource(ResourceName::from(name)),
            None => SyncScope::All,
        };
        let mode = if self.dry_run {
            SinkMode::DryRun
        } else {
            SinkMode::Write
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let summary = runtime
            .block_on(run_once(&validated.config, scope, mode))
            .context("sync pass failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to render pass JSON")?
            );
        } else {
            print_table(&summary, self.dry_run);
        }
        Ok(())
    }
}

#[derive(Tabled)]
struct PassTableRow {
    #[tabled(rename = "resource")]
    resource: String,
    #[tabled(rename = "target")]
    target: String,
    #[tabled(rename = "outcome")]
    outcome: String,
    #[tabled(rename = "created")]
    created: usize,
    #[tabled(rename = "skipped")]
    skipped: usize,
    #[tabled(rename = "elapsed")]
    elapsed: String,
}

fn outcome_label(result: &PassResult) -> String {
    match &result.outcome {
        PassOutcome::Synced => "synced".green().to_string(),
        PassOutcome::Unchanged => "unchanged".dimmed().to_string(),
        PassOutcome::Failed { error } => format!("{} {error}", "failed:".red()),
    }
}

fn print_table(summary: &PassSummary, dry_run: bool) {
    if summary.results.is_empty() {
        println!("No resources matched.");
        return;
    }

    let rows = summary.results.iter().map(|r| PassTableRow {
        resource: r.resource_name.to_string(),
        target: r.target.to_string(),
        outcome: outcome_label(r),
        created: r.created_count,
        skipped: r.skipped_count,
        elapsed: format!("{:.1}s", r.elapsed.as_secs_f64()),
    });
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let prefix = if dry_run { "[dry-run] " } else { "" };
    println!(
        "{prefix}{} resources: {} created, {} skipped, {} unchanged, {} failed in {:.1}s",
        summary.results.len(),
        summary.created(),
        summary.skipped(),
        summary.unchanged(),
        summary.failed(),
        summary.elapsed.as_secs_f64()
    );
}
