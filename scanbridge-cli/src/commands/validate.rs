//! `scanbridge validate`: check the configuration without connecting.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use scanbridge_core::config::load_at;
use scanbridge_core::ConfigError;

use super::resolve_config_path;

#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    pub fn run(self, config: Option<PathBuf>) -> Result<()> {
        let path = resolve_config_path(config)?;
        let config = load_at(&path)?;

        match config.validate() {
            Ok(validated) => {
                for warning in &validated.warnings {
                    println!("{} {warning}", "warning:".yellow().bold());
                }
                println!(
                    "{} {} is valid (sink: {})",
                    "✓".green(),
                    path.display(),
                    validated.config.sink.kind()
                );
                Ok(())
            }
            Err(err) => {
                if let ConfigError::Invalid { problems } = &err {
                    for problem in problems {
                        println!("{} {problem}", "problem:".red().bold());
                    }
                }
                Err(err.into())
            }
        }
    }
}
