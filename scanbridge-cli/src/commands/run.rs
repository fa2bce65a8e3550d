//! `scanbridge run`: the long-running scheduler.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use scanbridge_daemon::start_blocking;

use super::{load_validated, resolve_config_path};

#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    pub fn run(self, config: Option<PathBuf>) -> Result<()> {
        let path = resolve_config_path(config)?;
        let validated = load_validated(&path)?;
        start_blocking(validated).context("scheduler exited with error")?;
        Ok(())
    }
}
