pub mod once;
pub mod run;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use scanbridge_core::config::{default_config_path, load_at};
use scanbridge_core::{ConfigError, ValidatedConfig};
use scanbridge_daemon::DaemonError;

/// `--config` if given, else `~/.scanbridge/config.yaml`.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => default_config_path().context("could not locate the default config file"),
    }
}

/// Load and validate; any [`ConfigError`] stays in the chain for exit-code
/// mapping.
pub fn load_validated(path: &Path) -> Result<ValidatedConfig> {
    let config = load_at(path)?;
    let validated = config
        .validate()
        .with_context(|| format!("{} is not a usable configuration", path.display()))?;
    Ok(validated)
}

pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 1;
        }
        if let Some(daemon) = cause.downcast_ref::<DaemonError>() {
            return daemon.exit_code() as u8;
        }
    }
    2
}
