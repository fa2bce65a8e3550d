//! Error types for scanbridge-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or validating configuration.
///
/// Every variant is fatal at startup: the process exits before the first pass.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, including serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed but one or more values are unusable.
    #[error("invalid configuration: {}", problems.join("; "))]
    Invalid { problems: Vec<String> },

    /// `dirs::home_dir()` returned `None` and no explicit path was given.
    #[error("cannot determine home directory; pass --config explicitly")]
    HomeNotFound,
}
