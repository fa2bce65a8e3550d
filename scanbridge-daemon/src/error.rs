use thiserror::Error;

use scanbridge_core::ConfigError;
use scanbridge_scanner::ScannerError;
use scanbridge_sink::SinkError;
use scanbridge_sync::SyncError;

/// Error surface for startup wiring and the scheduler runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("scanner client error: {0}")]
    Scanner(#[from] ScannerError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("I/O error ({context}): {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{task} task did not complete: {reason}")]
    Task { task: &'static str, reason: String },
}

impl DaemonError {
    /// Process exit code for a fatal error: 1 for configuration problems and
    /// an unreachable enrichment feed at startup, 2 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            DaemonError::Config(_) => 1,
            DaemonError::Sync(SyncError::Enrichment { .. }) => 1,
            _ => 2,
        }
    }
}

pub(crate) fn io_err(context: &'static str, source: std::io::Error) -> DaemonError {
    DaemonError::Io { context, source }
}
