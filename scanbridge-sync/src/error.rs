//! Error types for scanbridge-sync.

use std::time::Duration;

use thiserror::Error;

use scanbridge_core::ResourceId;
use scanbridge_scanner::ScannerError;
use scanbridge_sink::SinkError;

/// All errors that can end one resource's sync attempt, plus enrichment
/// feed failures.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The scanning service could not be reached or answered badly.
    #[error("scanner error: {0}")]
    Scanner(#[from] ScannerError),

    /// The document store failed a read or write.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// The export job reached the `error` state.
    #[error("export for resource {resource_id} failed on the server")]
    ExportFailed { resource_id: ResourceId },

    /// The export job did not become ready within the configured ceiling.
    #[error("export for resource {resource_id} not ready after {waited:?}")]
    ExportTimedOut {
        resource_id: ResourceId,
        waited: Duration,
    },

    /// Shutdown was requested while waiting on an export.
    #[error("cancelled while waiting on export for resource {resource_id}")]
    Cancelled { resource_id: ResourceId },

    /// The known-exploited feed could not be fetched or parsed.
    #[error("enrichment feed {url} unavailable: {reason}")]
    Enrichment { url: String, reason: String },

    /// The worker task for a resource panicked or was aborted.
    #[error("worker for resource {resource_id} did not complete: {reason}")]
    Worker {
        resource_id: ResourceId,
        reason: String,
    },
}

/// Failure classes reported per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UpstreamUnavailable,
    ExportFailed,
    SinkUnavailable,
    Cancelled,
    Decode,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Scanner(err) if err.is_decode() => ErrorKind::Decode,
            SyncError::Scanner(_) | SyncError::Enrichment { .. } => ErrorKind::UpstreamUnavailable,
            SyncError::Sink(_) => ErrorKind::SinkUnavailable,
            SyncError::ExportFailed { .. } | SyncError::ExportTimedOut { .. } => {
                ErrorKind::ExportFailed
            }
            SyncError::Cancelled { .. } => ErrorKind::Cancelled,
            SyncError::Worker { .. } => ErrorKind::UpstreamUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_failure_source() {
        let id = ResourceId::from("7");
        assert_eq!(
            SyncError::ExportFailed { resource_id: id.clone() }.kind(),
            ErrorKind::ExportFailed
        );
        assert_eq!(
            SyncError::Cancelled { resource_id: id.clone() }.kind(),
            ErrorKind::Cancelled
        );
        assert_eq!(
            SyncError::from(SinkError::Unavailable("down".into())).kind(),
            ErrorKind::SinkUnavailable
        );
        assert_eq!(
            SyncError::from(ScannerError::UnknownResource(id)).kind(),
            ErrorKind::UpstreamUnavailable
        );
    }
}
