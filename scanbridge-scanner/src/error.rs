//! Error types for scanbridge-scanner.

use thiserror::Error;

use scanbridge_core::ResourceId;

/// All errors that can arise talking to the scanning service or decoding
/// what it returns.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// Transport failure (connect, TLS, timeout, body read).
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// A required field was absent from an otherwise valid response.
    #[error("{endpoint} response has no '{field}'")]
    MissingField {
        endpoint: String,
        field: &'static str,
    },

    /// The export payload is not valid CSV.
    #[error("failed to decode export CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The client could not be built from its configuration.
    #[error("invalid scanner client setup: {0}")]
    Setup(String),

    /// The resource is not known to the service.
    #[error("unknown resource {0}")]
    UnknownResource(ResourceId),
}

impl ScannerError {
    /// `true` for failures of the export payload itself rather than of the
    /// service being reachable.
    pub fn is_decode(&self) -> bool {
        matches!(self, ScannerError::Csv(_))
    }
}
