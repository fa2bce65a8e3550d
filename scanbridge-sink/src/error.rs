//! Error types for scanbridge-sink.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("record cannot be stored as BSON: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("invalid sink setup: {0}")]
    Setup(String),

    /// Raised by the in-memory sink when a failure is injected.
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}
