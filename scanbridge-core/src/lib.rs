//! scanbridge core library: domain types and configuration.
//!
//! Public API surface:
//! - [`types`]: newtypes, records, export jobs, pass results
//! - [`config`]: YAML configuration load / validate
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, SinkConfig, ValidatedConfig};
pub use error::ConfigError;
pub use types::{
    ExportJob, ExportStatus, Fingerprint, ModificationStamp, PassOutcome, PassResult, Record,
    Resource, ResourceId, ResourceName, TargetName,
};
