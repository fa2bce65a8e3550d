//! scanbridge-sink: document-store adapters.
//!
//! Public API surface:
//! - [`Sink`] / [`CreateOutcome`]: the no-overwrite store capability
//! - [`ElasticSink`]: one index per target over HTTPS
//! - [`MongoSink`]: one collection per target
//! - [`MemorySink`]: in-process store for tests
//! - [`DryRunSink`]: read-through wrapper that never writes

pub mod dry_run;
pub mod elastic;
pub mod error;
pub mod memory;
pub mod mongo;
pub mod sink;

pub use dry_run::DryRunSink;
pub use elastic::ElasticSink;
pub use error::SinkError;
pub use memory::MemorySink;
pub use mongo::MongoSink;
pub use sink::{CreateOutcome, Sink};
