//! # scanbridge-sync
//!
//! Incremental synchronisation of scan exports into a document store.
//!
//! Build a [`SyncEngine`] from a scanner, a sink, a [`ChangeTracker`] and an
//! [`Enrichment`] handle, then call [`run_pass`] once per polling interval,
//! or [`SyncEngine::sync_resource`] for a single resource.

pub mod change_tracker;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod poller;

pub use change_tracker::{ChangeTracker, ResourceClaim};
pub use engine::{EngineConfig, SyncEngine};
pub use enrichment::{Enrichment, FeedSource, HttpFeed, KnownExploited, StaticFeed};
pub use error::{ErrorKind, SyncError};
pub use fingerprint::fingerprint;
pub use pipeline::{run_pass, PassSummary, SyncScope};
pub use poller::{ExportPoller, PollerConfig};
