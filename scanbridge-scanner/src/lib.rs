//! scanbridge-scanner: the upstream side of the bridge.
//!
//! Public API surface:
//! - [`ScanService`]: listing, detail and export calls
//! - [`NessusClient`]: HTTPS implementation with API-key auth
//! - [`MemoryScanService`]: scripted in-process implementation
//! - [`ExportSpec`]: export column selection
//! - [`RecordReader`]: lazy CSV → [`scanbridge_core::Record`] decoding

pub mod client;
pub mod decode;
pub mod error;
pub mod export_spec;
pub mod memory;
pub mod service;

pub use client::NessusClient;
pub use decode::{parse_cell, RecordReader};
pub use error::ScannerError;
pub use export_spec::ExportSpec;
pub use memory::MemoryScanService;
pub use service::ScanService;
