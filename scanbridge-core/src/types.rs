//! Domain types shared by every scanbridge crate.
//!
//! Identifiers are newtypes so a scan id can never be passed where a scan
//! name is expected. Records are ordered field maps; the engine treats them as
//! opaque payloads apart from the enrichment identifier field.

use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Upstream identifier of a scannable resource (a Nessus scan id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ResourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Human-readable resource name. Change tracking is keyed on this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceName(pub String);

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ResourceName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ResourceName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Upstream modification timestamp (Unix seconds) of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModificationStamp(pub i64);

impl fmt::Display for ModificationStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Name of the index (search engine) or collection (document database) a
/// resource's records are written to.
///
/// This value is part of the external contract: downstream consumers query it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetName(pub String);

impl TargetName {
    /// `<namespace>_<resource name lower-cased, spaces → underscores>`.
    pub fn for_resource(namespace: &str, resource: &ResourceName) -> Self {
        let name = resource.0.replace(' ', "_").to_lowercase();
        Self(format!("{namespace}_{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TargetName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TargetName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// 128-bit content fingerprint of a record. Rendered as 32 lowercase hex chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u128);

impl Fingerprint {
    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A scannable unit tracked across passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: ResourceName,
}

impl Resource {
    pub fn new(id: impl Into<ResourceId>, name: impl Into<ResourceName>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One exported row: field name → scalar value, in export column order.
pub type Record = IndexMap<String, Value>;

/// Field appended by the engine with the ingest time (Unix seconds).
pub const INGESTED_AT_FIELD: &str = "ingested_at";
/// Field appended by the engine with the known-exploited lookup result.
pub const KNOWN_EXPLOITED_FIELD: &str = "in_cisa_feed";
/// Field carrying the fingerprint for stores that do not reuse it as the
/// native document id.
pub const FINGERPRINT_FIELD: &str = "fingerprint";

/// Engine-added fields. Never part of a fingerprint.
pub const DERIVED_FIELDS: [&str; 3] = [INGESTED_AT_FIELD, KNOWN_EXPLOITED_FIELD, FINGERPRINT_FIELD];

/// Server-side status of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    Pending,
    Processing,
    Ready,
    Error,
}

impl ExportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStatus::Ready | ExportStatus::Error)
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportStatus::Pending => write!(f, "pending"),
            ExportStatus::Processing => write!(f, "processing"),
            ExportStatus::Ready => write!(f, "ready"),
            ExportStatus::Error => write!(f, "error"),
        }
    }
}

/// A server-side export job. Discarded once its data has been retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    pub resource_id: ResourceId,
    pub job_id: String,
    pub status: ExportStatus,
}

// ---------------------------------------------------------------------------
// Pass results
// ---------------------------------------------------------------------------

/// How a resource's sync attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    /// Records were exported and deduplicated into the sink.
    Synced,
    /// Modification stamp unchanged; the exporter was not called.
    Unchanged,
    /// The pass failed; change history was left untouched.
    Failed { error: String },
}

/// Per-resource outcome summary of one sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassResult {
    pub resource_id: ResourceId,
    pub resource_name: ResourceName,
    pub target: TargetName,
    #[serde(flatten)]
    pub outcome: PassOutcome,
    pub created_count: usize,
    pub skipped_count: usize,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub byte_size: usize,
    pub modification: Option<ModificationStamp>,
}

impl PassResult {
    /// A no-op result: nothing exported, nothing written.
    pub fn unchanged(
        resource: &Resource,
        target: TargetName,
        modification: ModificationStamp,
        elapsed: Duration,
    ) -> Self {
        Self {
            resource_id: resource.id.clone(),
            resource_name: resource.name.clone(),
            target,
            outcome: PassOutcome::Unchanged,
            created_count: 0,
            skipped_count: 0,
            elapsed,
            byte_size: 0,
            modification: Some(modification),
        }
    }

    /// A failed result carrying the rendered error.
    pub fn failed(
        resource: &Resource,
        target: TargetName,
        error: impl fmt::Display,
        elapsed: Duration,
    ) -> Self {
        Self {
            resource_id: resource.id.clone(),
            resource_name: resource.name.clone(),
            target,
            outcome: PassOutcome::Failed {
                error: error.to_string(),
            },
            created_count: 0,
            skipped_count: 0,
            elapsed,
            byte_size: 0,
            modification: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, PassOutcome::Failed { .. })
    }

    pub fn is_noop(&self) -> bool {
        matches!(self.outcome, PassOutcome::Unchanged)
    }
}

fn serialize_millis<S: serde::Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(value.as_millis() as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
