//! Per-resource synchronisation.
//!
//! [`SyncEngine::sync_resource`] runs one resource end to end:
//! stamp → change gate → export → decode → fingerprint → exists/create →
//! history commit. Any error before the commit returns without touching
//! the [`ChangeTracker`].

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use scanbridge_core::config::{Config, DEFAULT_IDENTIFIER_FIELD, DEFAULT_NAMESPACE};
use scanbridge_core::types::{INGESTED_AT_FIELD, KNOWN_EXPLOITED_FIELD};
use scanbridge_core::{PassOutcome, PassResult, Resource, TargetName};
use scanbridge_scanner::{ExportSpec, RecordReader, ScanService};
use scanbridge_sink::{CreateOutcome, Sink};

use crate::change_tracker::ChangeTracker;
use crate::enrichment::Enrichment;
use crate::error::SyncError;
use crate::fingerprint::fingerprint;
use crate::poller::{ExportPoller, PollerConfig};

/// Static settings of an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Prefix of every target name.
    pub namespace: String,
    /// Record field looked up in the known-exploited snapshot.
    pub identifier_field: String,
    pub export_spec: ExportSpec,
    pub poller: PollerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            identifier_field: DEFAULT_IDENTIFIER_FIELD.to_string(),
            export_spec: ExportSpec::default(),
            poller: PollerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            namespace: config.exporter.namespace.clone(),
            identifier_field: config.enrichment.identifier_field.clone(),
            export_spec: ExportSpec::from_config(config.scanner.columns.as_deref()),
            poller: PollerConfig {
                poll_interval: config.exporter.export_poll_interval(),
                timeout: config.exporter.export_timeout(),
            },
        }
    }
}

/// One sync engine per process, shared by every worker of a pass.
#[derive(Clone)]
pub struct SyncEngine {
    scanner: Arc<dyn ScanService>,
    sink: Arc<dyn Sink>,
    tracker: Arc<ChangeTracker>,
    enrichment: Enrichment,
    config: Arc<EngineConfig>,
    cancel: CancellationToken,
}

impl SyncEngine {
    pub fn new(
        scanner: Arc<dyn ScanService>,
        sink: Arc<dyn Sink>,
        tracker: Arc<ChangeTracker>,
        enrichment: Enrichment,
        config: EngineConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            scanner,
            sink,
            tracker,
            enrichment,
            config: Arc::new(config),
            cancel,
        }
    }

    pub fn scanner(&self) -> &Arc<dyn ScanService> {
        &self.scanner
    }

    pub fn tracker(&self) -> &Arc<ChangeTracker> {
        &self.tracker
    }

    pub fn enrichment(&self) -> &Enrichment {
        &self.enrichment
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn target_for(&self, resource: &Resource) -> TargetName {
        TargetName::for_resource(&self.config.namespace, &resource.name)
    }

    /// Sync one resource. Returns `Unchanged` without exporting when the
    /// resource is registered and its stamp has not moved, and `Cancelled`
    /// without any upstream call once shutdown has been requested.
    pub async fn sync_resource(&self, resource: &Resource) -> Result<PassResult, SyncError> {
        let started = Instant::now();
        let target = self.target_for(resource);

        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled {
                resource_id: resource.id.clone(),
            });
        }

        let modification = self.scanner.last_modification(&resource.id).await?;
        let claim = self.tracker.claim(&resource.name).await;

        if claim.is_registered() && !claim.has_changed(modification) {
            debug!(resource = %resource.name, stamp = %modification, "unchanged, skipping export");
            return Ok(PassResult::unchanged(
                resource,
                target,
                modification,
                started.elapsed(),
            ));
        }

        let poller = ExportPoller::new(self.scanner.as_ref(), &self.config.poller, &self.cancel);
        let payload = poller
            .export(&resource.id, &self.config.export_spec)
            .await?;

        self.sink.prepare(&target).await?;

        let snapshot = self.enrichment.snapshot();
        let mut created_count = 0;
        let mut skipped_count = 0;

        for record in RecordReader::new(&payload)? {
            let mut record = record?;
            let fp = fingerprint(&record);

            if self.sink.exists(&target, fp).await? {
                skipped_count += 1;
                continue;
            }

            let known = snapshot.matches(record.get(&self.config.identifier_field));
            record.insert(INGESTED_AT_FIELD.to_string(), Value::from(Utc::now().timestamp()));
            record.insert(KNOWN_EXPLOITED_FIELD.to_string(), Value::Bool(known));

            match self.sink.create(&target, fp, &record).await? {
                CreateOutcome::Created => created_count += 1,
                CreateOutcome::Conflict => skipped_count += 1,
            }
        }

        claim.commit(modification);

        let result = PassResult {
            resource_id: resource.id.clone(),
            resource_name: resource.name.clone(),
            target,
            outcome: PassOutcome::Synced,
            created_count,
            skipped_count,
            elapsed: started.elapsed(),
            byte_size: payload.len(),
            modification: Some(modification),
        };
        info!(
            resource = %resource.name,
            target = %result.target,
            created = created_count,
            skipped = skipped_count,
            bytes = result.byte_size,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "resource synced"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("sink", &self.sink.kind())
            .field("config", &self.config)
            .finish()
    }
}
