//! Shared single-pass entrypoint used by the CLI and the daemon.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use scanbridge_core::{PassResult, Resource, ResourceName};

use crate::engine::SyncEngine;
use crate::error::SyncError;

/// Scope for a sync pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Every resource the scanner lists.
    All,
    /// A single resource, by name.
    Resource(ResourceName),
}

/// Aggregate outcome of one pass.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub results: Vec<PassResult>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl PassSummary {
    pub fn created(&self) -> usize {
        self.results.iter().map(|r| r.created_count).sum()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().map(|r| r.skipped_count).sum()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.is_failed()).count()
    }

    pub fn unchanged(&self) -> usize {
        self.results.iter().filter(|r| r.is_noop()).count()
    }
}

fn serialize_millis<S: serde::Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(value.as_millis() as u64)
}

/// Run one pass over `scope` with at most `max_concurrency` resources in
/// flight.
///
/// Only a failed listing is an error. Per-resource failures, including a
/// panicking worker, become failed [`PassResult`]s and never affect sibling
/// resources. Once the engine's token is cancelled, resources still waiting
/// for a permit fail with `Cancelled` instead of starting.
pub async fn run_pass(
    engine: &SyncEngine,
    scope: SyncScope,
    max_concurrency: usize,
) -> Result<PassSummary, SyncError> {
    let started = Instant::now();
    let listed = engine.scanner().list_resources().await?;
    let resources: Vec<Resource> = match scope {
        SyncScope::All => listed,
        SyncScope::Resource(name) => listed.into_iter().filter(|r| r.name == name).collect(),
    };

    let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut workers = Vec::with_capacity(resources.len());
    for resource in resources {
        let engine = engine.clone();
        let permits = Arc::clone(&permits);
        let task_resource = resource.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await;
            let attempt = Instant::now();
            if engine.cancellation().is_cancelled() {
                debug!(resource = %task_resource.name, "shutdown requested, not starting");
                let err = SyncError::Cancelled {
                    resource_id: task_resource.id.clone(),
                };
                return PassResult::failed(
                    &task_resource,
                    engine.target_for(&task_resource),
                    err,
                    attempt.elapsed(),
                );
            }
            match engine.sync_resource(&task_resource).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(
                        resource = %task_resource.name,
                        kind = ?err.kind(),
                        error = %err,
                        "resource sync failed"
                    );
                    PassResult::failed(
                        &task_resource,
                        engine.target_for(&task_resource),
                        err,
                        attempt.elapsed(),
                    )
                }
            }
        });
        workers.push((resource, handle));
    }

    let mut results = Vec::with_capacity(workers.len());
    for (resource, handle) in workers {
        let result = match handle.await {
            Ok(result) => result,
            Err(join) => {
                let err = SyncError::Worker {
                    resource_id: resource.id.clone(),
                    reason: join.to_string(),
                };
                warn!(resource = %resource.name, error = %err, "resource worker aborted");
                PassResult::failed(&resource, engine.target_for(&resource), err, Duration::ZERO)
            }
        };
        results.push(result);
    }

    let summary = PassSummary {
        results,
        elapsed: started.elapsed(),
    };
    info!(
        resources = summary.results.len(),
        created = summary.created(),
        skipped = summary.skipped(),
        unchanged = summary.unchanged(),
        failed = summary.failed(),
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "pass complete"
    );
    Ok(summary)
}
