//! In-process [`ScanService`] used by tests and local dry runs.
//!
//! Each resource carries a modification stamp, the CSV body its exports
//! return, and an optional script of statuses that successive
//! `export_status` calls walk through before reporting `ready`.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use scanbridge_core::{ExportJob, ExportStatus, ModificationStamp, Resource, ResourceId};

use crate::error::ScannerError;
use crate::export_spec::ExportSpec;
use crate::service::ScanService;

#[derive(Debug, Clone)]
struct Entry {
    resource: Resource,
    modification: ModificationStamp,
    export: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    entries: Vec<Entry>,
    scripts: HashMap<ResourceId, VecDeque<ExportStatus>>,
    unavailable: HashSet<ResourceId>,
    listing_unavailable: bool,
    export_requests: HashMap<ResourceId, usize>,
    status_checks: HashMap<ResourceId, usize>,
    next_job: u64,
}

impl State {
    fn entry(&self, id: &ResourceId) -> Result<&Entry, ScannerError> {
        if self.unavailable.contains(id) {
            return Err(unavailable(id));
        }
        self.entries
            .iter()
            .find(|e| &e.resource.id == id)
            .ok_or_else(|| ScannerError::UnknownResource(id.clone()))
    }
}

fn unavailable(id: &ResourceId) -> ScannerError {
    ScannerError::Status {
        endpoint: format!("/scans/{id}"),
        status: 503,
        body: "service unavailable".to_string(),
    }
}

#[derive(Debug, Default)]
pub struct MemoryScanService {
    state: Mutex<State>,
}

impl MemoryScanService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a resource.
    pub async fn upsert(
        &self,
        resource: Resource,
        modification: ModificationStamp,
        export: impl Into<Vec<u8>>,
    ) {
        let mut state = self.state.lock().await;
        let entry = Entry {
            resource,
            modification,
            export: export.into(),
        };
        match state
            .entries
            .iter_mut()
            .find(|e| e.resource.id == entry.resource.id)
        {
            Some(existing) => *existing = entry,
            None => state.entries.push(entry),
        }
    }

    /// Bump a resource's stamp and optionally swap its export body.
    pub async fn touch(
        &self,
        id: &ResourceId,
        modification: ModificationStamp,
        export: Option<Vec<u8>>,
    ) {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.entries.iter_mut().find(|e| &e.resource.id == id) {
            entry.modification = modification;
            if let Some(export) = export {
                entry.export = export;
            }
        }
    }

    /// Statuses returned by the next `export_status` calls for `id`; once
    /// exhausted the job reports `ready`.
    pub async fn script_statuses(&self, id: &ResourceId, statuses: Vec<ExportStatus>) {
        self.state
            .lock()
            .await
            .scripts
            .insert(id.clone(), statuses.into());
    }

    /// Make every per-resource call for `id` fail with HTTP 503.
    pub async fn set_unavailable(&self, id: &ResourceId, unavailable: bool) {
        let mut state = self.state.lock().await;
        if unavailable {
            state.unavailable.insert(id.clone());
        } else {
            state.unavailable.remove(id);
        }
    }

    pub async fn set_listing_unavailable(&self, unavailable: bool) {
        self.state.lock().await.listing_unavailable = unavailable;
    }

    /// Number of export requests made for `id`.
    pub async fn export_requests(&self, id: &ResourceId) -> usize {
        self.state
            .lock()
            .await
            .export_requests
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    /// Number of status checks made for `id`.
    pub async fn status_checks(&self, id: &ResourceId) -> usize {
        self.state
            .lock()
            .await
            .status_checks
            .get(id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ScanService for MemoryScanService {
    async fn list_resources(&self) -> Result<Vec<Resource>, ScannerError> {
        let state = self.state.lock().await;
        if state.listing_unavailable {
            return Err(ScannerError::Status {
                endpoint: "/scans".to_string(),
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(state.entries.iter().map(|e| e.resource.clone()).collect())
    }

    async fn last_modification(&self, id: &ResourceId) -> Result<ModificationStamp, ScannerError> {
        let state = self.state.lock().await;
        state.entry(id).map(|e| e.modification)
    }

    async fn request_export(
        &self,
        id: &ResourceId,
        _spec: &ExportSpec,
    ) -> Result<ExportJob, ScannerError> {
        let mut state = self.state.lock().await;
        state.entry(id)?;
        *state.export_requests.entry(id.clone()).or_default() += 1;
        state.next_job += 1;
        Ok(ExportJob {
            resource_id: id.clone(),
            job_id: state.next_job.to_string(),
            status: ExportStatus::Pending,
        })
    }

    async fn export_status(&self, job: &ExportJob) -> Result<ExportStatus, ScannerError> {
        let mut state = self.state.lock().await;
        state.entry(&job.resource_id)?;
        *state
            .status_checks
            .entry(job.resource_id.clone())
            .or_default() += 1;
        let next = state
            .scripts
            .get_mut(&job.resource_id)
            .and_then(VecDeque::pop_front);
        Ok(next.unwrap_or(ExportStatus::Ready))
    }

    async fn download_export(&self, job: &ExportJob) -> Result<Vec<u8>, ScannerError> {
        let state = self.state.lock().await;
        state.entry(&job.resource_id).map(|e| e.export.clone())
    }
}
