//! Drives one export job from request to downloaded bytes.
//!
//! `requested → {pending, processing}* → ready → retrieved`, or `→ error`.
//! Between status checks the poller sleeps a fixed interval; the sleep
//! wakes early on cancellation, and an optional ceiling bounds the total
//! wait.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use scanbridge_core::config::DEFAULT_EXPORT_POLL_SECS;
use scanbridge_core::{ExportStatus, ResourceId};
use scanbridge_scanner::{ExportSpec, ScanService};

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    /// `None` waits until the job finishes or the token is cancelled.
    pub timeout: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_EXPORT_POLL_SECS),
            timeout: None,
        }
    }
}

pub struct ExportPoller<'a> {
    service: &'a dyn ScanService,
    config: &'a PollerConfig,
    cancel: &'a CancellationToken,
}

impl<'a> ExportPoller<'a> {
    pub fn new(
        service: &'a dyn ScanService,
        config: &'a PollerConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            service,
            config,
            cancel,
        }
    }

    /// Request an export of `resource_id`, wait for it, and download it.
    pub async fn export(
        &self,
        resource_id: &ResourceId,
        spec: &ExportSpec,
    ) -> Result<Vec<u8>, SyncError> {
        let started = Instant::now();
        let mut job = self.service.request_export(resource_id, spec).await?;

        loop {
            job.status = self.service.export_status(&job).await?;
            match job.status {
                ExportStatus::Ready => break,
                ExportStatus::Error => {
                    return Err(SyncError::ExportFailed {
                        resource_id: resource_id.clone(),
                    })
                }
                ExportStatus::Pending | ExportStatus::Processing => {}
            }

            let waited = started.elapsed();
            if let Some(limit) = self.config.timeout {
                if waited >= limit {
                    return Err(SyncError::ExportTimedOut {
                        resource_id: resource_id.clone(),
                        waited,
                    });
                }
            }

            debug!(
                resource = %resource_id,
                job = %job.job_id,
                status = %job.status,
                "export not ready"
            );
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(SyncError::Cancelled {
                        resource_id: resource_id.clone(),
                    });
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        let bytes = self.service.download_export(&job).await?;
        debug!(
            resource = %resource_id,
            job = %job.job_id,
            bytes = bytes.len(),
            waited_ms = started.elapsed().as_millis() as u64,
            "export retrieved"
        );
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use scanbridge_core::{ModificationStamp, Resource};
    use scanbridge_scanner::MemoryScanService;

    use super::*;

    async fn service_with(statuses: Vec<ExportStatus>) -> (MemoryScanService, ResourceId) {
        let service = MemoryScanService::new();
        let id = ResourceId::from("5");
        service
            .upsert(Resource::new("5", "Weekly"), ModificationStamp(1), "a\n1\n")
            .await;
        service.script_statuses(&id, statuses).await;
        (service, id)
    }

    #[tokio::test(start_paused = true)]
    async fn waits_one_interval_per_unready_status() {
        let (service, id) =
            service_with(vec![ExportStatus::Pending, ExportStatus::Processing]).await;
        let config = PollerConfig::default();
        let cancel = CancellationToken::new();

        let started = Instant::now();
        let bytes = ExportPoller::new(&service, &config, &cancel)
            .export(&id, &ExportSpec::default())
            .await
            .unwrap();

        assert_eq!(bytes, b"a\n1\n");
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(service.status_checks(&id).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn error_status_fails_export() {
        let (service, id) = service_with(vec![ExportStatus::Pending, ExportStatus::Error]).await;
        let config = PollerConfig::default();
        let cancel = CancellationToken::new();

        let err = ExportPoller::new(&service, &config, &cancel)
            .export(&id, &ExportSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ExportFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn ceiling_stops_a_stuck_job() {
        let (service, id) = service_with(vec![ExportStatus::Processing; 100]).await;
        let config = PollerConfig {
            poll_interval: Duration::from_secs(2),
            timeout: Some(Duration::from_secs(10)),
        };
        let cancel = CancellationToken::new();

        let err = ExportPoller::new(&service, &config, &cancel)
            .export(&id, &ExportSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::ExportTimedOut { .. }));
        assert_eq!(service.status_checks(&id).await, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let (service, id) = service_with(vec![ExportStatus::Processing; 100]).await;
        let config = PollerConfig {
            poll_interval: Duration::from_secs(3600),
            timeout: None,
        };
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = ExportPoller::new(&service, &config, &cancel)
            .export(&id, &ExportSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(3600));
    }
}
