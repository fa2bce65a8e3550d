//! The upstream capability consumed by the sync engine.

use async_trait::async_trait;

use scanbridge_core::{ExportJob, ExportStatus, ModificationStamp, Resource, ResourceId};

use crate::error::ScannerError;
use crate::export_spec::ExportSpec;

/// Listing, detail and asynchronous export calls against a scanning service.
///
/// Implementations must be shareable across workers; every call is
/// independent and carries no per-resource session state.
#[async_trait]
pub trait ScanService: Send + Sync {
    /// All resources currently known upstream.
    async fn list_resources(&self) -> Result<Vec<Resource>, ScannerError>;

    /// Current modification stamp of one resource.
    async fn last_modification(&self, id: &ResourceId) -> Result<ModificationStamp, ScannerError>;

    /// Submit an export request. The returned job carries the initial status
    /// when the server reports one with the ticket, otherwise `Pending`.
    async fn request_export(
        &self,
        id: &ResourceId,
        spec: &ExportSpec,
    ) -> Result<ExportJob, ScannerError>;

    /// Current status of a previously requested export.
    async fn export_status(&self, job: &ExportJob) -> Result<ExportStatus, ScannerError>;

    /// Raw tabular bytes of a ready export.
    async fn download_export(&self, job: &ExportJob) -> Result<Vec<u8>, ScannerError>;
}
