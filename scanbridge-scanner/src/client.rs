//! HTTP client for the Nessus-style scanning API.
//!
//! Endpoints used:
//! - `GET  /scans`                                   → resource listing
//! - `GET  /scans/{id}`                              → history / modification stamp
//! - `POST /scans/{id}/export`                       → export job id
//! - `GET  /scans/{id}/export/{file}/status`         → job status
//! - `GET  /scans/{id}/export/{file}/download`       → CSV bytes

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use scanbridge_core::config::ScannerConfig;
use scanbridge_core::{ExportJob, ExportStatus, ModificationStamp, Resource, ResourceId};

use crate::error::ScannerError;
use crate::export_spec::ExportSpec;
use crate::service::ScanService;

const API_KEYS_HEADER: &str = "X-ApiKeys";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ScanList {
    #[serde(default)]
    scans: Option<Vec<ScanSummary>>,
}

#[derive(Debug, Deserialize)]
struct ScanSummary {
    id: Value,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScanDetail {
    #[serde(default)]
    history: Option<Vec<HistoryEntry>>,
    #[serde(default)]
    info: Option<ScanInfo>,
}

#[derive(Debug, Deserialize)]
struct HistoryEntry {
    #[serde(default)]
    last_modification_date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ScanInfo {
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ExportTicket {
    file: Value,
    /// Some server versions report the job state with the ticket.
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Scanning service reached over HTTPS with API-key authentication.
#[derive(Debug, Clone)]
pub struct NessusClient {
    http: Client,
    base_url: String,
}

impl NessusClient {
    pub fn new(config: &ScannerConfig) -> Result<Self, ScannerError> {
        let keys = format!(
            "accessKey={};secretKey={}",
            config.access_key, config.secret_key
        );
        let mut headers = HeaderMap::new();
        let mut keys = HeaderValue::from_str(&keys).map_err(|_| {
            ScannerError::Setup("API keys contain characters not allowed in a header".to_string())
        })?;
        keys.set_sensitive(true);
        headers.insert(API_KEYS_HEADER, keys);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|source| http_error(&config.url, source))?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ScannerError> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|source| http_error(path, source))?;
        let response = ensure_success(path, response).await?;
        response.json::<T>().await.map_err(|source| http_error(path, source))
    }
}

fn http_error(path: &str, source: reqwest::Error) -> ScannerError {
    ScannerError::Http {
        endpoint: path.to_string(),
        source,
    }
}

async fn ensure_success(path: &str, response: Response) -> Result<Response, ScannerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ScannerError::Status {
        endpoint: path.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Upstream ids are integers; job handles are kept as opaque strings.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The most recent history entry wins; a scan that has never run falls back
/// to its info timestamp.
pub(crate) fn modification_from_detail(detail: &ScanDetail) -> Option<ModificationStamp> {
    let from_history = detail
        .history
        .iter()
        .flatten()
        .filter_map(|entry| entry.last_modification_date)
        .max();
    from_history
        .or_else(|| detail.info.as_ref().and_then(|info| info.timestamp))
        .map(ModificationStamp)
}

pub(crate) fn parse_status(raw: &str) -> ExportStatus {
    match raw {
        "ready" => ExportStatus::Ready,
        "error" => ExportStatus::Error,
        "loading" | "processing" => ExportStatus::Processing,
        _ => ExportStatus::Pending,
    }
}

/// Build the job handle for an export ticket. Without a reported status the
/// job starts out `Pending`.
fn job_from_ticket(
    id: &ResourceId,
    endpoint: String,
    ticket: &ExportTicket,
) -> Result<ExportJob, ScannerError> {
    let job_id = id_string(&ticket.file).ok_or(ScannerError::MissingField {
        endpoint,
        field: "file",
    })?;
    Ok(ExportJob {
        resource_id: id.clone(),
        job_id,
        status: ticket
            .status
            .as_deref()
            .map_or(ExportStatus::Pending, parse_status),
    })
}

#[async_trait]
impl ScanService for NessusClient {
    async fn list_resources(&self) -> Result<Vec<Resource>, ScannerError> {
        let list: ScanList = self.get_json("/scans").await?;
        let resources = list
            .scans
            .unwrap_or_default()
            .into_iter()
            .filter_map(|scan| id_string(&scan.id).map(|id| Resource::new(id, scan.name)))
            .collect::<Vec<_>>();
        debug!(count = resources.len(), "listed resources");
        Ok(resources)
    }

    async fn last_modification(&self, id: &ResourceId) -> Result<ModificationStamp, ScannerError> {
        let path = format!("/scans/{id}");
        let detail: ScanDetail = self.get_json(&path).await?;
        modification_from_detail(&detail).ok_or(ScannerError::MissingField {
            endpoint: path,
            field: "history.last_modification_date",
        })
    }

    async fn request_export(
        &self,
        id: &ResourceId,
        spec: &ExportSpec,
    ) -> Result<ExportJob, ScannerError> {
        let path = format!("/scans/{id}/export");
        let response = self
            .http
            .post(self.url(&path))
            .json(&spec.to_request_body())
            .send()
            .await
            .map_err(|source| http_error(&path, source))?;
        let ticket: ExportTicket = ensure_success(&path, response)
            .await?
            .json()
            .await
            .map_err(|source| http_error(&path, source))?;
        let job = job_from_ticket(id, path, &ticket)?;
        debug!(resource = %id, job = %job.job_id, status = %job.status, "export requested");
        Ok(job)
    }

    async fn export_status(&self, job: &ExportJob) -> Result<ExportStatus, ScannerError> {
        let path = format!("/scans/{}/export/{}/status", job.resource_id, job.job_id);
        let reply: StatusReply = self.get_json(&path).await?;
        Ok(parse_status(&reply.status))
    }

    async fn download_export(&self, job: &ExportJob) -> Result<Vec<u8>, ScannerError> {
        let path = format!("/scans/{}/export/{}/download", job.resource_id, job.job_id);
        let response = self
            .http
            .get(self.url(&path))
            .send()
            .await
            .map_err(|source| http_error(&path, source))?;
        let bytes = ensure_success(&path, response)
            .await?
            .bytes()
            .await
            .map_err(|source| http_error(&path, source))?;
        Ok(bytes.to_vec())
    }
}
