//! Elasticsearch adapter.
//!
//! One index per target. Documents use the fingerprint as `_id`, and
//! `_create` gives the no-overwrite guarantee.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use scanbridge_core::types::INGESTED_AT_FIELD;
use scanbridge_core::{Fingerprint, Record, TargetName};

use crate::error::SinkError;
use crate::sink::{CreateOutcome, Sink};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const ALREADY_EXISTS: &str = "resource_already_exists_exception";

#[derive(Debug, Clone)]
pub struct ElasticSink {
    http: Client,
    base_url: String,
}

impl ElasticSink {
    pub fn new(url: &str, auth: &str, accept_invalid_certs: bool) -> Result<Self, SinkError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(auth).map_err(|_| {
            SinkError::Setup("auth contains characters not allowed in a header".to_string())
        })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|source| SinkError::Http {
                endpoint: url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Index body typing the ingestion stamp as epoch seconds.
pub fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                INGESTED_AT_FIELD: { "type": "date", "format": "epoch_second" }
            }
        }
    })
}

fn http_error(path: &str, source: reqwest::Error) -> SinkError {
    SinkError::Http {
        endpoint: path.to_string(),
        source,
    }
}

async fn status_error(path: &str, response: reqwest::Response) -> SinkError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    SinkError::Status {
        endpoint: path.to_string(),
        status,
        body,
    }
}

#[async_trait]
impl Sink for ElasticSink {
    fn kind(&self) -> &'static str {
        "elasticsearch"
    }

    async fn prepare(&self, target: &TargetName) -> Result<(), SinkError> {
        let path = format!("/{target}");
        let response = self
            .http
            .put(self.url(&path))
            .json(&index_mapping())
            .send()
            .await
            .map_err(|source| http_error(&path, source))?;

        if response.status().is_success() {
            debug!(index = %target, "index created");
            return Ok(());
        }
        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            if body.contains(ALREADY_EXISTS) {
                return Ok(());
            }
            return Err(SinkError::Status {
                endpoint: path,
                status: StatusCode::BAD_REQUEST.as_u16(),
                body,
            });
        }
        Err(status_error(&path, response).await)
    }

    async fn exists(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
    ) -> Result<bool, SinkError> {
        let path = format!("/{target}/_doc/{fingerprint}");
        let response = self
            .http
            .get(self.url(&path))
            .send()
            .await
            .map_err(|source| http_error(&path, source))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|source| http_error(&path, source))?;
                Ok(body.get("found").and_then(Value::as_bool).unwrap_or(true))
            }
            _ => Err(status_error(&path, response).await),
        }
    }

    async fn create(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
        record: &Record,
    ) -> Result<CreateOutcome, SinkError> {
        let path = format!("/{target}/_create/{fingerprint}");
        let response = self
            .http
            .put(self.url(&path))
            .json(record)
            .send()
            .await
            .map_err(|source| http_error(&path, source))?;

        match response.status() {
            StatusCode::CONFLICT => Ok(CreateOutcome::Conflict),
            status if status.is_success() => Ok(CreateOutcome::Created),
            _ => Err(status_error(&path, response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_types_ingested_at_as_epoch_seconds() {
        let mapping = index_mapping();
        let field = &mapping["mappings"]["properties"][INGESTED_AT_FIELD];
        assert_eq!(field["type"], "date");
        assert_eq!(field["format"], "epoch_second");
    }

    #[test]
    fn base_url_is_normalised() {
        let sink = ElasticSink::new("https://es.local:9200/", "Basic abc", false).unwrap();
        assert_eq!(sink.url("/nessus_weekly"), "https://es.local:9200/nessus_weekly");
    }

    #[test]
    fn invalid_auth_header_is_a_setup_error() {
        let err = ElasticSink::new("https://es.local", "bad\nvalue", false).unwrap_err();
        assert!(matches!(err, SinkError::Setup(_)));
    }
}
