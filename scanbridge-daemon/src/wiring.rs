//! Construction and teardown of the external collaborators.
//!
//! Everything the engine talks to is built here once at startup and handed
//! down explicitly; [`Services::close`] is the matching teardown.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use scanbridge_core::{Config, SinkConfig};
use scanbridge_scanner::{NessusClient, ScanService};
use scanbridge_sink::{DryRunSink, ElasticSink, MongoSink, Sink};
use scanbridge_sync::{ChangeTracker, EngineConfig, Enrichment, HttpFeed, SyncEngine};

use crate::error::DaemonError;

/// Whether created records are actually written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Write,
    DryRun,
}

#[derive(Clone)]
pub struct Services {
    pub scanner: Arc<dyn ScanService>,
    pub sink: Arc<dyn Sink>,
    pub enrichment: Enrichment,
}

impl Services {
    /// Fetch the enrichment feed, then build the scanner client and sink.
    /// A feed failure returns before any sink is connected.
    pub async fn connect(config: &Config, mode: SinkMode) -> Result<Self, DaemonError> {
        let feed = HttpFeed::new(config.enrichment.feed_url.clone())?;
        let enrichment = Enrichment::load(Arc::new(feed)).await?;

        let scanner: Arc<dyn ScanService> = Arc::new(NessusClient::new(&config.scanner)?);
        let mut sink = connect_sink(&config.sink).await?;
        if mode == SinkMode::DryRun {
            sink = Arc::new(DryRunSink::new(sink));
        }
        info!(scanner = %config.scanner.url, sink = sink.kind(), ?mode, "services ready");

        Ok(Self {
            scanner,
            sink,
            enrichment,
        })
    }

    pub fn from_parts(
        scanner: Arc<dyn ScanService>,
        sink: Arc<dyn Sink>,
        enrichment: Enrichment,
    ) -> Self {
        Self {
            scanner,
            sink,
            enrichment,
        }
    }

    /// A fresh engine with empty change history.
    pub fn engine(&self, config: EngineConfig, cancel: CancellationToken) -> SyncEngine {
        SyncEngine::new(
            Arc::clone(&self.scanner),
            Arc::clone(&self.sink),
            Arc::new(ChangeTracker::new()),
            self.enrichment.clone(),
            config,
            cancel,
        )
    }

    pub async fn close(&self) {
        match self.sink.close().await {
            Ok(()) => info!(sink = self.sink.kind(), "sink closed"),
            Err(err) => warn!(sink = self.sink.kind(), error = %err, "sink close failed"),
        }
    }
}

pub async fn connect_sink(config: &SinkConfig) -> Result<Arc<dyn Sink>, DaemonError> {
    let sink: Arc<dyn Sink> = match config {
        SinkConfig::Elasticsearch {
            url,
            auth,
            accept_invalid_certs,
        } => Arc::new(ElasticSink::new(url, auth, *accept_invalid_certs)?),
        SinkConfig::Mongodb { uri, database } => Arc::new(MongoSink::connect(uri, database).await?),
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn elasticsearch_sink_builds_without_network() {
        let sink = connect_sink(&SinkConfig::Elasticsearch {
            url: "https://es.local:9200".to_string(),
            auth: "Basic dXNlcjpwYXNz".to_string(),
            accept_invalid_certs: false,
        })
        .await
        .expect("sink");
        assert_eq!(sink.kind(), "elasticsearch");
    }

    #[tokio::test]
    async fn bad_elasticsearch_auth_is_a_sink_error() {
        let err = connect_sink(&SinkConfig::Elasticsearch {
            url: "https://es.local:9200".to_string(),
            auth: "line\nbreak".to_string(),
            accept_invalid_certs: false,
        })
        .await
        .err()
        .expect("error");
        assert!(matches!(err, DaemonError::Sink(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
