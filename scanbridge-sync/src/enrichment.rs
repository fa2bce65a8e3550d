//! Known-exploited identifier snapshot.
//!
//! The feed is a JSON document with `vulnerabilities[].cveID`. The engine
//! reads from an [`Enrichment`] handle holding the current snapshot; the
//! scheduler may swap in a fresh one between passes.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::SyncError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Immutable set of known-exploited identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownExploited {
    identifiers: HashSet<String>,
}

impl KnownExploited {
    pub fn from_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains(identifier)
    }

    /// Whether a record's identifier cell is in the set. Non-string cells
    /// (null, numbers) never match.
    pub fn matches(&self, cell: Option<&Value>) -> bool {
        cell.and_then(Value::as_str)
            .is_some_and(|id| self.contains(id.trim()))
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    vulnerabilities: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    #[serde(rename = "cveID")]
    cve_id: String,
}

/// Parse the feed's JSON body.
pub fn parse_feed(body: &[u8]) -> Result<KnownExploited, serde_json::Error> {
    let feed: Feed = serde_json::from_slice(body)?;
    Ok(KnownExploited::from_identifiers(
        feed.vulnerabilities.into_iter().map(|e| e.cve_id),
    ))
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where snapshots come from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self) -> Result<KnownExploited, SyncError>;
}

/// Feed fetched over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFeed {
    http: reqwest::Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>) -> Result<Self, SyncError> {
        let url = url.into();
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Enrichment {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { http, url })
    }

    fn failure(&self, reason: impl ToString) -> SyncError {
        SyncError::Enrichment {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn fetch(&self) -> Result<KnownExploited, SyncError> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| self.failure(e))?;
        if !response.status().is_success() {
            return Err(self.failure(format!("HTTP {}", response.status())));
        }
        let body = response.bytes().await.map_err(|e| self.failure(e))?;
        parse_feed(&body).map_err(|e| self.failure(e))
    }
}

/// Fixed snapshot, for tests and offline runs.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed(pub KnownExploited);

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> Result<KnownExploited, SyncError> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Current snapshot shared by the engine and the scheduler.
#[derive(Clone)]
pub struct Enrichment {
    source: Arc<dyn FeedSource>,
    current: Arc<RwLock<Arc<KnownExploited>>>,
}

impl Enrichment {
    /// Fetch the initial snapshot. A failure here is fatal to startup.
    pub async fn load(source: Arc<dyn FeedSource>) -> Result<Self, SyncError> {
        let snapshot = source.fetch().await?;
        info!(identifiers = snapshot.len(), "known-exploited feed loaded");
        Ok(Self {
            source,
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        })
    }

    /// Handle over a fixed snapshot that never refreshes to anything else.
    pub fn fixed(snapshot: KnownExploited) -> Self {
        let current = Arc::new(RwLock::new(Arc::new(snapshot.clone())));
        Self {
            source: Arc::new(StaticFeed(snapshot)),
            current,
        }
    }

    pub fn snapshot(&self) -> Arc<KnownExploited> {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the snapshot. On failure the previous snapshot stays in use.
    pub async fn refresh(&self) -> bool {
        match self.source.fetch().await {
            Ok(snapshot) => {
                info!(identifiers = snapshot.len(), "known-exploited feed refreshed");
                let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
                *guard = Arc::new(snapshot);
                true
            }
            Err(err) => {
                warn!(error = %err, "feed refresh failed, keeping previous snapshot");
                false
            }
        }
    }
}

impl std::fmt::Debug for Enrichment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enrichment")
            .field("identifiers", &self.snapshot().len())
            .finish()
    }
}
