//! In-process [`Sink`] for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use scanbridge_core::{Fingerprint, Record, TargetName};

use crate::error::SinkError;
use crate::sink::{CreateOutcome, Sink};

#[derive(Debug, Default)]
struct State {
    documents: HashMap<TargetName, Vec<(Fingerprint, Record)>>,
    prepared: HashSet<TargetName>,
    /// Fingerprints hidden from `exists` whose `create` still conflicts,
    /// as if another writer got there first.
    racing: HashSet<Fingerprint>,
    fail_after: Option<usize>,
    creates: usize,
    closed: bool,
}

impl State {
    fn contains(&self, target: &TargetName, fingerprint: Fingerprint) -> bool {
        self.documents
            .get(target)
            .is_some_and(|docs| docs.iter().any(|(fp, _)| *fp == fingerprint))
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<State>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `create` after `successes` documents have been written.
    pub fn failing_after(successes: usize) -> Self {
        Self {
            state: Mutex::new(State {
                fail_after: Some(successes),
                ..State::default()
            }),
        }
    }

    pub async fn set_fail_after(&self, successes: Option<usize>) {
        self.state.lock().await.fail_after = successes;
    }

    /// Make `exists` miss `fingerprint` while `create` reports a conflict.
    pub async fn simulate_concurrent_write(&self, fingerprint: Fingerprint) {
        self.state.lock().await.racing.insert(fingerprint);
    }

    pub async fn documents(&self, target: &TargetName) -> Vec<Record> {
        self.state
            .lock()
            .await
            .documents
            .get(target)
            .map(|docs| docs.iter().map(|(_, r)| r.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn count(&self, target: &TargetName) -> usize {
        self.state
            .lock()
            .await
            .documents
            .get(target)
            .map_or(0, Vec::len)
    }

    pub async fn is_prepared(&self, target: &TargetName) -> bool {
        self.state.lock().await.prepared.contains(target)
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn prepare(&self, target: &TargetName) -> Result<(), SinkError> {
        let mut state = self.state.lock().await;
        state.prepared.insert(target.clone());
        state.documents.entry(target.clone()).or_default();
        Ok(())
    }

    async fn exists(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
    ) -> Result<bool, SinkError> {
        Ok(self.state.lock().await.contains(target, fingerprint))
    }

    async fn create(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
        record: &Record,
    ) -> Result<CreateOutcome, SinkError> {
        let mut state = self.state.lock().await;
        if state.fail_after.is_some_and(|limit| state.creates >= limit) {
            return Err(SinkError::Unavailable(format!(
                "injected failure after {} creates",
                state.creates
            )));
        }
        if state.racing.contains(&fingerprint) || state.contains(target, fingerprint) {
            return Ok(CreateOutcome::Conflict);
        }
        state.creates += 1;
        state
            .documents
            .entry(target.clone())
            .or_default()
            .push((fingerprint, record.clone()));
        Ok(CreateOutcome::Created)
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.state.lock().await.closed = true;
        Ok(())
    }
}
