//! A [`Sink`] wrapper that reads through to the real store but never writes.

use async_trait::async_trait;
use tracing::info;

use scanbridge_core::{Fingerprint, Record, TargetName};

use crate::error::SinkError;
use crate::sink::{CreateOutcome, Sink};

#[derive(Debug)]
pub struct DryRunSink<S> {
    inner: S,
}

impl<S: Sink> DryRunSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: Sink> Sink for DryRunSink<S> {
    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    async fn prepare(&self, target: &TargetName) -> Result<(), SinkError> {
        info!(target = %target, "dry run: would prepare target");
        Ok(())
    }

    async fn exists(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
    ) -> Result<bool, SinkError> {
        self.inner.exists(target, fingerprint).await
    }

    async fn create(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
        _record: &Record,
    ) -> Result<CreateOutcome, SinkError> {
        info!(target = %target, %fingerprint, "dry run: would create document");
        Ok(CreateOutcome::Created)
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;

    #[tokio::test]
    async fn dry_run_reads_through_and_never_writes() {
        let target = TargetName::from("nessus_weekly");
        let memory = MemorySink::new();
        memory
            .create(&target, Fingerprint(1), &Record::new())
            .await
            .unwrap();

        let sink = DryRunSink::new(memory);
        assert!(sink.exists(&target, Fingerprint(1)).await.unwrap());
        assert!(!sink.exists(&target, Fingerprint(2)).await.unwrap());
        assert_eq!(
            sink.create(&target, Fingerprint(2), &Record::new()).await.unwrap(),
            CreateOutcome::Created
        );

        let memory = sink.into_inner();
        assert_eq!(memory.count(&target).await, 1);
        assert!(!memory.is_prepared(&target).await);
    }
}
