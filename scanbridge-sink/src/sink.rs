//! The document-store capability written to by the sync engine.

use std::sync::Arc;

use async_trait::async_trait;

use scanbridge_core::{Fingerprint, Record, TargetName};

use crate::error::SinkError;

/// Result of a conditional create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A document with the same fingerprint already exists; nothing was
    /// written.
    Conflict,
}

/// A document store keyed by target collection and record fingerprint.
///
/// `create` must never overwrite: when the fingerprint is already present it
/// answers [`CreateOutcome::Conflict`].
#[async_trait]
pub trait Sink: Send + Sync {
    /// Short name used in logs.
    fn kind(&self) -> &'static str;

    /// Make sure `target` exists and is ready to receive records. Idempotent.
    async fn prepare(&self, target: &TargetName) -> Result<(), SinkError>;

    async fn exists(&self, target: &TargetName, fingerprint: Fingerprint)
        -> Result<bool, SinkError>;

    async fn create(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
        record: &Record,
    ) -> Result<CreateOutcome, SinkError>;

    /// Release connections. Called once at shutdown.
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    async fn prepare(&self, target: &TargetName) -> Result<(), SinkError> {
        (**self).prepare(target).await
    }

    async fn exists(&self, target: &TargetName, fingerprint: Fingerprint)
        -> Result<bool, SinkError> {
        (**self).exists(target, fingerprint).await
    }

    async fn create(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
        record: &Record,
    ) -> Result<CreateOutcome, SinkError> {
        (**self).create(target, fingerprint, record).await
    }

    async fn close(&self) -> Result<(), SinkError> {
        (**self).close().await
    }
}
