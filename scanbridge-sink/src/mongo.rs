//! MongoDB adapter.
//!
//! One collection per target inside the configured database. A unique index
//! on `fingerprint` turns concurrent duplicate inserts into duplicate-key
//! errors, which surface as [`CreateOutcome::Conflict`].

use async_trait::async_trait;
use mongodb::bson::{doc, to_document, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info};

use scanbridge_core::types::FINGERPRINT_FIELD;
use scanbridge_core::{Fingerprint, Record, TargetName};

use crate::error::SinkError;
use crate::sink::{CreateOutcome, Sink};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Clone)]
pub struct MongoSink {
    client: Client,
    database: Database,
}

impl MongoSink {
    /// Parse the URI and build a client. The driver connects lazily; the
    /// first `prepare` surfaces an unreachable server.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, SinkError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        info!(database = %database.name(), "mongodb client ready");
        Ok(Self { client, database })
    }

    fn collection(&self, target: &TargetName) -> Collection<Document> {
        self.database.collection(target.as_str())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl Sink for MongoSink {
    fn kind(&self) -> &'static str {
        "mongodb"
    }

    async fn prepare(&self, target: &TargetName) -> Result<(), SinkError> {
        let index = IndexModel::builder()
            .keys(doc! { FINGERPRINT_FIELD: 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection(target).create_index(index).await?;
        debug!(collection = %target, "fingerprint index ensured");
        Ok(())
    }

    async fn exists(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
    ) -> Result<bool, SinkError> {
        let found = self
            .collection(target)
            .find_one(doc! { FINGERPRINT_FIELD: fingerprint.to_hex() })
            .await?;
        Ok(found.is_some())
    }

    async fn create(
        &self,
        target: &TargetName,
        fingerprint: Fingerprint,
        record: &Record,
    ) -> Result<CreateOutcome, SinkError> {
        let mut document = to_document(record)?;
        document.insert(FINGERPRINT_FIELD, fingerprint.to_hex());
        match self.collection(target).insert_one(document).await {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(err) if is_duplicate_key(&err) => Ok(CreateOutcome::Conflict),
            Err(err) => Err(err.into()),
        }
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.client.clone().shutdown().await;
        info!("mongodb client shut down");
        Ok(())
    }
}
