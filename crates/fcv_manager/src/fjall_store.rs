//! Document store backed by a fjall keyspace partition.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use fjall::{Keyspace, PartitionCreateOptions, PersistMode};

use crate::document::{FcvDocument, FCV_DOCUMENT_ID};
use crate::error::FcvError;
use crate::store::VersionDocumentStore;

/// Partition holding server version metadata.
const VERSION_PARTITION: &str = "system_version";

pub struct FjallDocumentStore {
    keyspace: Arc<Keyspace>,
    partition: fjall::PartitionHandle,
}

impl FjallDocumentStore {
    /// Open (or create) a dedicated keyspace under `dir`.
    pub fn open_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let keyspace = fjall::Config::new(dir)
            .open()
            .with_context(|| format!("open fjall keyspace: {}", dir.display()))?;
        Self::open(Arc::new(keyspace))
    }

    /// Share an existing keyspace with the rest of the server.
    pub fn open(keyspace: Arc<Keyspace>) -> anyhow::Result<Self> {
        let partition = keyspace
            .open_partition(VERSION_PARTITION, PartitionCreateOptions::default())
            .context("open fcv partition")?;
        Ok(Self {
            keyspace,
            partition,
        })
    }

    fn put(&self, doc: &FcvDocument) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(doc).context("serialize fcv document")?;
        // A single-key insert is applied atomically by the journal.
        self.partition
            .insert(FCV_DOCUMENT_ID, bytes)
            .context("insert fcv document")?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("persist fcv keyspace")?;
        Ok(())
    }
}

impl VersionDocumentStore for FjallDocumentStore {
    fn read(&self) -> Result<Option<FcvDocument>, FcvError> {
        let Some(bytes) = self
            .partition
            .get(FCV_DOCUMENT_ID)
            .map_err(|err| FcvError::storage(format!("fjall get: {err}")))?
        else {
            return Ok(None);
        };
        let doc: FcvDocument = serde_json::from_slice(&bytes)
            .map_err(|err| FcvError::corrupt(format!("decode fjall fcv document: {err}")))?;
        doc.validate()?;
        Ok(Some(doc))
    }

    fn write(&self, doc: &FcvDocument) -> Result<(), FcvError> {
        doc.validate()?;
        self.put(doc)
            .map_err(|err| FcvError::storage(format!("{err:#}")))
    }

    fn describe(&self) -> String {
        format!("fjall:{VERSION_PARTITION}")
    }
}
