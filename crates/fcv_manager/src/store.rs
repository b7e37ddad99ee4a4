//! Durable storage for the single FCV document.

use std::sync::Mutex;

use crate::document::FcvDocument;
use crate::error::FcvError;

/// Atomic single-document store.
///
/// `write` either lands the whole document or nothing. Callers serialize
/// writers; implementations only need to tolerate concurrent readers.
pub trait VersionDocumentStore: Send + Sync + 'static {
    /// Read the document, or `None` if it has never been created.
    fn read(&self) -> Result<Option<FcvDocument>, FcvError>;

    /// Durably replace the document.
    fn write(&self, doc: &FcvDocument) -> Result<(), FcvError>;

    /// Backend name for logs.
    fn describe(&self) -> String;
}

/// In-memory store, useful for embedding and tests that do not need a disk.
#[derive(Default)]
pub struct MemoryDocumentStore {
    slot: Mutex<Option<FcvDocument>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: FcvDocument) -> Self {
        Self {
            slot: Mutex::new(Some(doc)),
        }
    }
}

impl VersionDocumentStore for MemoryDocumentStore {
    fn read(&self) -> Result<Option<FcvDocument>, FcvError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| FcvError::storage("memory store lock poisoned"))?;
        if let Some(doc) = slot.as_ref() {
            doc.validate()?;
        }
        Ok(slot.clone())
    }

    fn write(&self, doc: &FcvDocument) -> Result<(), FcvError> {
        doc.validate()?;
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| FcvError::storage("memory store lock poisoned"))?;
        *slot = Some(doc.clone());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
