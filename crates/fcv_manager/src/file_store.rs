//! File-backed document store.
//!
//! The document is wrapped in a checksummed JSON envelope and replaced via a
//! temp file + fsync + rename, so a crash leaves either the old or the new
//! document on disk, never a mix.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::document::{FcvDocument, FCV_DOCUMENT_ID};
use crate::error::FcvError;
use crate::store::VersionDocumentStore;

const ENVELOPE_VERSION: u8 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentEnvelope {
    version: u8,
    id: String,
    checksum_crc32: u32,
    payload: FcvDocument,
}

/// Stores the FCV document as `<dir>/featureCompatibilityVersion.json`.
pub struct FileDocumentStore {
    path: PathBuf,
}

impl FileDocumentStore {
    pub fn open_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("create fcv dir: {}", dir.display()))?;
        Ok(Self {
            path: dir.join(format!("{FCV_DOCUMENT_ID}.json")),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    fn write_envelope(&self, doc: &FcvDocument) -> anyhow::Result<()> {
        let envelope = DocumentEnvelope {
            version: ENVELOPE_VERSION,
            id: FCV_DOCUMENT_ID.to_string(),
            checksum_crc32: payload_checksum(doc)?,
            payload: doc.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope).context("serialize fcv document")?;
        let tmp_path = self.tmp_path();
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .with_context(|| format!("open fcv temp file: {}", tmp_path.display()))?;
            file.write_all(&bytes)
                .with_context(|| format!("write fcv temp file: {}", tmp_path.display()))?;
            file.sync_all()
                .with_context(|| format!("sync fcv temp file: {}", tmp_path.display()))?;
        }
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "replace fcv document {} -> {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        sync_parent_dir(&self.path)
    }
}

impl VersionDocumentStore for FileDocumentStore {
    fn read(&self) -> Result<Option<FcvDocument>, FcvError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(FcvError::storage(format!(
                    "read {}: {err}",
                    self.path.display()
                )))
            }
        };
        let doc = decode_envelope(&bytes)
            .map_err(|err| FcvError::corrupt(format!("{}: {err:#}", self.path.display())))?;
        doc.validate()?;
        Ok(Some(doc))
    }

    fn write(&self, doc: &FcvDocument) -> Result<(), FcvError> {
        doc.validate()?;
        self.write_envelope(doc)
            .map_err(|err| FcvError::storage(format!("{err:#}")))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

fn payload_checksum(doc: &FcvDocument) -> anyhow::Result<u32> {
    let payload = serde_json::to_vec(doc).context("serialize fcv payload")?;
    Ok(crc32fast::hash(&payload))
}

fn decode_envelope(bytes: &[u8]) -> anyhow::Result<FcvDocument> {
    let envelope: DocumentEnvelope =
        serde_json::from_slice(bytes).context("parse fcv document envelope")?;
    if envelope.version != ENVELOPE_VERSION {
        anyhow::bail!("unsupported fcv envelope version {}", envelope.version);
    }
    if envelope.id != FCV_DOCUMENT_ID {
        anyhow::bail!("unexpected document id {:?}", envelope.id);
    }
    let actual = payload_checksum(&envelope.payload)?;
    if actual != envelope.checksum_crc32 {
        return Err(anyhow!(
            "checksum mismatch (expected={}, actual={actual})",
            envelope.checksum_crc32
        ));
    }
    Ok(envelope.payload)
}

fn sync_parent_dir(path: &Path) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow!("invalid fcv document path: {}", path.display()))?;
    // Directory fsync is not supported everywhere; the rename itself is atomic.
    if let Ok(dir) = File::open(parent) {
        let _ = dir.sync_all();
    }
    Ok(())
}
