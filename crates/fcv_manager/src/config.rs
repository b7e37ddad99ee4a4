//! Runtime configuration and the CLI flags that produce it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use crate::file_store::FileDocumentStore;
use crate::fjall_store::FjallDocumentStore;
use crate::state_machine::{MachineConfig, NodeRole};
use crate::store::VersionDocumentStore;
use crate::version::{FcvVersion, VersionCatalog};

/// Document store backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreBackend {
    File,
    Fjall,
}

/// Shared CLI options for opening a node's FCV state.
#[derive(Parser, Debug, Clone)]
pub struct NodeArgs {
    /// Directory holding the node's version metadata.
    #[arg(long, env = "FCV_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Document store backend.
    #[arg(long, env = "FCV_STORE", value_enum, default_value = "file")]
    pub store: StoreBackend,

    /// Newest version generation this binary supports.
    #[arg(long, env = "FCV_LATEST", default_value = "7.1")]
    pub latest: FcvVersion,

    /// Previous continuous release; may equal the LTS.
    #[arg(long, env = "FCV_LAST_CONTINUOUS", default_value = "7.0")]
    pub last_continuous: FcvVersion,

    /// Previous long-term-support release.
    #[arg(long, env = "FCV_LAST_LTS", default_value = "6.0")]
    pub last_lts: FcvVersion,

    /// Version written on first initialization (alias or `major.minor`).
    /// Defaults to latest.
    #[arg(long, env = "FCV_INITIAL")]
    pub initial: Option<String>,

    #[arg(long, env = "FCV_ROLE", value_enum, default_value = "primary")]
    pub role: NodeRole,
}

/// Resolved configuration for embedding the manager.
#[derive(Clone, Debug)]
pub struct FcvConfig {
    pub data_dir: PathBuf,
    pub store: StoreBackend,
    pub machine: MachineConfig,
}

impl NodeArgs {
    pub fn into_config(self) -> anyhow::Result<FcvConfig> {
        let catalog = VersionCatalog::new(self.latest, self.last_continuous, self.last_lts)?;
        let initial_version = match self.initial.as_deref() {
            Some(raw) => catalog
                .resolve(raw)
                .with_context(|| format!("resolve --initial {raw:?}"))?,
            None => catalog.latest,
        };
        Ok(FcvConfig {
            data_dir: self.data_dir,
            store: self.store,
            machine: MachineConfig {
                catalog,
                initial_version,
                role: self.role,
            },
        })
    }
}

impl FcvConfig {
    /// Open the configured document store under `data_dir`.
    pub fn open_store(&self) -> anyhow::Result<Arc<dyn VersionDocumentStore>> {
        let store: Arc<dyn VersionDocumentStore> = match self.store {
            StoreBackend::File => Arc::new(FileDocumentStore::open_dir(self.data_dir.join("fcv"))?),
            StoreBackend::Fjall => {
                Arc::new(FjallDocumentStore::open_dir(self.data_dir.join("storage"))?)
            }
        };
        Ok(store)
    }
}
