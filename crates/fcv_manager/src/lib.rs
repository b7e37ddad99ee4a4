//! Feature compatibility version (FCV) manager.
//!
//! A durable, restart-surviving state machine that gates which on-disk
//! formats a server generation may use and drives upgrades and downgrades
//! between generations. Higher layers supply a [`VersionDocumentStore`] and
//! the cleanup actions to run, then share one [`FcvStateMachine`] per
//! process.

pub mod cleanup;
pub mod config;
pub mod document;
pub mod error;
pub mod file_store;
pub mod fjall_store;
pub mod lock;
pub mod recovery;
pub mod state_machine;
pub mod store;
pub mod version;

pub use cleanup::{ActionContext, ActionFailure, CleanupAction, CleanupActionRegistry, FnAction};
pub use config::{FcvConfig, NodeArgs, StoreBackend};
pub use document::{FcvDocument, FcvState, FCV_DOCUMENT_ID};
pub use error::FcvError;
pub use file_store::FileDocumentStore;
pub use fjall_store::FjallDocumentStore;
pub use lock::{TransitionGuard, TransitionLock};
pub use recovery::{RecoveryBootstrap, RecoveryReport};
pub use state_machine::{
    plan_transition, FcvStateMachine, MachineConfig, NodeRole, TransitionHooks, TransitionPlan,
};
pub use store::{MemoryDocumentStore, VersionDocumentStore};
pub use version::{FcvVersion, VersionCatalog};
