//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use fcv_manager::{
    ActionContext, CleanupAction, CleanupActionRegistry, FcvConfig, FcvStateMachine,
    MachineConfig, StoreBackend, TransitionHooks,
};

/// Cleanup action whose failure is toggled by the test, standing in for the
/// server's fail points.
pub struct ScriptedAction {
    id: String,
    fail: AtomicBool,
    runs: AtomicU32,
}

impl ScriptedAction {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            fail: AtomicBool::new(false),
            runs: AtomicU32::new(0),
        })
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

impl CleanupAction for ScriptedAction {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&self, _ctx: &ActionContext) -> anyhow::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("{} forced to fail", self.id);
        }
        Ok(())
    }
}

/// Build downgrade hooks from scripted actions, in order.
pub fn cleanup_hooks(actions: &[Arc<ScriptedAction>]) -> TransitionHooks {
    let mut cleanup = CleanupActionRegistry::new();
    for action in actions {
        cleanup
            .register(action.clone())
            .expect("register scripted action");
    }
    TransitionHooks {
        cleanup,
        upgrade: CleanupActionRegistry::new(),
    }
}

/// Open a machine over `data_dir`, running startup recovery like a fresh process.
pub fn open_machine(
    data_dir: &Path,
    backend: StoreBackend,
    hooks: TransitionHooks,
) -> FcvStateMachine {
    open_machine_with(data_dir, backend, hooks, MachineConfig::default())
}

pub fn open_machine_with(
    data_dir: &Path,
    backend: StoreBackend,
    hooks: TransitionHooks,
    machine: MachineConfig,
) -> FcvStateMachine {
    let config = FcvConfig {
        data_dir: data_dir.to_path_buf(),
        store: backend,
        machine,
    };
    let store = config.open_store().expect("open fcv store");
    FcvStateMachine::open(store, hooks, config.machine).expect("open fcv state machine")
}

/// Path to the compiled `fcv-node` binary.
pub fn fcv_node_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fcv-node"))
}
