//! FCV transition state machine.
//!
//! Each request is validated against the persisted document, then driven
//! one phase at a time. Every phase is committed to the store before the
//! work it guards runs, so a crash at any point leaves a document recovery
//! can interpret:
//!
//! ```text
//! Stable(V0) -> Downgrading(V0,V1) -> CleaningMetadata(V0,V1) -> Stable(V1)
//! Stable(V1) -> Upgrading(V1,V0) -> Stable(V0)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::cleanup::{ActionContext, ActionFailure, CleanupActionRegistry};
use crate::document::{FcvDocument, FcvState};
use crate::error::FcvError;
use crate::lock::TransitionLock;
use crate::recovery::{RecoveryBootstrap, RecoveryReport};
use crate::store::VersionDocumentStore;
use crate::version::{FcvVersion, VersionCatalog};

/// Replication role of the local node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum NodeRole {
    Primary,
    Secondary,
}

/// Settings that shape the state machine independently of storage.
#[derive(Clone, Copy, Debug)]
pub struct MachineConfig {
    pub catalog: VersionCatalog,
    /// Version written when no document exists yet.
    pub initial_version: FcvVersion,
    pub role: NodeRole,
}

impl Default for MachineConfig {
    fn default() -> Self {
        let catalog = VersionCatalog::default();
        Self {
            catalog,
            initial_version: catalog.latest,
            role: NodeRole::Primary,
        }
    }
}

/// Externally supplied actions run during transitions.
#[derive(Clone, Default)]
pub struct TransitionHooks {
    /// Run while a downgrade is in the cleaning phase.
    pub cleanup: CleanupActionRegistry,
    /// Run while an upgrade is in flight.
    pub upgrade: CleanupActionRegistry,
}

/// Result of validating a request against the persisted state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Already stable at the requested version.
    NoOp,
    /// Drive the document from its current phase to `Stable(to)`.
    Drive { from: FcvVersion, to: FcvVersion },
}

/// Decide whether `requested` may proceed from `state`.
///
/// Pure: performs no I/O and is evaluated before any write.
pub fn plan_transition(
    catalog: &VersionCatalog,
    state: FcvState,
    requested: FcvVersion,
) -> Result<TransitionPlan, FcvError> {
    match state {
        FcvState::Stable(current) if current == requested => Ok(TransitionPlan::NoOp),
        FcvState::Stable(current) => {
            catalog.check_move(current, requested)?;
            Ok(TransitionPlan::Drive {
                from: current,
                to: requested,
            })
        }
        FcvState::CleaningMetadata { from, to } if requested == to => {
            Ok(TransitionPlan::Drive { from, to })
        }
        // Metadata already removed for `to` cannot be restored implicitly.
        FcvState::CleaningMetadata { from, to } if requested > to => {
            Err(FcvError::IllegalWhileCleaningMetadata { from, to, requested })
        }
        FcvState::CleaningMetadata { from, to } => Err(FcvError::in_progress(format!(
            "downgrade {from} -> {to} is cleaning server metadata; requested {requested}"
        ))),
        FcvState::Upgrading { from, to } | FcvState::Downgrading { from, to }
            if requested == to =>
        {
            Ok(TransitionPlan::Drive { from, to })
        }
        FcvState::Upgrading { .. } | FcvState::Downgrading { .. } => Err(FcvError::in_progress(
            format!("{state} is in progress; requested {requested}"),
        )),
    }
}

/// The per-process FCV manager.
///
/// Construct once at startup with [`FcvStateMachine::open`] and share by
/// reference or `Arc`.
pub struct FcvStateMachine {
    catalog: VersionCatalog,
    store: Arc<dyn VersionDocumentStore>,
    hooks: TransitionHooks,
    lock: TransitionLock,
    /// Last durably committed document, served to status readers.
    committed: RwLock<FcvDocument>,
    primary: AtomicBool,
    initial_version: FcvVersion,
    /// `(from, to, attempt)` of the transition most recently driven.
    attempts: Mutex<Option<(FcvVersion, FcvVersion, u32)>>,
    last_recovery: RwLock<RecoveryReport>,
}

impl FcvStateMachine {
    /// Run recovery against `store` and build the machine around the result.
    pub fn open(
        store: Arc<dyn VersionDocumentStore>,
        hooks: TransitionHooks,
        config: MachineConfig,
    ) -> Result<Self, FcvError> {
        let report =
            RecoveryBootstrap::new(&config.catalog, config.initial_version).run(store.as_ref())?;
        tracing::info!(
            store = %store.describe(),
            role = ?config.role,
            cleanup_actions = hooks.cleanup.len(),
            upgrade_actions = hooks.upgrade.len(),
            "feature compatibility version manager ready"
        );
        Ok(Self {
            catalog: config.catalog,
            store,
            hooks,
            lock: TransitionLock::new(),
            committed: RwLock::new(report.document.clone()),
            primary: AtomicBool::new(config.role == NodeRole::Primary),
            initial_version: config.initial_version,
            attempts: Mutex::new(None),
            last_recovery: RwLock::new(report),
        })
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    pub fn role(&self) -> NodeRole {
        if self.primary.load(Ordering::Acquire) {
            NodeRole::Primary
        } else {
            NodeRole::Secondary
        }
    }

    /// Last durably committed document. Never waits on a running transition.
    pub fn status(&self) -> FcvDocument {
        self.committed
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Named state of [`status`](Self::status).
    pub fn state(&self) -> Result<FcvState, FcvError> {
        self.status().state()
    }

    pub fn last_recovery(&self) -> RecoveryReport {
        self.last_recovery
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Resolve `raw` through the catalog and request a transition to it.
    pub fn request_transition_str(&self, raw: &str) -> Result<(), FcvError> {
        let target = self.catalog.resolve(raw)?;
        self.request_transition(target)
    }

    /// Move the cluster's FCV to `target`.
    ///
    /// Fails fast with `TransitionInProgress` if another request is running.
    pub fn request_transition(&self, target: FcvVersion) -> Result<(), FcvError> {
        let _guard = self.lock.try_acquire(target)?;
        // Role changes take the same lock, so the role cannot flip under us.
        if self.role() != NodeRole::Primary {
            return Err(FcvError::NotPrimary);
        }

        let doc = self.reload()?;
        let state = doc.state()?;
        match plan_transition(&self.catalog, state, target) {
            Ok(TransitionPlan::NoOp) => {
                tracing::debug!(version = %target, "feature compatibility version already set");
                Ok(())
            }
            Ok(TransitionPlan::Drive { from, to }) => {
                tracing::info!(
                    %from,
                    %to,
                    phase = state.phase(),
                    "starting feature compatibility version transition"
                );
                self.drive(state, to)
            }
            Err(err) => {
                tracing::warn!(
                    state = %state,
                    requested = %target,
                    code = err.code(),
                    error = %err,
                    "rejected feature compatibility version transition"
                );
                Err(err)
            }
        }
    }

    /// Step every phase from `state` until `Stable(target)` or an error.
    fn drive(&self, mut state: FcvState, target: FcvVersion) -> Result<(), FcvError> {
        loop {
            state = match state {
                FcvState::Stable(current) if current == target => {
                    self.clear_attempts();
                    tracing::info!(
                        version = %current,
                        "feature compatibility version transition complete"
                    );
                    return Ok(());
                }
                FcvState::Stable(current) if target < current => {
                    self.commit(FcvState::Downgrading {
                        from: current,
                        to: target,
                    })?
                }
                FcvState::Stable(current) => self.commit(FcvState::Upgrading {
                    from: current,
                    to: target,
                })?,
                // The flag must be durable before the first cleanup action runs.
                FcvState::Downgrading { from, to } => {
                    self.commit(FcvState::CleaningMetadata { from, to })?
                }
                FcvState::CleaningMetadata { from, to } => {
                    self.run_hooks(&self.hooks.cleanup, from, to).map_err(|failure| {
                        tracing::warn!(
                            %from,
                            %to,
                            action = %failure.action_id,
                            cause = %failure.cause,
                            "cleanup action failed; downgrade remains in cleaning phase"
                        );
                        FcvError::CleanupActionFailed {
                            action_id: failure.action_id,
                            cause: failure.cause,
                        }
                    })?;
                    self.commit(FcvState::Stable(to))?
                }
                FcvState::Upgrading { from, to } => {
                    self.run_hooks(&self.hooks.upgrade, from, to).map_err(|failure| {
                        tracing::warn!(
                            %from,
                            %to,
                            action = %failure.action_id,
                            cause = %failure.cause,
                            "upgrade action failed; upgrade remains in flight"
                        );
                        FcvError::UpgradeActionFailed {
                            action_id: failure.action_id,
                            cause: failure.cause,
                        }
                    })?;
                    self.commit(FcvState::Stable(to))?
                }
            };
        }
    }

    fn run_hooks(
        &self,
        registry: &CleanupActionRegistry,
        from: FcvVersion,
        to: FcvVersion,
    ) -> Result<(), ActionFailure> {
        let attempt = self.next_attempt(from, to);
        registry.run_all(&ActionContext { from, to, attempt })
    }

    fn next_attempt(&self, from: FcvVersion, to: FcvVersion) -> u32 {
        let mut attempts = self
            .attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let attempt = match *attempts {
            Some((f, t, n)) if f == from && t == to => n.saturating_add(1),
            _ => 1,
        };
        *attempts = Some((from, to, attempt));
        attempt
    }

    fn clear_attempts(&self) {
        *self
            .attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Persist `state`, then publish it to status readers.
    fn commit(&self, state: FcvState) -> Result<FcvState, FcvError> {
        let doc = state.to_document();
        self.store.write(&doc)?;
        self.publish(doc);
        tracing::info!(
            phase = state.phase(),
            state = %state,
            "committed feature compatibility version phase"
        );
        Ok(state)
    }

    /// Re-read the store, the source of truth, and refresh the status cache.
    fn reload(&self) -> Result<FcvDocument, FcvError> {
        let doc = self.store.read()?.ok_or_else(|| {
            FcvError::corrupt("feature compatibility version document disappeared from the store")
        })?;
        self.publish(doc.clone());
        Ok(doc)
    }

    fn publish(&self, doc: FcvDocument) {
        *self
            .committed
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = doc;
    }

    /// Install a document replicated from the primary.
    ///
    /// Only secondaries accept replicated documents.
    pub fn apply_replicated(&self, doc: &FcvDocument) -> Result<(), FcvError> {
        if self.role() == NodeRole::Primary {
            return Err(FcvError::in_progress(
                "primary originates feature compatibility version changes \
                 and ignores replicated ones",
            ));
        }
        let state = doc.state()?;
        RecoveryBootstrap::new(&self.catalog, self.initial_version).check_supported(doc)?;
        let _guard = self.lock.try_acquire(doc.current_version)?;
        self.store.write(doc)?;
        self.publish(doc.clone());
        tracing::debug!(
            state = %state,
            "applied replicated feature compatibility version document"
        );
        Ok(())
    }

    /// Become primary, re-running recovery against the local store.
    pub fn step_up(&self) -> Result<RecoveryReport, FcvError> {
        let _guard = self.lock.try_acquire(self.status().current_version)?;
        let report =
            RecoveryBootstrap::new(&self.catalog, self.initial_version).run(self.store.as_ref())?;
        self.publish(report.document.clone());
        *self
            .last_recovery
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = report.clone();
        self.clear_attempts();
        self.primary.store(true, Ordering::Release);
        tracing::info!(pending = ?report.pending, "stepped up to primary");
        Ok(report)
    }

    /// Stop originating transitions. Waits for nothing; an in-flight
    /// transition holds the lock and step-down fails fast instead.
    pub fn step_down(&self) -> Result<(), FcvError> {
        let _guard = self.lock.try_acquire(self.status().current_version)?;
        self.primary.store(false, Ordering::Release);
        tracing::info!("stepped down to secondary");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::FnAction;
    use crate::store::MemoryDocumentStore;
    use proptest::prelude::*;
    use std::sync::atomic::AtomicU32;

    fn catalog() -> VersionCatalog {
        VersionCatalog::default()
    }

    fn machine_with(store: Arc<MemoryDocumentStore>, hooks: TransitionHooks) -> FcvStateMachine {
        FcvStateMachine::open(store, hooks, MachineConfig::default()).unwrap()
    }

    /// Cleanup registry whose single action fails while `fail` is set.
    fn toggled_cleanup(fail: Arc<AtomicBool>, runs: Arc<AtomicU32>) -> TransitionHooks {
        let cleanup = CleanupActionRegistry::new()
            .with(Arc::new(FnAction::new("remove_new_format_metadata", move |_: &ActionContext| {
                runs.fetch_add(1, Ordering::SeqCst);
                if fail.load(Ordering::SeqCst) {
                    anyhow::bail!("injected cleanup failure");
                }
                Ok(())
            })))
            .unwrap();
        TransitionHooks {
            cleanup,
            upgrade: CleanupActionRegistry::new(),
        }
    }

    #[test]
    fn same_version_is_noop_without_write() {
        let store = Arc::new(MemoryDocumentStore::new());
        let machine = machine_with(store.clone(), TransitionHooks::default());
        let before = store.read().unwrap().unwrap();
        machine.request_transition(catalog().latest).unwrap();
        assert_eq!(store.read().unwrap().unwrap(), before);
    }

    #[test]
    fn downgrade_then_upgrade_leaves_no_flags() {
        let store = Arc::new(MemoryDocumentStore::new());
        let machine = machine_with(store, TransitionHooks::default());
        let c = catalog();

        machine.request_transition(c.last_lts).unwrap();
        assert_eq!(machine.state().unwrap(), FcvState::Stable(c.last_lts));

        machine.request_transition(c.latest).unwrap();
        let doc = machine.status();
        assert_eq!(doc.current_version, c.latest);
        assert_eq!(doc.target_version, None);
        assert_eq!(doc.previous_version, None);
        assert!(!doc.is_cleaning_server_metadata);
    }

    #[test]
    fn cleanup_failure_keeps_cleaning_flag_and_blocks_upgrade() {
        let fail = Arc::new(AtomicBool::new(true));
        let runs = Arc::new(AtomicU32::new(0));
        let store = Arc::new(MemoryDocumentStore::new());
        let machine = machine_with(store.clone(), toggled_cleanup(fail.clone(), runs.clone()));
        let c = catalog();

        let err = machine.request_transition(c.last_lts).unwrap_err();
        assert!(matches!(
            err,
            FcvError::CleanupActionFailed { ref action_id, .. }
                if action_id == "remove_new_format_metadata"
        ));
        let doc = store.read().unwrap().unwrap();
        assert!(doc.is_cleaning_server_metadata);
        assert_eq!(doc.target_version, Some(c.last_lts));
        assert_eq!(doc.previous_version, Some(c.latest));
        assert_eq!(machine.status(), doc);

        for _ in 0..3 {
            let err = machine.request_transition(c.latest).unwrap_err();
            assert_eq!(err.code(), 7_428_200);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        fail.store(false, Ordering::SeqCst);
        machine.request_transition(c.last_lts).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(machine.state().unwrap(), FcvState::Stable(c.last_lts));
    }

    #[test]
    fn attempts_count_retries_of_the_same_downgrade() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let cleanup = CleanupActionRegistry::new()
            .with(Arc::new(FnAction::new("record", move |ctx: &ActionContext| {
                recorded.lock().unwrap().push(ctx.attempt);
                if ctx.attempt < 3 {
                    anyhow::bail!("not yet");
                }
                Ok(())
            })))
            .unwrap();
        let machine = machine_with(
            Arc::new(MemoryDocumentStore::new()),
            TransitionHooks {
                cleanup,
                upgrade: CleanupActionRegistry::new(),
            },
        );
        let c = catalog();
        assert!(machine.request_transition(c.last_lts).is_err());
        assert!(machine.request_transition(c.last_lts).is_err());
        machine.request_transition(c.last_lts).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn upgrade_action_failure_leaves_upgrade_in_flight() {
        let c = catalog();
        let store = Arc::new(MemoryDocumentStore::with_document(FcvDocument::stable(
            c.last_continuous,
        )));
        let fail = Arc::new(AtomicBool::new(true));
        let flag = fail.clone();
        let upgrade = CleanupActionRegistry::new()
            .with(Arc::new(FnAction::new("create_new_indexes", move |_: &ActionContext| {
                if flag.load(Ordering::SeqCst) {
                    anyhow::bail!("disk full");
                }
                Ok(())
            })))
            .unwrap();
        let machine = machine_with(
            store.clone(),
            TransitionHooks {
                cleanup: CleanupActionRegistry::new(),
                upgrade,
            },
        );

        let err = machine.request_transition(c.latest).unwrap_err();
        assert!(matches!(err, FcvError::UpgradeActionFailed { .. }));
        assert_eq!(
            machine.state().unwrap(),
            FcvState::Upgrading {
                from: c.last_continuous,
                to: c.latest
            }
        );

        let err = machine.request_transition(c.last_lts).unwrap_err();
        assert!(matches!(err, FcvError::TransitionInProgress { .. }));

        fail.store(false, Ordering::SeqCst);
        machine.request_transition(c.latest).unwrap();
        assert_eq!(machine.state().unwrap(), FcvState::Stable(c.latest));
    }

    #[test]
    fn interrupted_downgrade_resumes_into_cleaning() {
        let c = catalog();
        let store = Arc::new(MemoryDocumentStore::with_document(
            FcvState::Downgrading {
                from: c.latest,
                to: c.last_continuous,
            }
            .to_document(),
        ));
        let machine = machine_with(store, TransitionHooks::default());
        assert!(matches!(
            machine.request_transition(c.latest),
            Err(FcvError::TransitionInProgress { .. })
        ));
        machine.request_transition(c.last_continuous).unwrap();
        assert_eq!(machine.state().unwrap(), FcvState::Stable(c.last_continuous));
    }

    #[test]
    fn secondary_rejects_transitions_until_step_up() {
        let c = catalog();
        let store = Arc::new(MemoryDocumentStore::new());
        let machine = FcvStateMachine::open(
            store,
            TransitionHooks::default(),
            MachineConfig {
                role: NodeRole::Secondary,
                ..MachineConfig::default()
            },
        )
        .unwrap();
        assert_eq!(
            machine.request_transition(c.last_lts),
            Err(FcvError::NotPrimary)
        );

        let replicated = FcvState::CleaningMetadata {
            from: c.latest,
            to: c.last_lts,
        }
        .to_document();
        machine.apply_replicated(&replicated).unwrap();
        assert!(machine.status().is_cleaning_server_metadata);

        let report = machine.step_up().unwrap();
        assert!(matches!(
            report.pending,
            Some(FcvState::CleaningMetadata { .. })
        ));
        let err = machine.request_transition(c.latest).unwrap_err();
        assert!(matches!(err, FcvError::IllegalWhileCleaningMetadata { .. }));
        assert!(machine.apply_replicated(&replicated).is_err());

        machine.step_down().unwrap();
        assert_eq!(machine.role(), NodeRole::Secondary);
    }

    #[test]
    fn stepped_down_node_refuses_transitions() {
        let c = catalog();
        let store = Arc::new(MemoryDocumentStore::new());
        let machine = machine_with(store.clone(), TransitionHooks::default());
        machine.step_down().unwrap();

        assert_eq!(
            machine.request_transition(c.last_lts),
            Err(FcvError::NotPrimary)
        );
        assert_eq!(
            store.read().unwrap().unwrap().state().unwrap(),
            FcvState::Stable(c.latest)
        );
        assert_eq!(machine.lock.holder(), None);
    }

    #[test]
    fn replicated_document_outside_catalog_is_rejected() {
        let store = Arc::new(MemoryDocumentStore::new());
        let machine = FcvStateMachine::open(
            store.clone(),
            TransitionHooks::default(),
            MachineConfig {
                role: NodeRole::Secondary,
                ..MachineConfig::default()
            },
        )
        .unwrap();
        let before = machine.status();

        let err = machine
            .apply_replicated(&FcvDocument::stable(FcvVersion::new(8, 0)))
            .unwrap_err();
        assert!(matches!(err, FcvError::InvalidTargetVersion { .. }), "{err:?}");
        assert_eq!(store.read().unwrap().unwrap(), before);
        assert_eq!(machine.status(), before);
    }

    /// Store whose writes fail once `fail_from` writes have succeeded.
    struct FlakyStore {
        inner: MemoryDocumentStore,
        writes: AtomicU32,
        fail_from: AtomicU32,
    }

    impl FlakyStore {
        fn failing_after(writes: u32) -> Self {
            Self {
                inner: MemoryDocumentStore::new(),
                writes: AtomicU32::new(0),
                fail_from: AtomicU32::new(writes),
            }
        }

        fn heal(&self) {
            self.fail_from.store(u32::MAX, Ordering::SeqCst);
        }
    }

    impl VersionDocumentStore for FlakyStore {
        fn read(&self) -> Result<Option<FcvDocument>, FcvError> {
            self.inner.read()
        }

        fn write(&self, doc: &FcvDocument) -> Result<(), FcvError> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_from.load(Ordering::SeqCst) {
                return Err(FcvError::storage("injected write failure"));
            }
            self.inner.write(doc)
        }

        fn describe(&self) -> String {
            "flaky".to_string()
        }
    }

    #[test]
    fn storage_failure_mid_downgrade_leaves_recoverable_document() {
        let c = catalog();
        // Write 0 creates the initial document, write 1 commits Downgrading,
        // write 2 (CleaningMetadata) fails.
        let store = Arc::new(FlakyStore::failing_after(2));
        let runs = Arc::new(AtomicU32::new(0));
        let machine = FcvStateMachine::open(
            store.clone(),
            toggled_cleanup(Arc::new(AtomicBool::new(false)), runs.clone()),
            MachineConfig::default(),
        )
        .unwrap();

        let err = machine.request_transition(c.last_lts).unwrap_err();
        assert!(matches!(err, FcvError::StorageUnavailable { .. }), "{err:?}");
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let stored = store.read().unwrap().unwrap();
        assert_eq!(
            stored.state().unwrap(),
            FcvState::Downgrading {
                from: c.latest,
                to: c.last_lts
            }
        );
        assert!(!stored.is_cleaning_server_metadata);
        assert_eq!(machine.status(), stored);

        store.heal();
        assert!(matches!(
            machine.request_transition(c.latest),
            Err(FcvError::TransitionInProgress { .. })
        ));
        machine.request_transition(c.last_lts).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(machine.state().unwrap(), FcvState::Stable(c.last_lts));
    }

    #[test]
    fn cleaning_rejects_other_downgrade_targets_as_in_progress() {
        let c = catalog();
        let state = FcvState::CleaningMetadata {
            from: c.latest,
            to: c.last_continuous,
        };
        assert!(matches!(
            plan_transition(&c, state, c.last_lts),
            Err(FcvError::TransitionInProgress { .. })
        ));
    }

    fn arb_version() -> impl Strategy<Value = FcvVersion> {
        let c = VersionCatalog::default();
        prop_oneof![Just(c.latest), Just(c.last_continuous), Just(c.last_lts)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Any request newer than the cleaning target is refused with the stable code.
        #[test]
        fn prop_cleaning_refuses_every_newer_target(requested in arb_version()) {
            let c = VersionCatalog::default();
            let state = FcvState::CleaningMetadata { from: c.latest, to: c.last_lts };
            let result = plan_transition(&c, state, requested);
            if requested > c.last_lts {
                prop_assert_eq!(result.unwrap_err().code(), 7_428_200);
            } else {
                let resume = TransitionPlan::Drive { from: c.latest, to: c.last_lts };
                prop_assert_eq!(result, Ok(resume));
            }
        }

        /// Planning from a stable state never yields a cleaning rejection.
        #[test]
        fn prop_stable_never_reports_cleaning(
            current in arb_version(),
            requested in arb_version(),
        ) {
            let c = VersionCatalog::default();
            let result = plan_transition(&c, FcvState::Stable(current), requested);
            if let Err(err) = result {
                let invalid = matches!(err, FcvError::InvalidTargetVersion { .. });
                prop_assert!(invalid, "unexpected {:?}", err);
            }
        }
    }
}
