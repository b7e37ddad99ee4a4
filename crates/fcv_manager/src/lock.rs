//! Process-wide guard that admits one FCV transition at a time.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, TryLockError};

use crate::error::FcvError;
use crate::version::FcvVersion;

/// Single-slot, non-queuing transition lock.
///
/// `holder` mirrors the target of whoever owns `gate`, so a contending
/// request can report what is in flight without waiting. Nothing here is
/// persisted; after a crash the durable document is the only record of a
/// pending transition.
#[derive(Default)]
pub struct TransitionLock {
    gate: Mutex<()>,
    holder: RwLock<Option<FcvVersion>>,
}

/// Held for the duration of one transition; releases on drop.
pub struct TransitionGuard<'a> {
    lock: &'a TransitionLock,
    target: FcvVersion,
    _gate: MutexGuard<'a, ()>,
}

impl TransitionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a transition to `target`, or fail immediately.
    pub fn try_acquire(&self, target: FcvVersion) -> Result<TransitionGuard<'_>, FcvError> {
        let gate = match self.gate.try_lock() {
            Ok(gate) => gate,
            // A panicking holder already released the gate by unwinding.
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                return Err(FcvError::in_progress(match self.holder() {
                    Some(version) => format!("transition to {version} holds the transition lock"),
                    None => "another transition holds the transition lock".to_string(),
                }))
            }
        };
        *self.holder.write().unwrap_or_else(PoisonError::into_inner) = Some(target);
        Ok(TransitionGuard {
            lock: self,
            target,
            _gate: gate,
        })
    }

    /// Target of the current holder, if any.
    pub fn holder(&self) -> Option<FcvVersion> {
        *self.holder.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransitionGuard<'_> {
    pub fn target(&self) -> FcvVersion {
        self.target
    }
}

impl Drop for TransitionGuard<'_> {
    // Runs before `_gate` is released, so no new holder can be overwritten.
    fn drop(&mut self) {
        *self.lock.holder.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
