//! Errors surfaced by FCV transitions and status queries.
//!
//! Every variant maps to a stable numeric code. External callers match on
//! these codes, so they must never be renumbered.

use thiserror::Error;

use crate::version::FcvVersion;

/// Stable code for storage that cannot be reached.
pub const CODE_STORAGE_UNAVAILABLE: u32 = 6;
/// Stable code for a requested version outside the catalog or move rules.
pub const CODE_INVALID_TARGET_VERSION: u32 = 2;
/// Stable code for a persisted document that fails decoding or invariants.
pub const CODE_CORRUPT_DOCUMENT: u32 = 50;
/// Stable code for lock contention or an incompatible in-flight transition.
pub const CODE_TRANSITION_IN_PROGRESS: u32 = 117;
/// Stable code for a mutating request sent to a non-primary node.
pub const CODE_NOT_PRIMARY: u32 = 10107;
/// Stable code for an upgrade attempted while a downgrade is cleaning metadata.
pub const CODE_ILLEGAL_WHILE_CLEANING_METADATA: u32 = 7_428_200;
/// Stable code for a failed downgrade cleanup action.
pub const CODE_CLEANUP_ACTION_FAILED: u32 = 7_428_201;
/// Stable code for a failed upgrade action.
pub const CODE_UPGRADE_ACTION_FAILED: u32 = 7_428_202;

/// Errors returned by the FCV manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FcvError {
    /// The durable document store could not be reached.
    #[error("fcv storage unavailable: {reason}")]
    StorageUnavailable { reason: String },

    /// The persisted document could not be decoded or violates its invariants.
    #[error("fcv document is corrupt: {reason}")]
    CorruptDocument { reason: String },

    /// Another transition holds the lock or is durably in flight.
    #[error("fcv transition already in progress: {in_flight}")]
    TransitionInProgress { in_flight: String },

    /// The requested version is unknown or not reachable from the current one.
    #[error("invalid fcv target {requested}: {reason}")]
    InvalidTargetVersion { requested: String, reason: String },

    /// Only the primary may originate transitions.
    #[error("fcv transitions may only be started on the primary")]
    NotPrimary,

    /// Upgrade requested while a downgrade to `to` is still cleaning metadata.
    #[error(
        "cannot move to {requested} while downgrade {from} -> {to} is cleaning server metadata; \
         retry the downgrade to {to} first"
    )]
    IllegalWhileCleaningMetadata {
        from: FcvVersion,
        to: FcvVersion,
        requested: FcvVersion,
    },

    /// A registered cleanup action failed; the downgrade stays in the cleaning phase.
    #[error("cleanup action {action_id} failed: {cause}")]
    CleanupActionFailed { action_id: String, cause: String },

    /// A registered upgrade action failed; the upgrade stays in flight.
    #[error("upgrade action {action_id} failed: {cause}")]
    UpgradeActionFailed { action_id: String, cause: String },
}

impl FcvError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::StorageUnavailable {
            reason: err.to_string(),
        }
    }

    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptDocument {
            reason: reason.into(),
        }
    }

    pub fn in_progress(in_flight: impl Into<String>) -> Self {
        Self::TransitionInProgress {
            in_flight: in_flight.into(),
        }
    }

    pub fn invalid_target(requested: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTargetVersion {
            requested: requested.into(),
            reason: reason.into(),
        }
    }

    /// Stable numeric code for this error.
    pub const fn code(&self) -> u32 {
        match self {
            Self::StorageUnavailable { .. } => CODE_STORAGE_UNAVAILABLE,
            Self::CorruptDocument { .. } => CODE_CORRUPT_DOCUMENT,
            Self::TransitionInProgress { .. } => CODE_TRANSITION_IN_PROGRESS,
            Self::InvalidTargetVersion { .. } => CODE_INVALID_TARGET_VERSION,
            Self::NotPrimary => CODE_NOT_PRIMARY,
            Self::IllegalWhileCleaningMetadata { .. } => CODE_ILLEGAL_WHILE_CLEANING_METADATA,
            Self::CleanupActionFailed { .. } => CODE_CLEANUP_ACTION_FAILED,
            Self::UpgradeActionFailed { .. } => CODE_UPGRADE_ACTION_FAILED,
        }
    }

    /// Whether resubmitting the same request later can succeed without
    /// operator intervention.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::StorageUnavailable { .. }
            | Self::TransitionInProgress { .. }
            | Self::NotPrimary
            | Self::CleanupActionFailed { .. }
            | Self::UpgradeActionFailed { .. } => true,
            Self::CorruptDocument { .. }
            | Self::InvalidTargetVersion { .. }
            | Self::IllegalWhileCleaningMetadata { .. } => false,
        }
    }
}
