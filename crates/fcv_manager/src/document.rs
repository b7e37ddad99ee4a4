//! The persisted FCV document and the named states it encodes.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::FcvError;
use crate::version::FcvVersion;

/// Fixed identifier of the single FCV document.
pub const FCV_DOCUMENT_ID: &str = "featureCompatibilityVersion";

/// The single persisted FCV document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FcvDocument {
    pub current_version: FcvVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<FcvVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<FcvVersion>,
    #[serde(default)]
    pub is_cleaning_server_metadata: bool,
    /// Wall-clock time of the write that produced this snapshot.
    #[serde(default)]
    pub updated_unix_ms: u64,
}

/// Named state encoded by an [`FcvDocument`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FcvState {
    Stable(FcvVersion),
    Upgrading { from: FcvVersion, to: FcvVersion },
    Downgrading { from: FcvVersion, to: FcvVersion },
    CleaningMetadata { from: FcvVersion, to: FcvVersion },
}

impl FcvState {
    /// Encode this state as a fresh document stamped with the current time.
    pub fn to_document(self) -> FcvDocument {
        let (current_version, target_version, previous_version, cleaning) = match self {
            FcvState::Stable(v) => (v, None, None, false),
            FcvState::Upgrading { from, to } => (from, Some(to), None, false),
            FcvState::Downgrading { from, to } => (from, Some(to), Some(from), false),
            FcvState::CleaningMetadata { from, to } => (from, Some(to), Some(from), true),
        };
        FcvDocument {
            current_version,
            target_version,
            previous_version,
            is_cleaning_server_metadata: cleaning,
            updated_unix_ms: unix_time_ms(),
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, FcvState::Stable(_))
    }

    /// Short phase label used in logs.
    pub fn phase(&self) -> &'static str {
        match self {
            FcvState::Stable(_) => "stable",
            FcvState::Upgrading { .. } => "upgrading",
            FcvState::Downgrading { .. } => "downgrading",
            FcvState::CleaningMetadata { .. } => "cleaning_metadata",
        }
    }
}

impl fmt::Display for FcvState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FcvState::Stable(v) => write!(f, "stable({v})"),
            FcvState::Upgrading { from, to } => write!(f, "upgrading({from} -> {to})"),
            FcvState::Downgrading { from, to } => write!(f, "downgrading({from} -> {to})"),
            FcvState::CleaningMetadata { from, to } => {
                write!(f, "cleaning_metadata({from} -> {to})")
            }
        }
    }
}

impl FcvDocument {
    pub fn stable(version: FcvVersion) -> Self {
        FcvState::Stable(version).to_document()
    }

    /// Decode the named state, rejecting any field combination that no state
    /// of the machine could have written.
    pub fn state(&self) -> Result<FcvState, FcvError> {
        let current = self.current_version;
        match (
            self.target_version,
            self.previous_version,
            self.is_cleaning_server_metadata,
        ) {
            (None, None, false) => Ok(FcvState::Stable(current)),
            (None, _, _) => Err(FcvError::corrupt(format!(
                "no targetVersion but previousVersion={:?} isCleaningServerMetadata={}",
                self.previous_version, self.is_cleaning_server_metadata
            ))),
            (Some(to), _, _) if to == current => Err(FcvError::corrupt(format!(
                "targetVersion equals currentVersion {current}"
            ))),
            (Some(to), None, false) if to > current => {
                Ok(FcvState::Upgrading { from: current, to })
            }
            (Some(to), Some(prev), cleaning) if to < current && prev == current => {
                if cleaning {
                    Ok(FcvState::CleaningMetadata { from: current, to })
                } else {
                    Ok(FcvState::Downgrading { from: current, to })
                }
            }
            (Some(to), prev, cleaning) => Err(FcvError::corrupt(format!(
                "inconsistent transition fields: current={current} target={to} previous={prev:?} \
                 isCleaningServerMetadata={cleaning}"
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), FcvError> {
        self.state().map(|_| ())
    }
}

pub(crate) fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64)
        .unwrap_or(0)
}
