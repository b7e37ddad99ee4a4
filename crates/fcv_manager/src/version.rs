//! Version generations and the catalog of generations this binary understands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FcvError;

/// One feature compatibility version generation, e.g. `7.1`.
///
/// Ordering is lexicographic on `(major, minor)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FcvVersion {
    pub major: u32,
    pub minor: u32,
}

impl FcvVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for FcvVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for FcvVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("expected <major>.<minor>, got {s:?}"))?;
        let major = major
            .parse::<u32>()
            .map_err(|err| format!("invalid major in {s:?}: {err}"))?;
        let minor = minor
            .parse::<u32>()
            .map_err(|err| format!("invalid minor in {s:?}: {err}"))?;
        Ok(Self { major, minor })
    }
}

// Persisted as the display string so documents stay readable.
impl Serialize for FcvVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FcvVersion {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Version generations known to this binary.
///
/// `last_continuous` may equal `last_lts` when no continuous release sits
/// between the LTS and latest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionCatalog {
    pub latest: FcvVersion,
    pub last_continuous: FcvVersion,
    pub last_lts: FcvVersion,
}

impl VersionCatalog {
    pub fn new(
        latest: FcvVersion,
        last_continuous: FcvVersion,
        last_lts: FcvVersion,
    ) -> anyhow::Result<Self> {
        if last_lts > last_continuous {
            anyhow::bail!("lastLTS {last_lts} is newer than lastContinuous {last_continuous}");
        }
        if last_continuous >= latest {
            anyhow::bail!("lastContinuous {last_continuous} is not older than latest {latest}");
        }
        Ok(Self {
            latest,
            last_continuous,
            last_lts,
        })
    }

    pub fn contains(&self, version: FcvVersion) -> bool {
        version == self.latest || version == self.last_continuous || version == self.last_lts
    }

    /// Resolve an alias (`latest`, `lastContinuous`, `lastLTS`) or a literal
    /// `major.minor` string into a catalog version.
    pub fn resolve(&self, raw: &str) -> Result<FcvVersion, FcvError> {
        let version = match raw.trim() {
            "latest" => self.latest,
            "lastContinuous" | "last-continuous" => self.last_continuous,
            "lastLTS" | "last-lts" => self.last_lts,
            literal => literal
                .parse::<FcvVersion>()
                .map_err(|reason| FcvError::invalid_target(raw, reason))?,
        };
        if !self.contains(version) {
            return Err(FcvError::invalid_target(
                raw,
                format!(
                    "not one of latest={}, lastContinuous={}, lastLTS={}",
                    self.latest, self.last_continuous, self.last_lts
                ),
            ));
        }
        Ok(version)
    }

    /// Check that a stable-to-stable move is one this binary supports.
    ///
    /// Every legal move has `latest` as one endpoint.
    pub fn check_move(&self, from: FcvVersion, to: FcvVersion) -> Result<(), FcvError> {
        if !self.contains(to) {
            return Err(FcvError::invalid_target(
                to.to_string(),
                "version is not known to this binary",
            ));
        }
        if from == to {
            return Ok(());
        }
        if from != self.latest && to != self.latest {
            return Err(FcvError::invalid_target(
                to.to_string(),
                format!("cannot move from {from} to {to} without passing through {}", self.latest),
            ));
        }
        Ok(())
    }
}

impl Default for VersionCatalog {
    fn default() -> Self {
        Self {
            latest: FcvVersion::new(7, 1),
            last_continuous: FcvVersion::new(7, 0),
            last_lts: FcvVersion::new(6, 0),
        }
    }
}
