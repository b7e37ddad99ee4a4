//! Startup recovery for the FCV document.
//!
//! Recovery never advances an interrupted transition. A document left in
//! the cleaning phase stays there until an operator repeats the downgrade.

use crate::document::{FcvDocument, FcvState};
use crate::error::FcvError;
use crate::store::VersionDocumentStore;
use crate::version::{FcvVersion, VersionCatalog};

/// What recovery found in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveryReport {
    pub document: FcvDocument,
    /// True when no document existed and the initial one was written.
    pub created: bool,
    /// The interrupted transition, if the document is not stable.
    pub pending: Option<FcvState>,
}

pub struct RecoveryBootstrap<'a> {
    catalog: &'a VersionCatalog,
    initial_version: FcvVersion,
}

impl<'a> RecoveryBootstrap<'a> {
    pub fn new(catalog: &'a VersionCatalog, initial_version: FcvVersion) -> Self {
        Self {
            catalog,
            initial_version,
        }
    }

    pub fn run(&self, store: &dyn VersionDocumentStore) -> Result<RecoveryReport, FcvError> {
        let Some(document) = store.read()? else {
            if !self.catalog.contains(self.initial_version) {
                return Err(FcvError::invalid_target(
                    self.initial_version.to_string(),
                    "initial version is not known to this binary",
                ));
            }
            let document = FcvDocument::stable(self.initial_version);
            store.write(&document)?;
            tracing::info!(
                version = %self.initial_version,
                store = %store.describe(),
                "initialized feature compatibility version document"
            );
            return Ok(RecoveryReport {
                document,
                created: true,
                pending: None,
            });
        };

        let state = document.state()?;
        self.check_supported(&document)?;

        let pending = match state {
            FcvState::Stable(version) => {
                tracing::info!(%version, "recovered stable feature compatibility version");
                None
            }
            FcvState::CleaningMetadata { from, to } => {
                tracing::warn!(
                    %from,
                    %to,
                    "downgrade interrupted while cleaning server metadata; \
                     upgrades are refused until the downgrade is retried to completion"
                );
                Some(state)
            }
            FcvState::Upgrading { from, to } | FcvState::Downgrading { from, to } => {
                tracing::warn!(
                    %from,
                    %to,
                    phase = state.phase(),
                    "feature compatibility version transition left in flight"
                );
                Some(state)
            }
        };

        Ok(RecoveryReport {
            document,
            created: false,
            pending,
        })
    }

    /// Refuse documents naming versions this binary cannot interpret.
    pub(crate) fn check_supported(&self, document: &FcvDocument) -> Result<(), FcvError> {
        let persisted = [Some(document.current_version), document.target_version];
        for version in persisted.into_iter().flatten() {
            if !self.catalog.contains(version) {
                return Err(FcvError::invalid_target(
                    version.to_string(),
                    format!(
                        "persisted feature compatibility version is not supported by this binary \
                         (latest={}, lastLTS={})",
                        self.catalog.latest, self.catalog.last_lts
                    ),
                ));
            }
        }
        Ok(())
    }
}
