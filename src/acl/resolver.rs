use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use super::cache::PermissionCache;
use super::sync::PermissionSynchronizer;
use crate::error::Result;
use crate::types::{Capability, Principal, Repository};

/// The outcome of an access check. A denial is a value, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Grant,
    Deny,
}

impl Decision {
    #[must_use]
    pub fn is_granted(self) -> bool {
        self == Decision::Grant
    }
}

impl From<bool> for Decision {
    fn from(granted: bool) -> Self {
        if granted { Decision::Grant } else { Decision::Deny }
    }
}

/// Renders grant/deny decisions from the permission cache.
///
/// Stale records are still served; the refresh they trigger runs in the
/// background and only affects later requests.
#[derive(Clone)]
pub struct AccessResolver {
    cache: PermissionCache,
    sync: PermissionSynchronizer,
}

impl AccessResolver {
    pub fn new(cache: PermissionCache, sync: PermissionSynchronizer) -> Self {
        Self { cache, sync }
    }

    #[must_use]
    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    #[must_use]
    pub fn synchronizer(&self) -> &PermissionSynchronizer {
        &self.sync
    }

    /// Decides whether `principal` may exercise `capability` on `repo`.
    ///
    /// Global administrators are always granted. Otherwise an explicit record
    /// decides, and without one only reads of public repositories pass. An
    /// explicit record that withholds read access overrides the public default.
    pub fn resolve(
        &self,
        principal: &Principal,
        repo: &Repository,
        capability: Capability,
    ) -> Result<Decision> {
        if principal.admin {
            return Ok(Decision::Grant);
        }
        if !principal.active {
            return Ok(Decision::Deny);
        }

        let record = self.cache.lookup(principal.id, &repo.uid)?;

        let now = Utc::now();
        let period = self.sync.config().period;
        let stale = record.as_ref().is_some_and(|r| r.is_stale(now, period));
        if (stale || principal.sync_due(now, period)) && self.sync.schedule(principal) {
            debug!(login = %principal.login, repo = %repo.slug(), "scheduled permission refresh");
        }

        let granted = match &record {
            Some(record) => record.permission.allows(capability),
            None => capability == Capability::Read && repo.is_public(),
        };
        Ok(Decision::from(granted))
    }
}
