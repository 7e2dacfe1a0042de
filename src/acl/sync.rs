use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use super::cache::{PermissionCache, UpsertOutcome};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::remote::RemoteAuthority;
use crate::store::Store;
use crate::types::{PermissionRecord, Principal};

/// What a single refresh changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Records inserted or rewritten.
    pub written: usize,
    /// Grants left alone because the stored record is pinned or newer.
    pub kept: usize,
    /// Grants naming a repository this control plane does not know.
    pub unknown: usize,
    /// Unpinned records dropped because the remote no longer reports them.
    pub revoked: usize,
}

type InFlightSet = Arc<Mutex<HashSet<i64>>>;

/// Releases a principal's single-flight slot when the refresh ends, even if
/// the task panics or is dropped on timeout.
struct InFlight {
    set: InFlightSet,
    principal_id: i64,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.principal_id);
    }
}

/// Refreshes cached permissions from the remote authority.
///
/// Refreshes run detached from the request that asked for them, each bounded
/// by [`SyncConfig::timeout`], and at most one runs per principal.
#[derive(Clone)]
pub struct PermissionSynchronizer {
    store: Arc<dyn Store>,
    cache: PermissionCache,
    remote: Arc<dyn RemoteAuthority>,
    config: SyncConfig,
    in_flight: InFlightSet,
    tasks: TaskTracker,
}

impl PermissionSynchronizer {
    pub fn new(store: Arc<dyn Store>, remote: Arc<dyn RemoteAuthority>, config: SyncConfig) -> Self {
        Self {
            cache: PermissionCache::new(store.clone()),
            store,
            remote,
            config,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            tasks: TaskTracker::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> SyncConfig {
        self.config
    }

    #[must_use]
    pub fn is_due(&self, principal: &Principal) -> bool {
        principal.sync_due(Utc::now(), self.config.period)
    }

    #[must_use]
    pub fn is_in_flight(&self, principal_id: i64) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&principal_id)
    }

    /// Schedules a background refresh when the principal's cursor is older
    /// than the sync period. Returns whether a refresh was launched.
    pub fn refresh_if_due(&self, principal: &Principal) -> bool {
        if !self.is_due(principal) {
            return false;
        }
        self.schedule(principal)
    }

    /// Launches a background refresh unless one is already running for this
    /// principal. Never blocks on the remote authority.
    pub fn schedule(&self, principal: &Principal) -> bool {
        let Some(slot) = self.acquire(principal.id) else {
            debug!(login = %principal.login, "synchronization already in flight");
            return false;
        };

        if let Err(e) = self.store.update_principal_sync(principal.id, true, None) {
            warn!(login = %principal.login, "cannot mark principal as syncing: {e}");
        }

        let this = self.clone();
        let principal = principal.clone();
        self.tasks.spawn(async move {
            let _slot = slot;
            match this.bounded(&principal).await {
                Ok(summary) => debug!(login = %principal.login, ?summary, "synchronization success"),
                Err(e) => warn!(login = %principal.login, "synchronization failed: {e}"),
            }
        });
        true
    }

    /// Runs one refresh in the foreground, still bounded by the timeout and
    /// the single-flight latch.
    pub async fn synchronize(&self, principal: &Principal) -> Result<SyncSummary> {
        let _slot = self.acquire(principal.id).ok_or(Error::SyncInProgress)?;
        self.store.update_principal_sync(principal.id, true, None)?;
        self.bounded(principal).await
    }

    /// Waits for every scheduled refresh to finish.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    fn acquire(&self, principal_id: i64) -> Option<InFlight> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(principal_id) {
            return None;
        }
        Some(InFlight {
            set: self.in_flight.clone(),
            principal_id,
        })
    }

    /// On failure the `synced` cursor is left where it was, so the next
    /// due check retries.
    async fn bounded(&self, principal: &Principal) -> Result<SyncSummary> {
        debug!(login = %principal.login, "begin synchronization");

        let result = match tokio::time::timeout(self.config.timeout, self.refresh(principal)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::SyncTimeout(self.config.timeout)),
        };

        if result.is_err() {
            if let Err(e) = self.store.update_principal_sync(principal.id, false, None) {
                warn!(login = %principal.login, "cannot clear syncing flag: {e}");
            }
        }
        result
    }

    async fn refresh(&self, principal: &Principal) -> Result<SyncSummary> {
        let grants = self.remote.fetch_grants(principal).await?;

        let now = Utc::now();
        let mut summary = SyncSummary::default();
        let mut reported = HashSet::new();

        for grant in grants {
            if self.store.find_repository_by_uid(&grant.repo_uid)?.is_none() {
                summary.unknown += 1;
                continue;
            }

            let record =
                PermissionRecord::synced(&grant.repo_uid, principal.id, grant.permission(), now);
            match self.cache.upsert_synced(&record)? {
                UpsertOutcome::Written => summary.written += 1,
                UpsertOutcome::Kept => summary.kept += 1,
            }
            reported.insert(grant.repo_uid);
        }

        for record in self.cache.list_by_user(principal.id)? {
            if record.is_pinned() || reported.contains(&record.repo_uid) {
                continue;
            }
            if self.cache.revoke(principal.id, &record.repo_uid)? {
                summary.revoked += 1;
            }
        }

        self.store.update_principal_sync(principal.id, false, Some(now))?;
        Ok(summary)
    }
}
