use std::sync::Arc;

use crate::error::Result;
use crate::store::Store;
use crate::types::PermissionRecord;

/// Outcome of a synchronizer write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Written,
    /// The stored record is pinned or already carries a newer sync time.
    Kept,
}

/// Keyed view over the cached permission records.
///
/// Writes are serialized by the store; the conditional upsert used by
/// [`PermissionCache::upsert_synced`] is a single statement, so a pinned
/// record can never be replaced whatever order concurrent writers run in.
#[derive(Clone)]
pub struct PermissionCache {
    store: Arc<dyn Store>,
}

impl PermissionCache {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn lookup(&self, user_id: i64, repo_uid: &str) -> Result<Option<PermissionRecord>> {
        self.store.find_permission(user_id, repo_uid)
    }

    pub fn upsert(&self, record: &PermissionRecord) -> Result<()> {
        self.store.upsert_permission(record)
    }

    pub fn upsert_synced(&self, record: &PermissionRecord) -> Result<UpsertOutcome> {
        if self.store.upsert_synced_permission(record)? {
            Ok(UpsertOutcome::Written)
        } else {
            Ok(UpsertOutcome::Kept)
        }
    }

    pub fn delete(&self, user_id: i64, repo_uid: &str) -> Result<bool> {
        self.store.delete_permission(user_id, repo_uid)
    }

    /// Drops a synchronized record. Pinned records are left in place even if
    /// they were pinned after the caller last looked.
    pub fn revoke(&self, user_id: i64, repo_uid: &str) -> Result<bool> {
        self.store.delete_unpinned_permission(user_id, repo_uid)
    }

    pub fn list_by_repo(&self, repo_uid: &str) -> Result<Vec<PermissionRecord>> {
        self.store.list_repo_permissions(repo_uid)
    }

    pub fn list_by_user(&self, user_id: i64) -> Result<Vec<PermissionRecord>> {
        self.store.list_user_permissions(user_id)
    }
}
