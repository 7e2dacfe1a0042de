mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Principal and repository persistence is owned by the surrounding service;
/// the permission operations back [`crate::acl::PermissionCache`].
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Principal operations
    /// Inserts a new principal and returns it with its assigned id.
    fn create_principal(&self, principal: &Principal) -> Result<Principal>;
    fn find_principal(&self, id: i64) -> Result<Option<Principal>>;
    fn find_principal_by_login(&self, login: &str) -> Result<Option<Principal>>;
    fn find_principal_by_token_digest(&self, digest: &str) -> Result<Option<Principal>>;
    /// Persists account fields; the sync flag and cursor are left untouched.
    fn update_principal(&self, principal: &Principal) -> Result<()>;
    /// Sets the `syncing` flag and, when given, advances the `synced` cursor.
    fn update_principal_sync(
        &self,
        id: i64,
        syncing: bool,
        synced: Option<DateTime<Utc>>,
    ) -> Result<()>;
    fn has_admin_principal(&self) -> Result<bool>;

    // Repository operations
    /// Inserts a repository together with its owner's grant, atomically.
    fn create_repository(
        &self,
        repo: &Repository,
        owner_grant: &PermissionRecord,
    ) -> Result<Repository>;
    fn find_repository_by_uid(&self, uid: &str) -> Result<Option<Repository>>;
    fn find_repository_by_name(&self, namespace: &str, name: &str) -> Result<Option<Repository>>;
    fn update_repository(&self, repo: &Repository) -> Result<()>;
    /// Deletes a repository; its permission records are removed with it.
    fn delete_repository(&self, id: i64) -> Result<bool>;

    // Permission operations
    fn find_permission(&self, user_id: i64, repo_uid: &str) -> Result<Option<PermissionRecord>>;
    fn upsert_permission(&self, record: &PermissionRecord) -> Result<()>;
    /// Writes a synchronized record unless the stored one is pinned or carries
    /// a newer sync time. Returns whether the row was written.
    fn upsert_synced_permission(&self, record: &PermissionRecord) -> Result<bool>;
    fn delete_permission(&self, user_id: i64, repo_uid: &str) -> Result<bool>;
    /// Deletes the record only while it is not pinned.
    fn delete_unpinned_permission(&self, user_id: i64, repo_uid: &str) -> Result<bool>;
    fn list_repo_permissions(&self, repo_uid: &str) -> Result<Vec<PermissionRecord>>;
    fn list_user_permissions(&self, user_id: i64) -> Result<Vec<PermissionRecord>>;
}
