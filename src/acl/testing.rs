//! Fixtures shared by the acl unit tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use super::{AccessResolver, PermissionCache, PermissionSynchronizer};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::remote::{RemoteAccount, RemoteAuthority, RemoteGrant};
use crate::store::{SqliteStore, Store};
use crate::types::*;

pub struct TestEnv {
    _temp: TempDir,
    pub store: Arc<dyn Store>,
    pub cache: PermissionCache,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        let store: Arc<dyn Store> = Arc::new(store);
        Self {
            _temp: temp,
            cache: PermissionCache::new(store.clone()),
            store,
        }
    }

    pub fn principal(&self, principal: Principal) -> Principal {
        self.store.create_principal(&principal).unwrap()
    }

    /// Creates the repository along with its owner's pinned admin grant.
    pub fn repository(&self, repo: Repository) -> Repository {
        let grant = PermissionRecord::owner(&repo.uid, repo.user_id);
        self.store.create_repository(&repo, &grant).unwrap()
    }

    pub fn synchronizer(
        &self,
        remote: Arc<FakeAuthority>,
        config: SyncConfig,
    ) -> PermissionSynchronizer {
        PermissionSynchronizer::new(self.store.clone(), remote, config)
    }

    pub fn resolver(&self, sync: PermissionSynchronizer) -> AccessResolver {
        AccessResolver::new(self.cache.clone(), sync)
    }
}

pub fn repository(uid: &str, namespace: &str, name: &str, owner: i64) -> Repository {
    let now = Utc::now();
    Repository {
        id: 0,
        uid: uid.to_string(),
        user_id: owner,
        namespace: namespace.to_string(),
        name: name.to_string(),
        visibility: Visibility::Private,
        branch: DEFAULT_BRANCH.to_string(),
        config: DEFAULT_CONFIG_PATH.to_string(),
        timeout: DEFAULT_TIMEOUT_MINUTES,
        created_at: now,
        updated_at: now,
    }
}

pub fn grant(repo_uid: &str, read: bool, write: bool, admin: bool) -> RemoteGrant {
    RemoteGrant {
        repo_uid: repo_uid.to_string(),
        read,
        write,
        admin,
    }
}

/// Remote authority answering from a fixed grant list, counting calls.
pub struct FakeAuthority {
    grants: Vec<RemoteGrant>,
    fail: bool,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl FakeAuthority {
    pub fn new(grants: Vec<RemoteGrant>) -> Arc<Self> {
        Arc::new(Self {
            grants,
            fail: false,
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            grants: Vec::new(),
            fail: true,
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteAuthority for FakeAuthority {
    async fn find_account(&self, _access_token: &str) -> Result<RemoteAccount> {
        Err(Error::Remote("accounts are not served by this fake".to_string()))
    }

    async fn fetch_grants(&self, _principal: &Principal) -> Result<Vec<RemoteGrant>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(Error::Remote("remote unavailable".to_string()));
        }
        Ok(self.grants.clone())
    }
}
