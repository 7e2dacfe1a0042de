//! The external source of truth for accounts and repository permissions.

mod http;

pub use http::HttpAuthority;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Permission, Principal};

/// One repository grant as reported by the remote authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGrant {
    pub repo_uid: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub admin: bool,
}

impl RemoteGrant {
    #[must_use]
    pub fn permission(&self) -> Permission {
        Permission::from_flags(self.read, self.write, self.admin)
    }
}

/// The account behind a set of remote credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub login: String,
    #[serde(default)]
    pub email: String,
    /// Bot and service accounts.
    #[serde(default)]
    pub machine: bool,
}

#[async_trait]
pub trait RemoteAuthority: Send + Sync {
    /// Resolves the account that owns `access_token`.
    async fn find_account(&self, access_token: &str) -> Result<RemoteAccount>;

    /// Enumerates every repository grant the principal currently holds.
    async fn fetch_grants(&self, principal: &Principal) -> Result<Vec<RemoteGrant>>;
}
