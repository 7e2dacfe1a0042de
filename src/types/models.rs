use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{Capability, Permission};

/// Converts a std duration into a chrono delta, saturating on overflow.
pub(crate) fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}

/// True when `at + period` is already in the past. A deadline beyond the
/// representable range never passes.
fn expired(at: DateTime<Utc>, now: DateTime<Utc>, period: Duration) -> bool {
    at.checked_add_signed(to_delta(period))
        .is_some_and(|deadline| deadline < now)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub admin: bool,
    pub machine: bool,
    pub active: bool,
    #[serde(skip)]
    pub token: String,
    #[serde(skip)]
    pub refresh: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    pub syncing: bool,
    /// Time of the last successful permission refresh.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub token_digest: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// A not-yet-persisted, active, non-admin account.
    #[must_use]
    pub fn new(login: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            login: login.into(),
            email: email.into(),
            admin: false,
            machine: false,
            active: true,
            token: String::new(),
            refresh: String::new(),
            expiry: None,
            syncing: false,
            synced: None,
            last_login: None,
            token_digest: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the last refresh is older than `period`, or never happened.
    #[must_use]
    pub fn sync_due(&self, now: DateTime<Utc>, period: Duration) -> bool {
        match self.synced {
            Some(synced) => expired(synced, now, period),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Visibility> {
        match s {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_CONFIG_PATH: &str = ".drone.yml";
pub const DEFAULT_TIMEOUT_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: i64,
    /// Opaque identifier from the source control host, stable across renames.
    pub uid: String,
    pub user_id: i64,
    pub namespace: String,
    pub name: String,
    pub visibility: Visibility,
    pub branch: String,
    pub config: String,
    pub timeout: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}

/// Whether background synchronization may rewrite a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "at", rename_all = "lowercase")]
pub enum SyncState {
    /// Authoritative local grant, never refreshed from the remote authority.
    Pinned,
    Synced(DateTime<Utc>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub repo_uid: String,
    pub user_id: i64,
    pub permission: Permission,
    pub sync: SyncState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionRecord {
    /// The pinned admin grant seeded for a repository's creator.
    #[must_use]
    pub fn owner(repo_uid: impl Into<String>, user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            repo_uid: repo_uid.into(),
            user_id,
            permission: Permission::ADMIN.expand_implied(),
            sync: SyncState::Pinned,
            created_at: now,
            updated_at: now,
        }
    }

    /// A record produced by a refresh at `at`.
    #[must_use]
    pub fn synced(
        repo_uid: impl Into<String>,
        user_id: i64,
        permission: Permission,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            repo_uid: repo_uid.into(),
            user_id,
            permission: permission.expand_implied(),
            sync: SyncState::Synced(at),
            created_at: at,
            updated_at: at,
        }
    }

    #[must_use]
    pub fn read(&self) -> bool {
        self.permission.allows(Capability::Read)
    }

    #[must_use]
    pub fn write(&self) -> bool {
        self.permission.allows(Capability::Write)
    }

    #[must_use]
    pub fn admin(&self) -> bool {
        self.permission.allows(Capability::Admin)
    }

    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.sync == SyncState::Pinned
    }

    /// Pinned records are never stale.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, period: Duration) -> bool {
        match self.sync {
            SyncState::Pinned => false,
            SyncState::Synced(at) => expired(at, now, period),
        }
    }
}
