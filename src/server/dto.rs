use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{PermissionRecord, Principal, Visibility};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Access token issued by the source control host.
    pub access: String,
    #[serde(default)]
    pub refresh: String,
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub principal: Principal,
    /// Only present when the principal was registered by this request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRepoRequest {
    pub uid: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub timeout: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateRepoRequest {
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub timeout: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CollaboratorResponse {
    pub login: String,
    pub read: bool,
    pub write: bool,
    pub admin: bool,
    pub pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl CollaboratorResponse {
    #[must_use]
    pub fn new(principal: &Principal, record: &PermissionRecord) -> Self {
        let synced_at = match record.sync {
            crate::types::SyncState::Pinned => None,
            crate::types::SyncState::Synced(at) => Some(at),
        };
        Self {
            login: principal.login.clone(),
            read: record.read(),
            write: record.write(),
            admin: record.admin(),
            pinned: record.is_pinned(),
            synced_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TriggerBuildRequest {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerBuildResponse {
    pub request_id: Uuid,
    pub repo: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Login the build runs as.
    pub actor: String,
    pub triggered_by: String,
    pub substituted: bool,
}
