use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::warn;

use crate::auth::RequireAdmin;
use crate::error::Error;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::{PermissionRecord, Principal};

fn find_principal(state: &AppState, login: &str) -> Result<Principal, ApiError> {
    state
        .store
        .find_principal_by_login(login)
        .api_err("Failed to get principal")?
        .or_not_found("Principal not found")
}

/// Runs a foreground permission refresh for one principal.
pub async fn sync_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
) -> impl IntoResponse {
    let principal = find_principal(&state, &login)?;

    let summary = state
        .synchronizer
        .synchronize(&principal)
        .await
        .map_err(|e| match e {
            Error::SyncInProgress => ApiError::conflict("Synchronization already in progress"),
            err @ (Error::Remote(_) | Error::SyncTimeout(_)) => {
                warn!(login = %principal.login, "synchronization failed: {err}");
                ApiError::bad_gateway("Remote authority unavailable")
            }
            other => {
                tracing::error!("Failed to synchronize: {other}");
                ApiError::internal("Failed to synchronize")
            }
        })?;

    Ok::<_, ApiError>(Json(ApiResponse::success(summary)))
}

pub async fn list_user_permissions(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(login): Path<String>,
) -> impl IntoResponse {
    let principal = find_principal(&state, &login)?;

    let records: Vec<PermissionRecord> = state
        .cache
        .list_by_user(principal.id)
        .api_err("Failed to list permissions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(records)))
}
