use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{TimeDelta, Utc};
use tracing::{info, warn};

use crate::auth::{RequirePrincipal, generate_token};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{LoginRequest, LoginResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::types::Principal;

/// Exchanges a source control access token for a principal.
///
/// First sight of an account runs admission and issues an API token; later
/// logins refresh the stored credentials. Either way a permission refresh is
/// scheduled when the principal is due.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    if req.access.trim().is_empty() {
        return Err(ApiError::bad_request("Access token is required"));
    }

    let account = state.remote.find_account(&req.access).await.map_err(|e| {
        warn!("Cannot resolve remote account: {e}");
        ApiError::unauthorized("Cannot verify remote account")
    })?;

    let now = Utc::now();
    let expiry = match req.expires_in_seconds.filter(|secs| *secs > 0) {
        Some(secs) => Some(
            TimeDelta::try_seconds(secs)
                .and_then(|ttl| now.checked_add_signed(ttl))
                .ok_or_else(|| ApiError::bad_request("Invalid expires_in_seconds"))?,
        ),
        None => None,
    };

    let existing = state
        .store
        .find_principal_by_login(&account.login)
        .api_err("Failed to lookup principal")?;

    let (principal, token) = match existing {
        Some(mut principal) => {
            if !principal.active {
                return Err(ApiError::forbidden("Account is disabled"));
            }
            principal.token = req.access;
            principal.refresh = req.refresh;
            principal.expiry = expiry;
            principal.last_login = Some(now);
            if !account.email.is_empty() {
                principal.email = account.email;
            }
            principal.updated_at = now;
            state
                .store
                .update_principal(&principal)
                .api_err("Failed to update principal")?;
            (principal, None)
        }
        None => {
            let mut candidate = Principal::new(account.login, account.email);
            candidate.token = req.access;
            candidate.refresh = req.refresh;
            candidate.expiry = expiry;
            candidate.machine = account.machine;

            if let Err(e) = state.admission.admit(&candidate) {
                return Err(match e {
                    Error::AdmissionDenied(reason) => {
                        info!(login = %candidate.login, %reason, "admission denied");
                        ApiError::forbidden(reason)
                    }
                    other => {
                        tracing::error!("Admission check failed: {other}");
                        ApiError::internal("Failed to check admission")
                    }
                });
            }

            let (raw_token, digest) = generate_token();
            candidate.token_digest = Some(digest);
            candidate.last_login = Some(now);

            let principal = match state.store.create_principal(&candidate) {
                Ok(principal) => principal,
                Err(Error::AlreadyExists) => {
                    return Err(ApiError::conflict("Principal already exists"));
                }
                Err(e) => {
                    tracing::error!("Failed to create principal: {e}");
                    return Err(ApiError::internal("Failed to create principal"));
                }
            };
            info!(login = %principal.login, "registered principal");
            (principal, Some(raw_token))
        }
    };

    state.synchronizer.refresh_if_due(&principal);

    let status = if token.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok::<_, ApiError>((
        status,
        Json(ApiResponse::success(LoginResponse { principal, token })),
    ))
}

pub async fn get_self(RequirePrincipal(principal): RequirePrincipal) -> impl IntoResponse {
    Json(ApiResponse::success(principal))
}
