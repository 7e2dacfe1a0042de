use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use crate::auth::RequirePrincipal;
use crate::server::AppState;
use crate::server::dto::{TriggerBuildRequest, TriggerBuildResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

use super::access::find_repo;

/// Accepts a build trigger and resolves who it runs as. Execution itself
/// happens downstream.
pub async fn trigger_build(
    auth: RequirePrincipal,
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
    Json(req): Json<TriggerBuildRequest>,
) -> impl IntoResponse {
    let repo = find_repo(&state, &namespace, &name)?;
    let ctx = auth.into_context();

    let ctx = state
        .substitution
        .effective_actor(ctx, &repo)
        .api_err("Failed to resolve build actor")?
        .ok_or_else(ApiError::insufficient_permissions)?;

    let triggered_by = ctx.original.as_ref().unwrap_or(&ctx.actor).login.clone();
    let response = TriggerBuildResponse {
        request_id: ctx.request_id,
        repo: repo.slug(),
        branch: req.branch.unwrap_or_else(|| repo.branch.clone()),
        commit: req.commit,
        actor: ctx.actor.login.clone(),
        triggered_by,
        substituted: ctx.is_substituted(),
    };

    info!(
        request_id = %response.request_id,
        repo = %response.repo,
        actor = %response.actor,
        "build accepted"
    );

    Ok::<_, ApiError>((StatusCode::ACCEPTED, Json(ApiResponse::success(response))))
}
