use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use crate::auth::{MaybePrincipal, RequirePrincipal};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CollaboratorResponse, CreateRepoRequest, UpdateRepoRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{
    validate_namespace_name, validate_repo_name, validate_repo_uid, validate_timeout,
};
use crate::types::{
    Capability, DEFAULT_BRANCH, DEFAULT_CONFIG_PATH, DEFAULT_TIMEOUT_MINUTES, PermissionRecord,
    Repository,
};

use super::access::{find_repo, require_repo_capability, require_repo_read};

pub async fn get_repo(
    MaybePrincipal(principal): MaybePrincipal,
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let repo = find_repo(&state, &namespace, &name)?;

    require_repo_read(&state, principal.as_ref(), &repo)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(repo)))
}

/// Registers a repository and seeds its creator's pinned admin grant.
pub async fn create_repo(
    RequirePrincipal(principal): RequirePrincipal,
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
    Json(req): Json<CreateRepoRequest>,
) -> impl IntoResponse {
    if !principal.active {
        return Err(ApiError::insufficient_permissions());
    }

    validate_namespace_name(&namespace)?;
    validate_repo_name(&name)?;
    validate_repo_uid(&req.uid)?;
    let timeout = req.timeout.unwrap_or(DEFAULT_TIMEOUT_MINUTES);
    validate_timeout(timeout)?;

    let now = Utc::now();
    let repo = Repository {
        id: 0,
        uid: req.uid,
        user_id: principal.id,
        namespace,
        name,
        visibility: req.visibility,
        branch: req.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        config: req.config.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
        timeout,
        created_at: now,
        updated_at: now,
    };
    let grant = PermissionRecord::owner(&repo.uid, principal.id);

    let repo = match state.store.create_repository(&repo, &grant) {
        Ok(repo) => repo,
        Err(Error::AlreadyExists) => return Err(ApiError::conflict("Repository already exists")),
        Err(e) => {
            tracing::error!("Failed to create repo: {e}");
            return Err(ApiError::internal("Failed to create repo"));
        }
    };

    info!(repo = %repo.slug(), owner = %principal.login, "registered repository");

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(repo))))
}

pub async fn update_repo(
    RequirePrincipal(principal): RequirePrincipal,
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
    Json(req): Json<UpdateRepoRequest>,
) -> impl IntoResponse {
    let mut repo = find_repo(&state, &namespace, &name)?;

    require_repo_capability(&state, &principal, &repo, Capability::Write)?;

    if let Some(visibility) = req.visibility {
        repo.visibility = visibility;
    }
    if let Some(branch) = req.branch {
        if branch.trim().is_empty() {
            return Err(ApiError::bad_request("Branch cannot be empty"));
        }
        repo.branch = branch;
    }
    if let Some(config) = req.config {
        if config.trim().is_empty() {
            return Err(ApiError::bad_request("Config path cannot be empty"));
        }
        repo.config = config;
    }
    if let Some(timeout) = req.timeout {
        validate_timeout(timeout)?;
        repo.timeout = timeout;
    }
    repo.updated_at = Utc::now();

    state
        .store
        .update_repository(&repo)
        .api_err("Failed to update repo")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(repo)))
}

pub async fn delete_repo(
    RequirePrincipal(principal): RequirePrincipal,
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let repo = find_repo(&state, &namespace, &name)?;

    require_repo_capability(&state, &principal, &repo, Capability::Admin)?;

    state
        .store
        .delete_repository(repo.id)
        .api_err("Failed to delete repo")?;

    info!(repo = %repo.slug(), by = %principal.login, "deleted repository");

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

/// Principals holding a cached record on the repository, pinned owners first.
pub async fn list_collaborators(
    RequirePrincipal(principal): RequirePrincipal,
    State(state): State<Arc<AppState>>,
    Path((namespace, name)): Path<(String, String)>,
) -> impl IntoResponse {
    let repo = find_repo(&state, &namespace, &name)?;

    require_repo_capability(&state, &principal, &repo, Capability::Admin)?;

    let records = state
        .cache
        .list_by_repo(&repo.uid)
        .api_err("Failed to list collaborators")?;

    let mut collaborators = Vec::with_capacity(records.len());
    for record in &records {
        if let Some(member) = state
            .store
            .find_principal(record.user_id)
            .api_err("Failed to get collaborator")?
        {
            collaborators.push(CollaboratorResponse::new(&member, record));
        }
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(collaborators)))
}
