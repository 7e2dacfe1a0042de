use crate::server::AppState;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::types::{Capability, Principal, Repository};

pub fn find_repo(state: &AppState, namespace: &str, name: &str) -> Result<Repository, ApiError> {
    state
        .store
        .find_repository_by_name(namespace, name)
        .api_err("Failed to get repo")?
        .or_not_found("Repository not found")
}

/// Fails with 403 unless the principal holds `capability` on the repository.
pub fn require_repo_capability(
    state: &AppState,
    principal: &Principal,
    repo: &Repository,
    capability: Capability,
) -> Result<(), ApiError> {
    let decision = state
        .resolver
        .resolve(principal, repo, capability)
        .api_err("Failed to check repository permissions")?;

    if decision.is_granted() {
        Ok(())
    } else {
        Err(ApiError::insufficient_permissions())
    }
}

/// Anonymous callers may only read public repositories.
pub fn require_repo_read(
    state: &AppState,
    principal: Option<&Principal>,
    repo: &Repository,
) -> Result<(), ApiError> {
    match principal {
        Some(principal) => require_repo_capability(state, principal, repo, Capability::Read),
        None if repo.is_public() => Ok(()),
        None => Err(ApiError::insufficient_permissions()),
    }
}
