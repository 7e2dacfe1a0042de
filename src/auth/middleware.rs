use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{TokenValidationError, extract_token_from_header, validate_token};
use crate::context::RequestContext;
use crate::server::AppState;
use crate::types::Principal;

/// Extractor that requires a principal authenticated by API token.
pub struct RequirePrincipal(pub Principal);

impl RequirePrincipal {
    /// A fresh request context acting as the authenticated principal.
    #[must_use]
    pub fn into_context(self) -> RequestContext {
        RequestContext::new(self.0)
    }
}

/// Extractor that requires a global administrator.
pub struct RequireAdmin(pub Principal);

/// Extractor for routes that also serve anonymous callers.
pub struct MaybePrincipal(pub Option<Principal>);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    NotAdmin,
    Disabled,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::NotAdmin => (StatusCode::FORBIDDEN, "Admin access required"),
            AuthError::Disabled => (StatusCode::FORBIDDEN, "Account is disabled"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                "WWW-Authenticate",
                HeaderValue::from_static("Bearer realm=\"warden\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequirePrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, state)?.ok_or(AuthError::MissingAuth)?;
        Ok(RequirePrincipal(principal))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let principal = authenticate(parts, state)?.ok_or(AuthError::MissingAuth)?;

        if !principal.admin {
            return Err(AuthError::NotAdmin);
        }

        Ok(RequireAdmin(principal))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybePrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybePrincipal(authenticate(parts, state)?))
    }
}

fn authenticate(parts: &Parts, state: &Arc<AppState>) -> Result<Option<Principal>, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(raw_token) = extract_token_from_header(auth_header).map_err(map_validation)? else {
        return Ok(None);
    };

    let principal = validate_token(state, &raw_token).map_err(map_validation)?;
    if !principal.active {
        return Err(AuthError::Disabled);
    }
    Ok(Some(principal))
}

fn map_validation(err: TokenValidationError) -> AuthError {
    match err {
        TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
        TokenValidationError::InvalidToken => AuthError::InvalidToken,
        TokenValidationError::InternalError => AuthError::InternalError,
    }
}
