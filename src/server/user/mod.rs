pub mod access;
mod builds;
mod login;
mod repos;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Principals
        .route("/users", post(login::login))
        .route("/user", get(login::get_self))
        // Repos
        .route(
            "/repos/{namespace}/{name}",
            get(repos::get_repo)
                .post(repos::create_repo)
                .patch(repos::update_repo)
                .delete(repos::delete_repo),
        )
        .route(
            "/repos/{namespace}/{name}/collaborators",
            get(repos::list_collaborators),
        )
        // Builds
        .route(
            "/repos/{namespace}/{name}/builds",
            post(builds::trigger_build),
        )
}
