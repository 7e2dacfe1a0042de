mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/{login}/sync", post(users::sync_user))
        .route(
            "/users/{login}/permissions",
            get(users::list_user_permissions),
        )
}
