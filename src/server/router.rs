use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{Router, routing::get};

use super::admin::admin_router;
use super::user::user_router;
use crate::acl::{
    AccessResolver, ActorSubstitution, AdmissionGate, PermissionCache, PermissionSynchronizer,
    admission_gate,
};
use crate::config::AccessConfig;
use crate::remote::RemoteAuthority;
use crate::store::Store;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: PermissionCache,
    pub synchronizer: PermissionSynchronizer,
    pub resolver: AccessResolver,
    pub substitution: ActorSubstitution,
    pub admission: Arc<dyn AdmissionGate>,
    pub remote: Arc<dyn RemoteAuthority>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        remote: Arc<dyn RemoteAuthority>,
        config: &AccessConfig,
    ) -> Self {
        let cache = PermissionCache::new(store.clone());
        let synchronizer = PermissionSynchronizer::new(store.clone(), remote.clone(), config.sync);
        let resolver = AccessResolver::new(cache.clone(), synchronizer.clone());
        let substitution = ActorSubstitution::new(store.clone(), resolver.clone());

        Self {
            admission: admission_gate(&config.admission),
            store,
            cache,
            synchronizer,
            resolver,
            substitution,
            remote,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", user_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
