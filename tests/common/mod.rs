#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use warden::auth::generate_token;
use warden::config::AccessConfig;
use warden::error::{Error, Result};
use warden::remote::{RemoteAccount, RemoteAuthority, RemoteGrant};
use warden::server::{AppState, create_router};
use warden::store::{SqliteStore, Store};
use warden::types::Principal;

/// Remote authority that knows accounts by access token and grants by login.
/// Logins starting with `bot` are reported as machine accounts.
#[derive(Default)]
pub struct FakeRemote {
    grants: Mutex<HashMap<String, Vec<RemoteGrant>>>,
    calls: AtomicUsize,
}

impl FakeRemote {
    pub fn set_grants(&self, login: &str, grants: Vec<RemoteGrant>) {
        self.grants
            .lock()
            .unwrap()
            .insert(login.to_string(), grants);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteAuthority for FakeRemote {
    async fn find_account(&self, access_token: &str) -> Result<RemoteAccount> {
        let login = access_token
            .strip_prefix("scm-")
            .ok_or_else(|| Error::Remote("401 Unauthorized".to_string()))?;
        Ok(RemoteAccount {
            login: login.to_string(),
            email: format!("{login}@example.com"),
            machine: login.starts_with("bot"),
        })
    }

    async fn fetch_grants(&self, principal: &Principal) -> Result<Vec<RemoteGrant>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .grants
            .lock()
            .unwrap()
            .get(&principal.login)
            .cloned()
            .unwrap_or_default())
    }
}

pub fn grant(repo_uid: &str, read: bool, write: bool, admin: bool) -> RemoteGrant {
    RemoteGrant {
        repo_uid: repo_uid.to_string(),
        read,
        write,
        admin,
    }
}

pub struct TestApp {
    _temp: TempDir,
    pub state: Arc<AppState>,
    pub remote: Arc<FakeRemote>,
    pub admin_token: String,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AccessConfig::default())
    }

    pub fn with_config(config: AccessConfig) -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp.path().join("warden.db")).expect("open store");
        store.initialize().expect("initialize store");

        let (admin_token, digest) = generate_token();
        let mut admin = Principal::new("admin", "");
        admin.admin = true;
        admin.token_digest = Some(digest);
        store.create_principal(&admin).expect("create admin");

        let remote = Arc::new(FakeRemote::default());
        let state = Arc::new(AppState::new(Arc::new(store), remote.clone(), &config));
        let router = create_router(state.clone());

        Self {
            _temp: temp,
            state,
            remote,
            admin_token,
            router,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router is infallible")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(method, uri, token, body).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    /// Logs in through the remote authority and waits for the initial refresh.
    pub async fn login(&self, login: &str) -> (StatusCode, Value) {
        let result = self
            .request(
                Method::POST,
                "/api/v1/users",
                None,
                Some(serde_json::json!({ "access": format!("scm-{login}") })),
            )
            .await;
        self.state.synchronizer.drain().await;
        result
    }

    /// Registers a new principal and returns its API token.
    pub async fn register(&self, login: &str) -> String {
        let (status, body) = self.login(login).await;
        assert_eq!(status, StatusCode::CREATED, "register {login}: {body}");
        body["data"]["token"]
            .as_str()
            .expect("token in response")
            .to_string()
    }

    pub async fn create_repo(
        &self,
        token: &str,
        slug: &str,
        uid: &str,
        visibility: &str,
    ) -> (StatusCode, Value) {
        self.request(
            Method::POST,
            &format!("/api/v1/repos/{slug}"),
            Some(token),
            Some(serde_json::json!({ "uid": uid, "visibility": visibility })),
        )
        .await
    }
}
