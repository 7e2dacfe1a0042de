mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{TestApp, grant};
use warden::config::AccessConfig;

const DENIED: &str = "Insufficient repository permissions";

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("OK"));
}

#[tokio::test]
async fn test_login_registers_then_refreshes() {
    let app = TestApp::new();

    let (status, body) = app.login("u1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["principal"]["login"], "u1");
    assert_eq!(body["data"]["principal"]["email"], "u1@example.com");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(token.starts_with("warden_"));
    assert_eq!(app.remote.calls(), 1);

    let (status, body) = app.login("u1").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("token").is_none());
    assert_eq!(app.remote.calls(), 1, "fresh principals are not refreshed again");

    let (status, body) = app.request(Method::GET, "/api/v1/user", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["login"], "u1");
    assert!(body["data"].get("token").is_none());
}

#[tokio::test]
async fn test_login_rejects_unknown_account() {
    let app = TestApp::new();
    let (status, _) = app
        .request(Method::POST, "/api/v1/users", None, Some(json!({ "access": "bogus" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admission_denial_persists_nothing() {
    let config = AccessConfig::parse(
        r#"
        [admission]
        banned_logins = ["mallory"]
        "#,
    )
    .unwrap();
    let app = TestApp::with_config(config);

    let (status, body) = app.login("mallory").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("mallory"));
    assert!(app.state.store.find_principal_by_login("mallory").unwrap().is_none());
    assert_eq!(app.remote.calls(), 0);

    let (status, _) = app.login("alice").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_missing_or_bad_token() {
    let app = TestApp::new();

    let response = app
        .send(Method::POST, "/api/v1/repos/acme/app", None, Some(json!({ "uid": "1" })))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("WWW-Authenticate").unwrap(),
        "Bearer realm=\"warden\""
    );

    let (status, body) = app
        .request(Method::GET, "/api/v1/user", Some("warden_nope"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn test_repository_creation_and_visibility() {
    let app = TestApp::new();
    let u1 = app.register("u1").await;
    let u2 = app.register("u2").await;

    let (status, body) = app.create_repo(&u1, "acme/app", "uid-acme-app", "private").await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["branch"], "master");
    assert_eq!(body["data"]["config"], ".drone.yml");

    let (status, _) = app.create_repo(&u2, "acme/app", "uid-other", "private").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.request(Method::GET, "/api/v1/repos/acme/app", Some(&u1), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.request(Method::GET, "/api/v1/repos/acme/app", Some(&u2), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], DENIED);

    let (status, _) = app.request(Method::GET, "/api/v1/repos/acme/app", None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(
            Method::PATCH,
            "/api/v1/repos/acme/app",
            Some(&u1),
            Some(json!({ "visibility": "public" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["visibility"], "public");

    let (status, _) = app.request(Method::GET, "/api/v1/repos/acme/app", Some(&u2), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.request(Method::GET, "/api/v1/repos/acme/app", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(
            Method::PATCH,
            "/api/v1/repos/acme/app",
            Some(&u2),
            Some(json!({ "timeout": 90 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], DENIED);

    let (status, _) = app
        .request(Method::GET, "/api/v1/repos/acme/missing", Some(&u1), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_sync_applies_remote_grants() {
    let app = TestApp::new();
    let u1 = app.register("u1").await;
    let u2 = app.register("u2").await;
    app.create_repo(&u1, "acme/app", "uid-acme-app", "private").await;

    app.remote.set_grants(
        "u2",
        vec![grant("uid-acme-app", true, true, false), grant("uid-gone", true, false, false)],
    );
    app.remote.set_grants("u1", vec![grant("uid-acme-app", true, false, false)]);

    let (status, _) = app
        .request(Method::POST, "/api/v1/admin/users/u2/sync", Some(&u1), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::POST, "/api/v1/admin/users/u2/sync", Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"], json!({ "written": 1, "kept": 0, "unknown": 1, "revoked": 0 }));

    let (status, _) = app
        .request(
            Method::PATCH,
            "/api/v1/repos/acme/app",
            Some(&u2),
            Some(json!({ "branch": "main" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::DELETE, "/api/v1/repos/acme/app", Some(&u2), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::POST, "/api/v1/admin/users/u1/sync", Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kept"], 1);

    let (status, body) = app
        .request(Method::GET, "/api/v1/admin/users/u2/permissions", Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .request(Method::POST, "/api/v1/admin/users/nobody/sync", Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_collaborators_and_delete() {
    let app = TestApp::new();
    let u1 = app.register("u1").await;
    let u2 = app.register("u2").await;
    app.create_repo(&u1, "acme/app", "uid-acme-app", "public").await;

    app.remote.set_grants("u2", vec![grant("uid-acme-app", true, false, false)]);
    app.request(Method::POST, "/api/v1/admin/users/u2/sync", Some(&app.admin_token), None)
        .await;

    let (status, _) = app
        .request(Method::GET, "/api/v1/repos/acme/app/collaborators", Some(&u2), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .request(Method::GET, "/api/v1/repos/acme/app/collaborators", Some(&u1), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let collaborators = body["data"].as_array().unwrap();
    assert_eq!(collaborators.len(), 2);
    assert_eq!(collaborators[0]["login"], "u1");
    assert_eq!(collaborators[0]["pinned"], true);
    assert_eq!(collaborators[0]["admin"], true);
    assert_eq!(collaborators[1]["login"], "u2");
    assert_eq!(collaborators[1]["write"], false);

    let (status, _) = app
        .request(Method::DELETE, "/api/v1/repos/acme/app", Some(&u1), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.request(Method::GET, "/api/v1/repos/acme/app", Some(&u1), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.state.cache.list_by_repo("uid-acme-app").unwrap().is_empty());
}

#[tokio::test]
async fn test_build_trigger_substitutes_administrator() {
    let app = TestApp::new();
    let u1 = app.register("u1").await;
    let bot = app.register("bot").await;
    app.create_repo(&u1, "acme/app", "uid-acme-app", "private").await;

    let registered = app.state.store.find_principal_by_login("bot").unwrap().unwrap();
    assert!(registered.machine);

    let (status, body) = app
        .request(Method::POST, "/api/v1/repos/acme/app/builds", Some(&u1), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["actor"], "u1");
    assert_eq!(body["data"]["substituted"], false);
    assert_eq!(body["data"]["branch"], "master");

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/repos/acme/app/builds",
            Some(&bot),
            Some(json!({ "branch": "feature", "commit": "abc123" })),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["actor"], "u1");
    assert_eq!(body["data"]["triggered_by"], "bot");
    assert_eq!(body["data"]["substituted"], true);
    assert_eq!(body["data"]["branch"], "feature");

    let mut owner = app.state.store.find_principal_by_login("u1").unwrap().unwrap();
    owner.active = false;
    app.state.store.update_principal(&owner).unwrap();

    let (status, _) = app
        .request(Method::POST, "/api/v1/repos/acme/app/builds", Some(&bot), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_build_trigger_refuses_strangers_and_disabled_bots() {
    let app = TestApp::new();
    let u1 = app.register("u1").await;
    let stranger = app.register("stranger").await;
    let bot = app.register("bot-ci").await;
    app.create_repo(&u1, "acme/app", "uid-acme-app", "private").await;

    let (status, body) = app
        .request(Method::POST, "/api/v1/repos/acme/app/builds", Some(&stranger), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], DENIED);

    let mut disabled = app.state.store.find_principal_by_login("bot-ci").unwrap().unwrap();
    disabled.active = false;
    app.state.store.update_principal(&disabled).unwrap();

    let (status, body) = app
        .request(Method::POST, "/api/v1/repos/acme/app/builds", Some(&bot), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Account is disabled");

    let (status, _) = app.request(Method::GET, "/api/v1/user", Some(&bot), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_rejects_unrepresentable_expiry() {
    let app = TestApp::new();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({ "access": "scm-u1", "expires_in_seconds": i64::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid expires_in_seconds");
    assert!(app.state.store.find_principal_by_login("u1").unwrap().is_none());

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/users",
            None,
            Some(json!({ "access": "scm-u1", "expires_in_seconds": 3600 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["principal"]["expiry"].is_string());
    app.state.synchronizer.drain().await;
}
