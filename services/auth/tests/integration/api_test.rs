use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use serde_json::{Value, json};
use uuid::Uuid;

use gada_auth::domain::repository::UserRepository;
use gada_auth::handlers::client::ClientAddressPolicy;
use gada_auth::infra::db::DbUserRepository;
use gada_auth::infra::mailer::LogMailer;
use gada_auth::router::build_router;
use gada_auth::state::AppState;
use gada_auth_types::cookie::{CookieSettings, GADA_REFRESH_TOKEN};
use gada_auth_types::identity::AccessTokenSecret;
use gada_domain::user::UserRole;
use gada_testing::auth::{MockAuth, TEST_JWT_SECRET};

use crate::db_test::{new_user, test_db};
use crate::helpers::{PASSWORD, test_hasher};

struct TestApp {
    server: TestServer,
    users: DbUserRepository,
}

async fn spawn_app() -> TestApp {
    spawn_app_with(ClientAddressPolicy::default()).await
}

/// Same as [`spawn_app`], as if deployed behind a trusted reverse proxy.
async fn spawn_proxied_app() -> TestApp {
    spawn_app_with(ClientAddressPolicy {
        trust_forwarded_headers: true,
    })
    .await
}

async fn spawn_app_with(client_policy: ClientAddressPolicy) -> TestApp {
    let db = test_db().await;
    let state = AppState {
        db: db.clone(),
        access_secret: AccessTokenSecret::new(TEST_JWT_SECRET),
        cookies: CookieSettings {
            domain: None,
            secure: false,
        },
        mailer: LogMailer,
        hasher: test_hasher(),
        expose_dev_tokens: true,
        client_policy,
    };
    let server = TestServer::new(build_router(state, Duration::from_secs(10))).unwrap();
    TestApp {
        server,
        users: DbUserRepository { db },
    }
}

impl TestApp {
    /// Register through the API, then approve and verify directly in the store.
    async fn active_user(&self, username: &str) -> Uuid {
        let res = self
            .server
            .post("/auth/register")
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
            }))
            .await;
        res.assert_status(StatusCode::CREATED);
        let id: Uuid = res.json::<Value>()["id"].as_str().unwrap().parse().unwrap();

        self.users.approve(id, chrono::Utc::now()).await.unwrap();
        self.users
            .set_verification_code(id, "000000", chrono::Utc::now())
            .await
            .unwrap();
        self.users
            .consume_verification_code(id, "000000", chrono::Utc::now())
            .await
            .unwrap();
        id
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

fn forwarded_for(ip: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_str(ip).unwrap(),
    )
}

#[tokio::test]
async fn should_report_health_and_readiness() {
    let app = spawn_app().await;
    app.server.get("/healthz").await.assert_status_ok();
    app.server.get("/readyz").await.assert_status_ok();
}

#[tokio::test]
async fn should_register_unapproved_user_without_secrets() {
    let app = spawn_app().await;
    let res = app
        .server
        .post("/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": PASSWORD,
        }))
        .await;

    res.assert_status(StatusCode::CREATED);
    let body: Value = res.json();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "user");
    assert_eq!(body["approved"], false);
    assert_eq!(body["email_verified"], false);
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn should_reject_weak_password_with_missing_rules() {
    let app = spawn_app().await;
    let res = app
        .server
        .post("/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "abc",
        }))
        .await;

    res.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = res.json();
    assert_eq!(body["kind"], "WEAK_PASSWORD");
    assert_eq!(
        body["missing"],
        json!(["length", "uppercase", "digit", "symbol"])
    );
}

#[tokio::test]
async fn should_forbid_login_before_approval() {
    let app = spawn_app().await;
    app.server
        .post("/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": PASSWORD,
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let res = app
        .server
        .post("/auth/token")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await;
    res.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(res.json::<Value>()["kind"], "ACCOUNT_NOT_APPROVED");
}

#[tokio::test]
async fn should_login_refresh_and_logout_with_cookie() {
    let app = spawn_app().await;
    let user_id = app.active_user("alice").await;

    let login = app
        .server
        .post("/auth/token")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await;
    login.assert_status_ok();
    let body: Value = login.json();
    assert_eq!(body["token_type"], "bearer");
    assert!(body.get("refresh_token").is_none());
    let access = body["access_token"].as_str().unwrap().to_owned();
    let cookie = login.cookie(GADA_REFRESH_TOKEN);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/auth/token"));

    let me = app
        .server
        .get("/users/me")
        .add_header(AUTHORIZATION, bearer(&access))
        .await;
    me.assert_status_ok();
    assert_eq!(me.json::<Value>()["id"], user_id.to_string());

    let refreshed = app.server.patch("/auth/token").add_cookie(cookie.clone()).await;
    refreshed.assert_status_ok();
    let rotated = refreshed.cookie(GADA_REFRESH_TOKEN);
    assert_ne!(rotated.value(), cookie.value());

    let reused = app.server.patch("/auth/token").add_cookie(cookie).await;
    reused.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(reused.json::<Value>()["kind"], "INVALID_REFRESH_TOKEN");

    let logout = app.server.delete("/auth/token").add_cookie(rotated.clone()).await;
    logout.assert_status(StatusCode::NO_CONTENT);
    assert_eq!(logout.cookie(GADA_REFRESH_TOKEN).value(), "");

    app.server
        .patch("/auth/token")
        .add_cookie(rotated)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_reject_refresh_without_cookie() {
    let app = spawn_app().await;
    app.server
        .patch("/auth/token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_throttle_login_per_client_and_username() {
    let app = spawn_proxied_app().await;
    app.active_user("alice").await;

    let (name, value) = forwarded_for("203.0.113.7");
    for _ in 0..5 {
        app.server
            .post("/auth/token")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "username": "alice", "password": "Wrong1!xx" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    let limited = app
        .server
        .post("/auth/token")
        .add_header(name.clone(), value.clone())
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.json::<Value>()["kind"], "RATE_LIMITED");

    let (name, value) = forwarded_for("198.51.100.2");
    app.server
        .post("/auth/token")
        .add_header(name, value)
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn should_not_reset_login_throttle_for_spoofed_forwarded_header() {
    let app = spawn_app().await;
    app.active_user("alice").await;

    for i in 0..5 {
        let (name, value) = forwarded_for(&format!("203.0.113.{i}"));
        app.server
            .post("/auth/token")
            .add_header(name, value)
            .json(&json!({ "username": "alice", "password": "Wrong1!xx" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    let (name, value) = forwarded_for("203.0.113.99");
    let limited = app
        .server
        .post("/auth/token")
        .add_header(name, value)
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.json::<Value>()["kind"], "RATE_LIMITED");
}

#[tokio::test]
async fn should_verify_email_with_exposed_dev_code() {
    let app = spawn_app().await;
    let res = app
        .server
        .post("/auth/register")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": PASSWORD,
        }))
        .await;
    let id: Uuid = res.json::<Value>()["id"].as_str().unwrap().parse().unwrap();

    let requested = app
        .server
        .post("/auth/email/verification")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await;
    requested.assert_status_ok();
    let body: Value = requested.json();
    assert_eq!(body["sent"], true);
    let code = body["dev_code"].as_str().unwrap().to_owned();

    let verified = app
        .server
        .post("/auth/email/verify")
        .json(&json!({ "code": code, "username": "alice" }))
        .await;
    verified.assert_status_ok();
    assert_eq!(verified.json::<Value>(), json!({ "status": "verified" }));
    assert!(app.users.find_by_id(id).await.unwrap().unwrap().email_verified);

    app.server
        .post("/auth/email/verify")
        .json(&json!({ "code": code }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn should_reject_anonymous_verification_request_without_credentials() {
    let app = spawn_app().await;
    let res = app.server.post("/auth/email/verification").await;
    res.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(res.json::<Value>()["kind"], "INVALID_REQUEST");
}

#[tokio::test]
async fn should_accept_reset_request_for_unknown_email() {
    let app = spawn_app().await;
    let res = app
        .server
        .post("/auth/password/reset-request")
        .json(&json!({ "email": "nobody@example.com" }))
        .await;
    res.assert_status(StatusCode::ACCEPTED);
    assert_eq!(res.json::<Value>()["token"], Value::Null);
}

#[tokio::test]
async fn should_reset_password_and_end_sessions() {
    let app = spawn_app().await;
    app.active_user("alice").await;

    let login = app
        .server
        .post("/auth/token")
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .await;
    let session = login.cookie(GADA_REFRESH_TOKEN);

    let ack = app
        .server
        .post("/auth/password/reset-request")
        .json(&json!({ "email": "alice@example.com" }))
        .await;
    ack.assert_status(StatusCode::ACCEPTED);
    let token = ack.json::<Value>()["token"].as_str().unwrap().to_owned();

    app.server
        .post("/auth/password/reset")
        .json(&json!({ "token": token, "new_password": "Fresh2@pass" }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .patch("/auth/token")
        .add_cookie(session)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .post("/auth/token")
        .json(&json!({ "username": "alice", "password": "Fresh2@pass" }))
        .await
        .assert_status_ok();
    app.server
        .post("/auth/password/reset")
        .json(&json!({ "token": token, "new_password": "Another3#pass" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn should_require_admin_to_approve() {
    let app = spawn_app().await;
    let pending = new_user("bob", UserRole::User);
    app.users.create(&pending).await.unwrap();
    let path = format!("/admin/users/{}/approve", pending.id);

    app.server
        .post(&path)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .post(&path)
        .add_header(AUTHORIZATION, MockAuth::user("mallory").authorization())
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post(&path)
        .add_header(AUTHORIZATION, MockAuth::admin("root").authorization())
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert!(app.users.find_by_id(pending.id).await.unwrap().unwrap().approved);

    app.server
        .post(&format!("/admin/users/{}/approve", Uuid::new_v4()))
        .add_header(AUTHORIZATION, MockAuth::admin("root").authorization())
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
