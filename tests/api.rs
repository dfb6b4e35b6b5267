//! HTTP-level tests driving the full router in-process

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use mda_admin::audit::ActivitySink;
use mda_admin::model::{Activity, Config};
use mda_admin::seed::ensure_super_admin;
use mda_admin::store::{Database, StoreError};
use mda_admin::{AppState, create_app};

const SUPER_EMAIL: &str = "root@mda.gov";
const SUPER_PASSWORD: &str = "root-password";

fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt_secret = Some("integration-secret".to_string());
    config.bcrypt_rounds = 4;
    config.super_admin_email = Some(SUPER_EMAIL.to_string());
    config.super_admin_password = Some(SUPER_PASSWORD.to_string());
    config.rate_limit_max = 10_000;
    config
}

async fn seeded_state(config: Config, sink: Option<Arc<dyn ActivitySink>>) -> AppState {
    let db = Database::open_in_memory().unwrap();
    ensure_super_admin(&db, &config).await.unwrap();
    match sink {
        Some(sink) => AppState::with_activity_sink(config, db, sink),
        None => AppState::new(config, db),
    }
}

async fn test_app() -> Router {
    create_app(seeded_state(test_config(), None).await)
}

struct Reply {
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    Reply {
        status,
        content_type,
        body,
    }
}

async fn admin_login(app: &Router, email: &str, password: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/auth/admin/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK, "{:?}", reply.json());
    reply.json()["token"].as_str().unwrap().to_string()
}

async fn super_token(app: &Router) -> String {
    admin_login(app, SUPER_EMAIL, SUPER_PASSWORD).await
}

/// Returns the new admin's id
async fn create_regular_admin(app: &Router, token: &str, email: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/admin/admins",
        Some(token),
        Some(json!({ "name": "Regular Admin", "email": email, "password": "admin-pass" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.json());
    reply.json()["id"].as_str().unwrap().to_string()
}

/// Returns the new MDA's id
async fn create_mda(app: &Router, token: &str, name: &str) -> String {
    let reply = send(
        app,
        Method::POST,
        "/api/admin/mdas",
        Some(token),
        Some(json!({
            "name": name,
            "reports": [{ "title": "Annual Report", "url": "https://reports.gov/annual" }]
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.json());
    reply.json()["id"].as_str().unwrap().to_string()
}

async fn create_user(app: &Router, token: &str, username: &str, mda_id: &str) -> Reply {
    send(
        app,
        Method::POST,
        "/api/admin/users",
        Some(token),
        Some(json!({
            "username": username,
            "name": "Reporting Officer",
            "contactEmail": "officer@health.gov",
            "password": "user-pass",
            "mdaId": mda_id
        })),
    )
    .await
}

async fn activities(app: &Router, token: &str, query: &str) -> Vec<Value> {
    let reply = send(
        app,
        Method::GET,
        &format!("/api/admin/activities?{}", query),
        Some(token),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    reply.json()["activities"].as_array().unwrap().clone()
}

#[tokio::test]
async fn test_admin_route_without_token_is_401() {
    let app = test_app().await;

    let reply = send(&app, Method::GET, "/api/admin/mdas", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    let message = reply.json()["message"].as_str().unwrap().to_lowercase();
    assert!(message.contains("token"));

    let reply = send(&app, Method::GET, "/api/admin/mdas", Some("garbage"), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.json()["message"].as_str().unwrap().to_lowercase().contains("token"));
}

#[tokio::test]
async fn test_expired_admin_token_is_401() {
    let state = seeded_state(test_config(), None).await;
    let expired = state
        .tokens
        .issue_at(
            mda_admin::auth::PrincipalKind::Admin,
            "whoever",
            mda_admin::auth::Role::SuperAdmin,
            chrono::Utc::now().timestamp() - 2 * 86_400,
        )
        .unwrap()
        .token;
    let app = create_app(state);

    let reply = send(&app, Method::GET, "/api/admin/stats", Some(&expired), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert!(reply.json()["message"].as_str().unwrap().to_lowercase().contains("token"));
}

#[tokio::test]
async fn test_deactivated_admin_token_is_403() {
    let app = test_app().await;
    let root = super_token(&app).await;
    let admin_id = create_regular_admin(&app, &root, "ops@mda.gov").await;
    let ops = admin_login(&app, "ops@mda.gov", "admin-pass").await;

    let reply = send(
        &app,
        Method::PUT,
        &format!("/api/admin/admins/{}/status", admin_id),
        Some(&root),
        Some(json!({ "isActive": false })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["isActive"], json!(false));

    let reply = send(&app, Method::GET, "/api/admin/mdas", Some(&ops), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = send(
        &app,
        Method::POST,
        "/api/auth/admin/login",
        None,
        Some(json!({ "email": "ops@mda.gov", "password": "admin-pass" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_regular_admin_cannot_manage_admins() {
    let app = test_app().await;
    let root = super_token(&app).await;
    let first = create_regular_admin(&app, &root, "first@mda.gov").await;
    create_regular_admin(&app, &root, "second@mda.gov").await;
    let second = admin_login(&app, "second@mda.gov", "admin-pass").await;

    let reply = send(
        &app,
        Method::DELETE,
        &format!("/api/admin/admins/{}", first),
        Some(&second),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = send(&app, Method::GET, "/api/admin/admins", Some(&second), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    // Regular admins still manage MDAs
    create_mda(&app, &second, "Ministry of Works").await;
}

#[tokio::test]
async fn test_superadmin_cannot_be_deleted() {
    let app = test_app().await;
    let root = super_token(&app).await;
    let me = send(&app, Method::GET, "/api/auth/admin/me", Some(&root), None).await;
    let root_id = me.json()["id"].as_str().unwrap().to_string();
    assert_eq!(me.json()["role"], json!("superadmin"));

    let reply = send(
        &app,
        Method::DELETE,
        &format!("/api/admin/admins/{}", root_id),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_audit_policy() {
    let app = test_app().await;
    let root = super_token(&app).await;
    assert!(activities(&app, &root, "action=LOGIN").await.is_empty());

    let ops_id = create_regular_admin(&app, &root, "ops@mda.gov").await;
    let ops = admin_login(&app, "ops@mda.gov", "admin-pass").await;

    let logins = activities(&app, &root, "action=LOGIN").await;
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0]["adminId"], json!(ops_id));
    assert_eq!(logins[0]["resourceType"], json!("ADMIN"));

    let reply = send(&app, Method::POST, "/api/auth/admin/logout", Some(&ops), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(activities(&app, &root, "action=LOGOUT").await.len(), 1);

    let reply = send(&app, Method::POST, "/api/auth/admin/logout", Some(&root), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let logouts = activities(&app, &root, "action=LOGOUT").await;
    assert_eq!(logouts.len(), 1);
    assert_eq!(logouts[0]["adminId"], json!(ops_id));

    let created = activities(&app, &root, "action=CREATE&resourceType=ADMIN").await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["resourceName"], json!("ops@mda.gov"));
}

#[tokio::test]
async fn test_mda_requires_reports() {
    let app = test_app().await;
    let root = super_token(&app).await;

    let reply = send(
        &app,
        Method::POST,
        "/api/admin/mdas",
        Some(&root),
        Some(json!({ "name": "Ministry of Health", "reports": [] })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let errors = reply.json()["errors"].as_array().unwrap().clone();
    assert!(errors.iter().any(|e| e["field"] == json!("reports")));
}

#[tokio::test]
async fn test_user_requires_existing_mda() {
    let app = test_app().await;
    let root = super_token(&app).await;

    let reply = create_user(&app, &root, "officer", "no-such-mda").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let errors = reply.json()["errors"].as_array().unwrap().clone();
    assert!(errors.iter().any(|e| e["field"] == json!("mdaId")));
}

#[tokio::test]
async fn test_user_update_requires_existing_mda() {
    let app = test_app().await;
    let root = super_token(&app).await;
    let mda_id = create_mda(&app, &root, "Ministry of Health").await;
    let user_id = create_user(&app, &root, "officer", &mda_id).await.json()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let uri = format!("/api/admin/users/{}", user_id);
    let reply = send(
        &app,
        Method::PUT,
        &uri,
        Some(&root),
        Some(json!({ "mdaId": "no-such-mda" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let errors = reply.json()["errors"].as_array().unwrap().clone();
    assert!(errors.iter().any(|e| e["field"] == json!("mdaId")));

    let reply = send(&app, Method::GET, &uri, Some(&root), None).await;
    assert_eq!(reply.json()["mdaId"], json!(mda_id));
}

#[tokio::test]
async fn test_deactivated_user_token_is_403() {
    let app = test_app().await;
    let root = super_token(&app).await;
    let mda_id = create_mda(&app, &root, "Ministry of Health").await;
    let user_id = create_user(&app, &root, "officer", &mda_id).await.json()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let reply = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "officer", "password": "user-pass" })),
    )
    .await;
    let user = reply.json()["token"].as_str().unwrap().to_string();

    let reply = send(&app, Method::GET, "/api/profile", Some(&user), None).await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(
        &app,
        Method::PUT,
        &format!("/api/admin/users/{}", user_id),
        Some(&root),
        Some(json!({ "isActive": false })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(&app, Method::GET, "/api/profile", Some(&user), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.json()["message"], json!("Account is deactivated"));
}

#[tokio::test]
async fn test_unknown_login_matches_wrong_password() {
    let app = test_app().await;
    let unknown = send(
        &app,
        Method::POST,
        "/api/auth/admin/login",
        None,
        Some(json!({ "email": "ghost@mda.gov", "password": SUPER_PASSWORD })),
    )
    .await;
    let wrong = send(
        &app,
        Method::POST,
        "/api/auth/admin/login",
        None,
        Some(json!({ "email": SUPER_EMAIL, "password": "not-it" })),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.json(), wrong.json());
}

#[tokio::test]
async fn test_duplicates_conflict() {
    let app = test_app().await;
    let root = super_token(&app).await;
    let mda_id = create_mda(&app, &root, "Ministry of Health").await;

    let reply = send(
        &app,
        Method::POST,
        "/api/admin/mdas",
        Some(&root),
        Some(json!({
            "name": "ministry of health",
            "reports": [{ "title": "Q1", "url": "https://reports.gov/q1" }]
        })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    assert_eq!(
        create_user(&app, &root, "officer", &mda_id).await.status,
        StatusCode::CREATED
    );
    assert_eq!(
        create_user(&app, &root, "officer", &mda_id).await.status,
        StatusCode::CONFLICT
    );

    create_regular_admin(&app, &root, "ops@mda.gov").await;
    let reply = send(
        &app,
        Method::POST,
        "/api/admin/admins",
        Some(&root),
        Some(json!({ "name": "Copy", "email": "OPS@mda.gov", "password": "admin-pass" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_mda_with_users_cannot_be_deleted() {
    let app = test_app().await;
    let root = super_token(&app).await;
    let mda_id = create_mda(&app, &root, "Ministry of Health").await;
    create_user(&app, &root, "officer", &mda_id).await;

    let uri = format!("/api/admin/mdas/{}", mda_id);
    let reply = send(&app, Method::DELETE, &uri, Some(&root), None).await;
    assert_eq!(reply.status, StatusCode::CONFLICT);

    let reply = send(&app, Method::GET, &uri, Some(&root), None).await;
    assert_eq!(reply.json()["userCount"], json!(1));
}

#[tokio::test]
async fn test_tokens_do_not_cross_namespaces() {
    let app = test_app().await;
    let root = super_token(&app).await;
    let mda_id = create_mda(&app, &root, "Ministry of Health").await;
    create_user(&app, &root, "officer", &mda_id).await;

    let reply = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "officer", "password": "user-pass" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let user = reply.json()["token"].as_str().unwrap().to_string();
    assert_eq!(reply.json()["user"]["mda"]["name"], json!("Ministry of Health"));

    let reply = send(&app, Method::GET, "/api/admin/mdas", Some(&user), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&app, Method::GET, "/api/auth/me", Some(&root), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let reply = send(&app, Method::GET, "/api/auth/me", Some(&user), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.json()["username"], json!("officer"));
    assert!(reply.json().get("passwordHash").is_none());
}

#[tokio::test]
async fn test_user_changes_password() {
    let app = test_app().await;
    let root = super_token(&app).await;
    let mda_id = create_mda(&app, &root, "Ministry of Health").await;
    create_user(&app, &root, "officer", &mda_id).await;
    let login = |password: &'static str| {
        let app = app.clone();
        async move {
            send(
                &app,
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "officer", "password": password })),
            )
            .await
        }
    };
    let token = login("user-pass").await.json()["token"]
        .as_str()
        .unwrap()
        .to_string();

    let reply = send(
        &app,
        Method::PUT,
        "/api/profile/password",
        Some(&token),
        Some(json!({ "currentPassword": "wrong-pass", "newPassword": "fresh-pass" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = send(
        &app,
        Method::PUT,
        "/api/profile/password",
        Some(&token),
        Some(json!({ "currentPassword": "user-pass", "newPassword": "fresh-pass" })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    assert_eq!(login("user-pass").await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(login("fresh-pass").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_export_formats() {
    let app = test_app().await;
    let root = super_token(&app).await;
    create_mda(&app, &root, "Ministry of Health").await;
    let works = create_mda(&app, &root, "Ministry of Works").await;
    let reply = send(
        &app,
        Method::PUT,
        &format!("/api/admin/mdas/{}", works),
        Some(&root),
        Some(json!({ "isActive": false })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = send(
        &app,
        Method::GET,
        "/api/admin/export/mdas?format=csv",
        Some(&root),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.content_type.unwrap().starts_with("text/csv"));
    let csv = String::from_utf8(reply.body).unwrap();
    assert!(csv.contains("Ministry of Health"));
    assert!(csv.contains("Ministry of Works"));

    let reply = send(
        &app,
        Method::GET,
        "/api/admin/export/mdas?format=json&isActive=true",
        Some(&root),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    let rows = reply.json().as_array().unwrap().clone();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], json!("Ministry of Health"));

    let reply = send(
        &app,
        Method::GET,
        "/api/admin/export/mdas?format=xml",
        Some(&root),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

struct FailingSink;

impl ActivitySink for FailingSink {
    fn append(&self, _activity: &Activity) -> Result<(), StoreError> {
        Err(StoreError::Corrupt("audit table unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_request() {
    let state = seeded_state(test_config(), Some(Arc::new(FailingSink))).await;
    let app = create_app(state);
    let root = super_token(&app).await;

    let mda_id = create_mda(&app, &root, "Ministry of Health").await;
    let reply = send(
        &app,
        Method::GET,
        &format!("/api/admin/mdas/{}", mda_id),
        Some(&root),
        None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(activities(&app, &root, "").await.is_empty());
}

#[tokio::test]
async fn test_rate_limit_applies_to_api_only() {
    let mut config = test_config();
    config.rate_limit_max = 3;
    let app = create_app(seeded_state(config, None).await);

    for _ in 0..3 {
        let reply = send(&app, Method::GET, "/api/public/mdas", None, None).await;
        assert_eq!(reply.status, StatusCode::OK);
    }
    let reply = send(&app, Method::GET, "/api/public/mdas", None, None).await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);

    let reply = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
}

/// GET /api/public/mdas from `peer` claiming to be `forwarded_for`
async fn send_forwarded(app: &Router, peer: SocketAddr, forwarded_for: &str) -> StatusCode {
    let mut request = Request::builder()
        .method(Method::GET)
        .uri("/api/public/mdas")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::empty())
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_rate_limit_ignores_rotating_forwarded_for() {
    let mut config = test_config();
    config.rate_limit_max = 2;
    let app = create_app(seeded_state(config, None).await);
    let peer: SocketAddr = "192.0.2.10:50000".parse().unwrap();

    let mut statuses = Vec::new();
    for i in 0..10 {
        statuses.push(send_forwarded(&app, peer, &format!("198.51.100.{}", i)).await);
    }
    assert_eq!(statuses[0], StatusCode::OK);
    assert_eq!(statuses[1], StatusCode::OK);
    assert!(statuses[2..].iter().all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_trusted_proxy_limits_per_forwarded_client() {
    let mut config = test_config();
    config.rate_limit_max = 2;
    config.trust_proxy = true;
    let app = create_app(seeded_state(config, None).await);
    let proxy: SocketAddr = "10.0.0.1:443".parse().unwrap();

    for i in 0..5 {
        let status = send_forwarded(&app, proxy, &format!("198.51.100.{}", i)).await;
        assert_eq!(status, StatusCode::OK);
    }
    for _ in 0..2 {
        let status = send_forwarded(&app, proxy, "203.0.113.5").await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(
        send_forwarded(&app, proxy, "203.0.113.5").await,
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_public_mdas_and_stats() {
    let app = test_app().await;
    let root = super_token(&app).await;
    create_mda(&app, &root, "Ministry of Health").await;

    let reply = send(&app, Method::GET, "/api/public/mdas", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let mdas = reply.json().as_array().unwrap().clone();
    assert_eq!(mdas.len(), 1);
    assert!(mdas[0].get("reports").is_none());

    let reply = send(&app, Method::GET, "/api/admin/stats", Some(&root), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    let stats = reply.json();
    assert_eq!(stats["mdas"]["total"], json!(1));
    assert_eq!(stats["admins"]["total"], json!(1));
    assert_eq!(stats["recentActivities"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_app().await;
    let reply = send(&app, Method::GET, "/api/nope", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert!(reply.json()["message"].is_string());
}
