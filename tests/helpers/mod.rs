//! Test helpers
//!
//! Builds application state against an unreachable database for routing and
//! middleware tests, or against `TEST_DATABASE_URL` for end-to-end flows.

#![allow(dead_code)]

use std::time::Duration;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use SportsHub::{
    config::Settings,
    database::{create_lazy_pool, create_pool, run_migrations, DatabaseConfig, DatabasePool, DatabaseService},
    services::{AuthService, RedisService, ServiceFactory},
    state::AppState,
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password-1";
pub const TEST_PASSWORD: &str = "athlete-password-1";

const TABLES: &str = "comments, favorites, likes, feedback, carousels, announcements, results, registrations, \
                      referee_event_access, event_assignments, events, users";

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.redis.url = "redis://127.0.0.1:1".to_string();
    settings.auth.jwt_secret = "integration-test-secret".to_string();
    settings.logging.directory = String::new();
    settings
}

fn build_state(settings: Settings, pool: DatabasePool) -> AppState {
    let db = DatabaseService::new(pool);
    let redis = RedisService::new(&settings.redis).expect("redis client");
    let auth = AuthService::new(&settings.auth).with_hash_cost(4);
    let services = ServiceFactory::with_parts(&settings, db, redis, auth);
    AppState::new(settings, services)
}

/// State whose database never answers
pub fn offline_state(settings: Settings) -> AppState {
    let pool = create_lazy_pool(&DatabaseConfig {
        url: "postgresql://nobody@127.0.0.1:1/none".to_string(),
        acquire_timeout: Duration::from_secs(1),
        ..Default::default()
    })
    .expect("lazy pool");
    build_state(settings, pool)
}

pub fn offline_app(settings: Settings) -> Router {
    SportsHub::handlers::router(offline_state(settings))
}

/// Fresh migrated database without any account, or `None` when
/// `TEST_DATABASE_URL` is not set
pub async fn database_state() -> Option<AppState> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let mut settings = test_settings();
    settings.database.url = url;
    settings.bootstrap.admin_username = ADMIN_USERNAME.to_string();
    settings.bootstrap.admin_password = Some(ADMIN_PASSWORD.to_string());
    settings.rate_limit.enabled = false;
    settings.wordcloud.debounce_ms = 50;

    let pool = create_pool(&DatabaseConfig::from(&settings.database)).await.expect("connect");
    run_migrations(&pool).await.expect("migrate");
    sqlx::query(&format!("TRUNCATE {} RESTART IDENTITY CASCADE", TABLES))
        .execute(&pool)
        .await
        .expect("truncate");

    Some(build_state(settings, pool))
}

/// Router and state over a fresh database with the bootstrap admin
pub async fn database_env() -> Option<(Router, AppState)> {
    let state = database_state().await?;
    state
        .services
        .users
        .bootstrap_admin(&state.settings.bootstrap)
        .await
        .expect("bootstrap admin");

    Some((SportsHub::handlers::router(state.clone()), state))
}

pub async fn database_app() -> Option<Router> {
    database_env().await.map(|(app, _)| app)
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

/// Run one request and decode the JSON body (`Null` when empty)
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("infallible router");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

pub async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "username": username, "password": password })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["access"].as_str().expect("access token").to_string()
}

/// A freshly registered account
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub token: String,
}

/// Register an account of the given type with a generated name and log in
pub async fn register_as(app: &Router, user_type: &str) -> Account {
    use fake::{faker::name::en::Name, Fake};

    let suffix: u32 = (100_000..999_999).fake();
    let username = format!("{}_{}", user_type, suffix);
    let real_name: String = Name().fake();

    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/users/register",
            None,
            Some(serde_json::json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": TEST_PASSWORD,
                "password_confirm": TEST_PASSWORD,
                "real_name": real_name,
                "user_type": user_type,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    let token = login(app, &username, TEST_PASSWORD).await;
    Account {
        id: body["id"].as_i64().expect("user id"),
        username,
        token,
    }
}

/// Register an athlete and return its username and access token
pub async fn register_athlete(app: &Router) -> (String, String) {
    let account = register_as(app, "athlete").await;
    (account.username, account.token)
}

/// Multipart upload with one file part and optional text fields
pub fn upload_request(
    uri: &str,
    token: &str,
    file_field: &str,
    filename: &str,
    bytes: &[u8],
    fields: &[(&str, &str)],
) -> Request<Body> {
    const BOUNDARY: &str = "sportshub-test-boundary";

    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{file_field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .expect("request")
}
