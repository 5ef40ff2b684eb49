//! Router and middleware behavior that needs no database

mod helpers;

use axum::http::{header, Method, Request, StatusCode};
use axum::body::Body;
use tower::ServiceExt;
use helpers::*;

#[tokio::test]
async fn test_health_reports_database_outage() {
    let app = offline_app(test_settings());

    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["database_healthy"], false);
    assert_eq!(body["wordcloud_subscribers"], 0);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = offline_app(test_settings());

    let (status, body) = send(&app, request(Method::GET, "/api/users/me", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_malformed_bearer_is_rejected_on_public_route() {
    let app = offline_app(test_settings());

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/announcements/published", Some("not-a-jwt"), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn sample_user() -> SportsHub::models::User {
    let now = chrono::Utc::now();
    SportsHub::models::User {
        id: 7,
        username: "mallory".to_string(),
        email: String::new(),
        password_hash: String::new(),
        real_name: String::new(),
        phone: String::new(),
        user_type: SportsHub::models::UserType::Admin,
        gender: None,
        birth_date: None,
        id_card: String::new(),
        emergency_contact: String::new(),
        emergency_phone: String::new(),
        organization: String::new(),
        bio: String::new(),
        avatar: String::new(),
        is_verified: true,
        is_active: true,
        is_superuser: true,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    use SportsHub::services::AuthService;

    let mut foreign = test_settings();
    foreign.auth.jwt_secret = "someone-elses-secret".to_string();
    let tokens = AuthService::new(&foreign.auth).issue_pair(&sample_user()).expect("tokens");

    let app = offline_app(test_settings());
    let (status, _) = send(&app, request(Method::GET, "/api/users/me", Some(&tokens.access), None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stale_bearer_does_not_block_token_endpoints() {
    use SportsHub::services::AuthService;

    let settings = test_settings();
    let tokens = AuthService::new(&settings.auth).issue_pair(&sample_user()).expect("tokens");
    let app = offline_app(settings);

    let (status, claims) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/verify",
            Some("expired.access.token"),
            Some(serde_json::json!({ "token": tokens.refresh })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", claims);
    assert_eq!(claims["username"], "mallory");

    // login gets past the header and fails later on the missing database
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/login",
            Some("expired.access.token"),
            Some(serde_json::json!({ "username": "mallory", "password": "whatever-1" })),
        ),
    )
    .await;
    assert_ne!(status, StatusCode::UNAUTHORIZED);

    // logout still needs a valid session
    let (status, _) = send(&app, request(Method::POST, "/api/auth/logout", Some("expired.access.token"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = offline_app(test_settings());

    let (status, _) = send(&app, request(Method::GET, "/api/nothing-here", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rate_limit_returns_retry_after() {
    let mut settings = test_settings();
    settings.rate_limit.enabled = true;
    settings.rate_limit.requests_per_minute = 2;
    settings.rate_limit.burst = 2;
    let app = offline_app(settings);

    for _ in 0..2 {
        let (status, _) = send(&app, request(Method::GET, "/api/users/me", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/api/users/me", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("retry-after header");
    assert!(retry_after >= 1);
}

#[tokio::test]
async fn test_rate_limit_keys_forwarded_clients_separately() {
    let mut settings = test_settings();
    settings.rate_limit.enabled = true;
    settings.rate_limit.requests_per_minute = 1;
    settings.rate_limit.burst = 1;
    let app = offline_app(settings);

    let from = |ip: &str| {
        Request::builder()
            .uri("/api/users/me")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .expect("request")
    };

    let (first, _) = send(&app, from("10.0.0.1")).await;
    let (second, _) = send(&app, from("10.0.0.2")).await;
    let (repeat, _) = send(&app, from("10.0.0.1")).await;

    assert_eq!(first, StatusCode::UNAUTHORIZED);
    assert_eq!(second, StatusCode::UNAUTHORIZED);
    assert_eq!(repeat, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin_by_default() {
    let app = offline_app(test_settings());

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/events")
                .header(header::ORIGIN, "https://sports.example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_wordcloud_socket_requires_token() {
    let app = offline_app(test_settings());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ws/comments/wordcloud/")
                .header(header::CONNECTION, "upgrade")
                .header(header::UPGRADE, "websocket")
                .header(header::SEC_WEBSOCKET_VERSION, "13")
                .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_ne!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert!(response.status().is_client_error());
}
