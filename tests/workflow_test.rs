//! End-to-end flows against a real PostgreSQL database
//!
//! Set `TEST_DATABASE_URL` to run these; each test starts from empty tables.

mod helpers;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use serial_test::serial;
use helpers::*;

macro_rules! app_or_skip {
    () => {
        match database_app().await {
            Some(app) => app,
            None => {
                eprintln!("TEST_DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

fn open_event(title: &str, max_participants: i32) -> Value {
    let now = Utc::now();
    json!({
        "title": title,
        "event_type": "running",
        "status": "published",
        "location": "City Stadium",
        "start_time": now + Duration::days(10),
        "end_time": now + Duration::days(11),
        "registration_start": now - Duration::days(1),
        "registration_end": now + Duration::days(5),
        "max_participants": max_participants,
    })
}

async fn create_event(app: &axum::Router, admin: &str, body: Value) -> i64 {
    let (status, event) = send(app, request(Method::POST, "/api/events", Some(admin), Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "create event failed: {}", event);
    event["id"].as_i64().expect("event id")
}

#[tokio::test]
#[serial]
async fn test_register_login_and_profile() {
    let app = app_or_skip!();
    let (username, token) = register_athlete(&app).await;

    let (status, me) = send(&app, request(Method::GET, "/api/users/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], username.as_str());
    assert_eq!(me["user_type"], "athlete");
    assert!(me.get("password_hash").is_none());

    let (status, _) = send(&app, request(Method::GET, "/api/users", Some(&token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": "wrong-password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[serial]
async fn test_registration_review_keeps_counter() {
    let app = app_or_skip!();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, athlete) = register_athlete(&app).await;

    let event_id = create_event(&app, &admin, open_event("Spring 10K", 1)).await;

    let (status, registration) = send(
        &app,
        request(
            Method::POST,
            "/api/registrations",
            Some(&athlete),
            Some(json!({ "event": event_id, "participant_name": "Runner One" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", registration);
    assert_eq!(registration["status"], "pending");
    let registration_id = registration["id"].as_i64().expect("registration id");

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/registrations", Some(&athlete), Some(json!({ "event": event_id }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, event) = send(&app, request(Method::GET, &format!("/api/events/{}", event_id), None, None)).await;
    assert_eq!(event["current_participants"], 1);

    let (_, other) = register_athlete(&app).await;
    let (status, _) = send(
        &app,
        request(Method::POST, "/api/registrations", Some(&other), Some(json!({ "event": event_id }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "event with one seat should be full");

    let approve = format!("/api/registrations/{}/approve", registration_id);
    let (status, approved) = send(
        &app,
        request(Method::PUT, &approve, Some(&admin), Some(json!({ "review_remarks": "ok" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, _) = send(&app, request(Method::PUT, &approve, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, event) = send(&app, request(Method::GET, &format!("/api/events/{}", event_id), None, None)).await;
    assert_eq!(event["current_participants"], 1);
}

#[tokio::test]
#[serial]
async fn test_comments_and_likes_on_event() {
    let app = app_or_skip!();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, athlete) = register_athlete(&app).await;
    let event_id = create_event(&app, &admin, open_event("Harbour Swim", 0)).await;

    let target = json!({ "target_type": "events.event", "target_id": event_id });
    let (status, _) = send(&app, request(Method::POST, "/api/interactions/likes", Some(&athlete), Some(target.clone()))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, request(Method::POST, "/api/interactions/likes", Some(&athlete), Some(target))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let check = format!("/api/interactions/likes/check?target_type=event&target_id={}", event_id);
    let (_, liked) = send(&app, request(Method::GET, &check, Some(&athlete), None)).await;
    assert_eq!(liked["liked"], true);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/interactions/likes",
            Some(&athlete),
            Some(json!({ "target_type": "event", "target_id": 999_999 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, comment) = send(
        &app,
        request(
            Method::POST,
            "/api/interactions/comments",
            Some(&athlete),
            Some(json!({ "target_type": "event", "target_id": event_id, "content": "精彩的比赛" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", comment);
    let comment_id = comment["id"].as_i64().expect("comment id");

    let (status, liked) = send(
        &app,
        request(Method::POST, &format!("/api/interactions/comments/{}/like", comment_id), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liked["like_count"], 1);

    let (status, _) = send(
        &app,
        request(Method::PUT, &format!("/api/interactions/comments/{}/reject", comment_id), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request(Method::GET, &format!("/api/interactions/comments/{}", comment_id), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_feedback_is_private_until_replied() {
    let app = app_or_skip!();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, author) = register_athlete(&app).await;
    let (_, stranger) = register_athlete(&app).await;

    let (status, feedback) = send(
        &app,
        request(
            Method::POST,
            "/api/feedbacks",
            Some(&author),
            Some(json!({ "feedback_type": "bug", "title": "Timer", "content": "Lap times missing" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let path = format!("/api/feedbacks/{}", feedback["id"].as_i64().expect("feedback id"));

    let (status, _) = send(&app, request(Method::GET, &path, Some(&stranger), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, replied) = send(
        &app,
        request(Method::POST, &format!("{}/reply", path), Some(&admin), Some(json!({ "reply": "  Fixed  " }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replied["status"], "resolved");
    assert_eq!(replied["reply"], "Fixed");

    let (_, stats) = send(&app, request(Method::GET, "/api/feedbacks/statistics", Some(&admin), None)).await;
    assert_eq!(stats["total"], 1);
}

/// Register `token` for the event under `participant_name` and approve it
async fn approved_entry(app: &axum::Router, admin: &str, token: &str, event_id: i64, participant_name: &str) -> i64 {
    let (status, registration) = send(
        app,
        request(
            Method::POST,
            "/api/registrations",
            Some(token),
            Some(json!({ "event": event_id, "participant_name": participant_name })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", registration);
    let id = registration["id"].as_i64().expect("registration id");

    let (status, _) = send(
        app,
        request(Method::PUT, &format!("/api/registrations/{}/approve", id), Some(admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    id
}

fn results_sheet(rows: &[[&str; 5]]) -> Vec<u8> {
    use SportsHub::services::spreadsheet::Sheet;

    let mut sheet = Sheet::new(vec!["赛事名称", "参赛者", "轮次", "成绩", "排名"]);
    for row in rows {
        sheet.push(row.iter().map(|cell| cell.to_string()).collect());
    }
    sheet.to_xlsx().expect("xlsx")
}

#[tokio::test]
#[serial]
async fn test_result_import_commits_only_imported_rows() {
    let app = app_or_skip!();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, athlete) = register_athlete(&app).await;
    let event_id = create_event(&app, &admin, open_event("Autumn Relay", 0)).await;
    approved_entry(&app, &admin, &athlete, event_id, "Runner One").await;

    let upload = |rows: Vec<[&'static str; 5]>| {
        upload_request("/api/results/import", &admin, "file", "results.xlsx", &results_sheet(&rows), &[])
    };
    let list = format!("/api/results?event={}", event_id);
    let count_results = || request(Method::GET, &list, Some(&admin), None);

    // nothing matches: 400 and no row survives
    let (status, summary) = send(&app, upload(vec![["Autumn Relay", "Nobody", "决赛", "10.5", "1"]])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", summary);
    assert_eq!(summary["imported"], 0);
    assert_eq!(summary["errors"][0]["row"], 2);
    let (_, page) = send(&app, count_results()).await;
    assert_eq!(page["count"], 0);

    // partial success: 200 with the failing row reported
    let (status, summary) = send(
        &app,
        upload(vec![
            ["Autumn Relay", "Runner One", "决赛", "10.5", "1"],
            ["Unknown Cup", "Runner One", "决赛", "11.0", "2"],
        ]),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", summary);
    assert_eq!(summary["imported"], 1);
    assert_eq!(summary["errors"].as_array().map(Vec::len), Some(1));

    // every row lands: 201
    let (status, summary) = send(&app, upload(vec![["Autumn Relay", "Runner One", "半决赛", "10.9", "3"]])).await;
    assert_eq!(status, StatusCode::CREATED, "{}", summary);

    let (_, page) = send(&app, count_results()).await;
    assert_eq!(page["count"], 2);
}

#[tokio::test]
#[serial]
async fn test_leaderboard_and_bulk_result_actions() {
    let app = app_or_skip!();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let event_id = create_event(&app, &admin, open_event("Lake Sprint", 0)).await;

    let mut result_ids = Vec::new();
    for (name, rank) in [("Slower", 2), ("Faster", 1)] {
        let (_, athlete) = register_athlete(&app).await;
        let registration = approved_entry(&app, &admin, &athlete, event_id, name).await;
        let body = json!({
            "event": event_id,
            "registration": registration,
            "round_type": "final",
            "score": format!("{}.0", 10 + rank),
            "rank": rank,
        });
        let (status, result) = send(&app, request(Method::POST, "/api/results", Some(&admin), Some(body.clone()))).await;
        assert_eq!(status, StatusCode::CREATED, "{}", result);
        result_ids.push(result["id"].as_i64().expect("result id"));

        let (status, _) = send(&app, request(Method::POST, "/api/results", Some(&admin), Some(body))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    let board = format!("/api/results/leaderboard?event={}&round_type=final", event_id);
    let (_, leaders) = send(&app, request(Method::GET, &board, None, None)).await;
    assert_eq!(leaders.as_array().map(Vec::len), Some(0), "unpublished results stay off the board");

    let (status, outcome) = send(
        &app,
        request(Method::POST, "/api/results/bulk_publish", Some(&admin), Some(json!({ "ids": result_ids }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["affected"], 2);

    let (_, leaders) = send(&app, request(Method::GET, &board, None, None)).await;
    assert_eq!(leaders[0]["participant_name"], "Faster");
    assert_eq!(leaders[1]["rank"], 2);

    let (status, outcome) = send(
        &app,
        request(Method::POST, "/api/results/bulk_delete", Some(&admin), Some(json!({ "ids": result_ids }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["affected"], 2);

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/results/bulk_delete", Some(&admin), Some(json!({ "ids": result_ids }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn test_referee_records_results_only_for_granted_events() {
    let app = app_or_skip!();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let referee = register_as(&app, "referee").await;
    let (_, athlete) = register_athlete(&app).await;

    let granted = create_event(&app, &admin, open_event("Granted Meet", 0)).await;
    let other = create_event(&app, &admin, open_event("Other Meet", 0)).await;
    let granted_entry = approved_entry(&app, &admin, &athlete, granted, "Runner One").await;
    let other_entry = approved_entry(&app, &admin, &athlete, other, "Runner One").await;

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/events/referee_access/assign",
            Some(&admin),
            Some(json!({ "referee": referee.id, "event_ids": [granted] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, mine) = send(&app, request(Method::GET, "/api/events/referee_access/my_events", Some(&referee.token), None)).await;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
    assert_eq!(mine[0]["id"], granted);

    let result = |event: i64, registration: i64| {
        json!({ "event": event, "registration": registration, "round_type": "final", "score": "9.9" })
    };
    let (status, _) = send(&app, request(Method::POST, "/api/results", Some(&referee.token), Some(result(other, other_entry)))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, request(Method::POST, "/api/results", Some(&referee.token), Some(result(granted, granted_entry)))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
#[serial]
async fn test_finished_filter_follows_display_status() {
    let app = app_or_skip!();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let now = Utc::now();

    let past = json!({
        "title": "Last Winter Cross",
        "event_type": "running",
        "status": "published",
        "location": "Hill Park",
        "start_time": now - Duration::days(3),
        "end_time": now - Duration::days(2),
        "registration_start": now - Duration::days(10),
        "registration_end": now - Duration::days(4),
    });
    let past_id = create_event(&app, &admin, past).await;
    create_event(&app, &admin, open_event("Next Spring Cross", 0)).await;

    let (status, page) = send(&app, request(Method::GET, "/api/events?status=finished", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["id"], past_id);
    assert_eq!(page["results"][0]["status"], "published");
    assert_eq!(page["results"][0]["display_status"], "finished");

    let (status, page) = send(&app, request(Method::GET, "/api/events?page=9223372036854775807", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 2);
    assert_eq!(page["results"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
#[serial]
async fn test_announcement_visibility_follows_publishing() {
    let app = app_or_skip!();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, athlete) = register_athlete(&app).await;

    let draft = json!({ "title": "Course change", "content": "The 10K loop moves to the river path" });
    let (status, _) = send(&app, request(Method::POST, "/api/announcements", Some(&athlete), Some(draft.clone()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(&app, request(Method::POST, "/api/announcements", Some(&admin), Some(draft))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    let path = format!("/api/announcements/{}", created["id"].as_i64().expect("announcement id"));

    let (status, _) = send(&app, request(Method::GET, &path, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, published) = send(&app, request(Method::GET, "/api/announcements/published", None, None)).await;
    assert_eq!(published.as_array().map(Vec::len), Some(0));

    let (status, _) = send(&app, request(Method::PUT, &format!("{}/publish", path), Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, request(Method::PUT, &format!("{}/pin", path), Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, shown) = send(&app, request(Method::GET, &path, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["view_count"], 1);
    let (_, pinned) = send(&app, request(Method::GET, "/api/announcements/pinned", None, None)).await;
    assert_eq!(pinned[0]["title"], "Course change");

    let (status, _) = send(&app, request(Method::DELETE, &path, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, request(Method::GET, &path, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_carousel_slides_and_clicks() {
    let app = app_or_skip!();
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/carousels",
            Some(&admin),
            Some(json!({ "title": "Bad link", "image": "/media/a.png", "link_url": "ftp://example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, slide) = send(
        &app,
        request(
            Method::POST,
            "/api/carousels",
            Some(&admin),
            Some(json!({
                "title": "Marathon week",
                "image": "/media/marathon.png",
                "link_url": "https://example.com/marathon",
                "position": "home",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", slide);
    let path = format!("/api/carousels/{}", slide["id"].as_i64().expect("slide id"));

    let (_, home) = send(&app, request(Method::GET, "/api/carousels/by_position?position=home", None, None)).await;
    assert_eq!(home[0]["title"], "Marathon week");
    let (_, clicked) = send(&app, request(Method::POST, &format!("{}/click", path), None, None)).await;
    assert_eq!(clicked["click_count"], 1);

    let (status, _) = send(&app, request(Method::PUT, &format!("{}/deactivate", path), Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, active) = send(&app, request(Method::GET, "/api/carousels/active", None, None)).await;
    assert_eq!(active.as_array().map(Vec::len), Some(0));
    let (status, _) = send(&app, request(Method::GET, &path, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn test_new_comment_reaches_wordcloud_viewers() {
    let Some((app, state)) = database_env().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let admin = login(&app, ADMIN_USERNAME, ADMIN_PASSWORD).await;
    let (_, athlete) = register_athlete(&app).await;
    let event_id = create_event(&app, &admin, open_event("Night Run", 0)).await;

    let broadcaster = state.services.wordcloud.clone();
    let _task = broadcaster.start();
    let mut viewer = broadcaster.subscribe();

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/interactions/comments",
            Some(&athlete),
            Some(json!({ "target_type": "event", "target_id": event_id, "content": "北京的场地很好，裁判和冠军都很专业" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    tokio::time::timeout(std::time::Duration::from_secs(10), viewer.changed())
        .await
        .expect("snapshot broadcast after comment")
        .expect("broadcaster alive");
    let pushed = viewer.borrow_and_update().clone();
    assert!(!pushed.is_empty());

    let (status, cloud) = send(&app, request(Method::GET, "/api/interactions/comments/wordcloud", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cloud[0]["text"], pushed[0].text.as_str());
}

#[tokio::test]
#[serial]
async fn test_bootstrap_skips_taken_username() {
    let Some(state) = database_state().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let regular: SportsHub::models::user::RegisterUserRequest = serde_json::from_value(json!({
        "username": ADMIN_USERNAME,
        "password": TEST_PASSWORD,
        "password_confirm": TEST_PASSWORD,
    }))
    .expect("request");
    let user = state.services.users.register(regular).await.expect("register");

    let outcome = state.services.users.bootstrap_admin(&state.settings.bootstrap).await;
    assert!(matches!(outcome, Ok(None)), "{:?}", outcome.map(|u| u.map(|u| u.id)));
    assert!(!state.services.users.get(user.id).await.expect("user").is_superuser);

    let mut other = state.settings.bootstrap.clone();
    other.admin_username = "root".to_string();
    let created = state.services.users.bootstrap_admin(&other).await.expect("bootstrap");
    assert!(created.is_some_and(|admin| admin.is_superuser));
}
