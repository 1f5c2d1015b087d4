//! Route tests for the REST API.
//!
//! Each test drives the router in-process with `oneshot` over an in-memory
//! SQLite store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use resurface_core::{NewMemo, ReviewService, SqliteStore, UserId};
use resurface_server::{create_server, create_server_with_auth, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn store_with_memos(count: i64) -> Arc<SqliteStore> {
    let store = SqliteStore::in_memory().unwrap();
    for i in 1..=count {
        store
            .create_memo(
                &NewMemo::new(UserId(1), format!("memo {}", i), Utc::now() - Duration::days(i))
                    .with_tags(["journal"]),
            )
            .unwrap();
    }
    Arc::new(store)
}

fn app(store: &Arc<SqliteStore>) -> Router {
    let service =
        ReviewService::new(store.clone(), store.clone(), store.clone()).with_rng_seed(42);
    create_server(AppState::new(service))
}

fn request(method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("X-User-Id", user);
    }
    match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app(&store_with_memos(0));
    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_user_is_unauthorized() {
    let app = app(&store_with_memos(1));
    let (status, body) = send(&app, request(Method::GET, "/api/v1/review/memos", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_001");

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/review/memos", Some("abc"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_002");
}

#[tokio::test]
async fn test_review_flow() {
    let store = store_with_memos(12);
    let app = app(&store);

    let (status, first) = send(
        &app,
        request(Method::GET, "/api/v1/review/memos", Some("1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["totalCount"], 12);
    assert_eq!(first["completed"], false);
    let memos = first["memos"].as_array().unwrap();
    assert_eq!(memos.len(), 10);
    assert!(memos[0]["name"].as_str().unwrap().starts_with("memos/"));

    let (_, again) = send(
        &app,
        request(Method::GET, "/api/v1/review/memos?force=false", Some("1"), None),
    )
    .await;
    assert_eq!(again["memos"], first["memos"]);

    let names: Vec<Value> = memos.iter().map(|m| m["name"].clone()).collect();
    let (status, recorded) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/review/records",
            Some("1"),
            Some(json!({ "memoNames": names, "source": "REVIEW" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recorded["recordedCount"], 10);
    assert!(recorded["sessionId"].as_i64().unwrap() > 0);

    let (_, after) = send(
        &app,
        request(Method::GET, "/api/v1/review/memos", Some("1"), None),
    )
    .await;
    assert_eq!(after["completed"], true);

    let (_, stats) = send(
        &app,
        request(Method::GET, "/api/v1/review/stats", Some("1"), None),
    )
    .await;
    assert_eq!(stats["totalMemos"], 12);
    assert_eq!(stats["reviewedLast30Days"], 10);
    assert_eq!(stats["availableForReview"], 2);
    assert_eq!(stats["totalSessions"], 1);

    let (_, sessions) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/review/sessions?source=REVIEW&limit=5",
            Some("1"),
            None,
        ),
    )
    .await;
    assert_eq!(sessions["sessions"].as_array().unwrap().len(), 1);
    assert_eq!(sessions["sessions"][0]["memoCount"], 10);
}

#[tokio::test]
async fn test_record_review_with_bad_names() {
    let app = app(&store_with_memos(1));
    let (status, recorded) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/review/records",
            Some("1"),
            Some(json!({ "memoNames": ["memos/1", "garbage"], "source": "SURPRISE" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(recorded["recordedCount"], 1);
}

#[tokio::test]
async fn test_settings_round_trip_and_validation() {
    let app = app(&store_with_memos(0));

    let (_, defaults) = send(
        &app,
        request(Method::GET, "/api/v1/review/settings", Some("1"), None),
    )
    .await;
    assert_eq!(defaults["sessionSize"], 10);

    let (status, saved) = send(
        &app,
        request(
            Method::PUT,
            "/api/v1/review/settings",
            Some("1"),
            Some(json!({ "sessionSize": 4, "excludeTags": ["private"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["sessionSize"], 4);
    assert_eq!(saved["excludeTags"], json!(["private"]));

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/api/v1/review/settings",
            Some("1"),
            Some(json!({ "sessionSize": 500 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["details"]["suggestion"].is_string());
}

#[tokio::test]
async fn test_random_and_time_travel_not_found_without_memos() {
    let app = app(&store_with_memos(0));

    let (status, _) = send(
        &app,
        request(Method::GET, "/api/v1/memos/random", Some("1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/memos/time-travel", Some("1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NF_002");
}

#[tokio::test]
async fn test_time_travel_short_history() {
    let app = app(&store_with_memos(3));
    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/memos/time-travel?pageSize=2",
            Some("1"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 3);
    assert_eq!(body["memos"].as_array().unwrap().len(), 2);
    assert!(body["periodStart"].is_string());
}

#[tokio::test]
async fn test_on_this_day_and_random_pick() {
    let app = app(&store_with_memos(3));

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/memos/on-this-day", Some("1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalCount"], 0);

    let (status, memo) = send(
        &app,
        request(Method::GET, "/api/v1/memos/random", Some("1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(memo["tags"], json!(["journal"]));

    // Other users see nothing.
    let (status, _) = send(
        &app,
        request(Method::GET, "/api/v1/memos/random", Some("2"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let store = store_with_memos(1);
    let service = ReviewService::new(store.clone(), store.clone(), store).with_rng_seed(1);
    let app = create_server_with_auth(AppState::new(service), "secret");

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/review/stats", Some("1"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let req = Request::builder()
        .uri("/api/v1/review/stats")
        .header("X-User-Id", "1")
        .header("Authorization", "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
}
