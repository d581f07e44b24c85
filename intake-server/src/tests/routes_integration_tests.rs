use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use super::test_utils::{body_json, get_request, json_request, test_app};

#[tokio::test]
async fn health_reports_mailbox_and_pause_state() {
    let (app, _state, _dir) = test_app().await;

    let response = app.oneshot(get_request("/health")).await.unwrap();
    let body = body_json(response).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["paused"], false);
    assert_eq!(body["mailboxes"][0]["mailbox"], "inbox");
}

#[tokio::test]
async fn override_then_capacity_round_trips() {
    let (app, _state, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/override", json!({"2026-01-23": 9000.0})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let response = app.oneshot(get_request("/api/override")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["2026-01-23"], 9000.0);
}

#[tokio::test]
async fn override_rejects_negative_capacity_without_mutating_state() {
    let (app, _state, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/override", json!({"2026-01-23": -5.0})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.oneshot(get_request("/api/override")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body.as_object().unwrap().len(), 0);
}

#[tokio::test]
async fn adjust_then_capacity_for_date_reflects_remaining() {
    let (app, _state, _dir) = test_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/adjust",
            json!({"date": "2026-01-23", "amount": 2000.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("/api/capacity/2026-01-23")).await.unwrap();
    let body = body_json(response).await;
    // c_default 5000 minus the 2000 adjustment.
    assert_eq!(body["remaining"], 3000.0);
}

#[tokio::test]
async fn release_malformed_body_is_rejected() {
    let (app, _state, _dir) = test_app().await;

    let response = app
        .oneshot(json_request("POST", "/api/release", json!({"not": "an array"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tasks_summary_starts_empty() {
    let (app, _state, _dir) = test_app().await;

    let response = app.oneshot(get_request("/api/tasks")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["summary"]["accepted_count"], 0);
    assert_eq!(body["summary"]["on_hold_count"], 0);
}

#[tokio::test]
async fn cleanup_reports_zero_when_nothing_to_prune() {
    let (app, _state, _dir) = test_app().await;

    let response = app.oneshot(json_request("POST", "/api/cleanup", json!({}))).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["deleted"], 0);
    assert_eq!(body["tasksRemoved"], 0);
}
