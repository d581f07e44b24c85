//! The operator REST surface (§6) plus the ambient `/health` and `/ping`
//! endpoints every deployable service in this lineage carries (§10.3).
//! Every mutating handler ends with a `broadcast` call on success, per
//! §4.E; validation failures are 400s with no broadcast, unexpected
//! failures are 500s with no broadcast.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use intake_model::ledger::AllocationEntry;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::app_state::AppState;
use crate::dashboard::DashboardEvent;
use crate::dashboard::websocket_handler;
use crate::errors::{AppError, AppResult};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ping", get(ping_handler))
        .route("/ws", get(websocket_handler))
        .route("/api/override", get(get_override).post(post_override))
        .route("/api/capacity", get(get_capacity))
        .route("/api/capacity/{date}", get(get_capacity_for_date))
        .route("/api/capacity/reset", post(reset_capacity))
        .route("/api/capacity/sync", post(sync_capacity))
        .route("/api/release", post(release_plan))
        .route("/api/adjust", post(adjust_capacity))
        .route("/api/tasks", get(get_tasks))
        .route("/api/tasks/refresh", post(refresh_tasks))
        .route("/api/cleanup", post(cleanup))
}

async fn ping_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let statuses = state.fleet.statuses().await;
    let mailboxes: Vec<Value> = statuses
        .into_iter()
        .map(|(mailbox, listener_state)| json!({ "mailbox": mailbox, "state": format!("{listener_state:?}") }))
        .collect();

    Json(json!({
        "status": "healthy",
        "uptime_seconds": (chrono::Utc::now() - state.started_at).num_seconds(),
        "paused": state.fleet.is_paused(),
        "dashboard_clients": state.bus.client_count(),
        "mailboxes": mailboxes,
        "config": {
            "data_dir": state.config.data_dir,
            "config_path": state.config.metadata.config_path,
            "config_file_present": state.config.metadata.config_file_present,
        },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn get_override(State(state): State<AppState>) -> Json<HashMap<NaiveDate, f64>> {
    Json(state.ledger.override_snapshot().await.into_iter().collect())
}

async fn post_override(
    State(state): State<AppState>,
    Json(body): Json<HashMap<NaiveDate, f64>>,
) -> AppResult<Json<Value>> {
    if body.is_empty() {
        return Err(AppError::bad_request("override body must name at least one date"));
    }
    for (date, capacity) in &body {
        if *capacity < 0.0 {
            return Err(AppError::bad_request(format!("override for {date} must be non-negative")));
        }
    }

    for (date, capacity) in &body {
        state.ledger.set_override(*date, *capacity).await;
        state.bus.broadcast(DashboardEvent::CapacityUpdated { date: *date });
    }

    Ok(Json(json!({ "success": true })))
}

async fn get_capacity(State(state): State<AppState>) -> Json<HashMap<NaiveDate, f64>> {
    Json(state.ledger.capacity_snapshot().await.into_iter().collect())
}

async fn get_capacity_for_date(State(state): State<AppState>, Path(date): Path<NaiveDate>) -> Json<Value> {
    Json(json!({ "remaining": state.ledger.remaining_on(date).await }))
}

async fn reset_capacity(State(state): State<AppState>) -> Json<Value> {
    state.ledger.reset().await;
    Json(json!({ "success": true }))
}

async fn sync_capacity(State(state): State<AppState>) -> Json<Value> {
    let report = state.ledger.sync_with_tasks().await;
    for date in report.after.keys() {
        state.bus.broadcast(DashboardEvent::CapacityUpdated { date: *date });
    }
    Json(json!({
        "success": true,
        "after": report.after.iter().map(|(d, v)| (d.to_string(), *v)).collect::<HashMap<_, _>>(),
        "diff": report.diff,
        "deletedOverrides": report.deleted_overrides,
    }))
}

async fn release_plan(State(state): State<AppState>, body: Json<Value>) -> AppResult<Json<Value>> {
    let plan: Vec<AllocationEntry> = serde_json::from_value(body.0)
        .map_err(|err| AppError::bad_request(format!("release body must be an allocation plan array: {err}")))?;

    state.ledger.release(&plan).await;
    for entry in &plan {
        state.bus.broadcast(DashboardEvent::CapacityUpdated { date: entry.date });
    }
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
struct AdjustRequest {
    date: NaiveDate,
    amount: f64,
}

async fn adjust_capacity(State(state): State<AppState>, Json(body): Json<AdjustRequest>) -> Json<Value> {
    state.ledger.adjust(body.date, body.amount).await;
    state.bus.broadcast(DashboardEvent::CapacityUpdated { date: body.date });
    Json(json!({ "success": true }))
}

#[derive(Debug, Serialize)]
struct TasksSummary {
    accepted_count: usize,
    on_hold_count: usize,
    total_words: f64,
}

async fn get_tasks(State(state): State<AppState>) -> Json<Value> {
    let tasks = state.ledger.tasks_snapshot().await;
    let on_hold = state.on_hold.snapshot().await;
    let summary = TasksSummary {
        accepted_count: tasks.len(),
        on_hold_count: on_hold.len(),
        total_words: tasks.iter().map(|task| task.amount_words).sum(),
    };

    Json(json!({
        "tasks": tasks,
        "onHold": on_hold,
        "summary": summary,
        "lastUpdated": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn refresh_tasks(State(state): State<AppState>) -> Json<Value> {
    let report = state.ledger.sync_with_tasks().await;
    for date in report.after.keys() {
        state.bus.broadcast(DashboardEvent::CapacityUpdated { date: *date });
    }
    crate::dashboard::ws::publish_update_status(&state).await;

    Json(json!({
        "success": true,
        "after": report.after.iter().map(|(d, v)| (d.to_string(), *v)).collect::<HashMap<_, _>>(),
        "diff": report.diff,
        "deletedOverrides": report.deleted_overrides,
    }))
}

#[derive(Debug, Deserialize, Default)]
struct CleanupRequest {
    #[serde(default)]
    dates: Option<Vec<NaiveDate>>,
}

async fn cleanup(State(state): State<AppState>, body: Option<Json<CleanupRequest>>) -> Json<Value> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let today = chrono::Utc::now().date_naive();
    let extra_dates = request.dates.unwrap_or_default();
    let report = state.ledger.prune_before(today, &extra_dates).await;

    state.bus.broadcast(DashboardEvent::QueueUpdated);

    Json(json!({
        "deleted": report.capacity_entries_removed + report.override_entries_removed,
        "allocationsRemoved": report.allocations_removed,
        "tasksRemoved": report.tasks_removed,
    }))
}
