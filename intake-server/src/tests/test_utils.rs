//! Fixture builder for the REST integration tests: a full `AppState` backed
//! by a disposable temp directory, with an empty listener fleet (no real
//! IMAP connections in these tests — the listener fleet itself is covered
//! by `intake-core`'s own tests).

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use intake_config::{
    BackoffSettings, CapacityConfig, Config, ConfigMetadata, HealthSettings, ImapSettings, SecretString,
    ServerConfig,
};
use intake_contracts::WeekdayOnly;
use intake_core::{HealthMonitor, HealthMonitorConfig, Ledger, ListenerFleet};

use crate::acceptor::{IntakeAcceptor, LoggingAcceptor};
use crate::app_state::AppState;
use crate::dashboard::DashboardBus;
use crate::on_hold::OnHoldStore;

fn test_config(data_dir: std::path::PathBuf) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        imap: ImapSettings {
            host: "imap.example.com".to_string(),
            port: 993,
            user: "test-user".to_string(),
            pass: SecretString::new("test-pass"),
            use_tls: true,
        },
        mailboxes: vec!["inbox".to_string()],
        capacity: CapacityConfig {
            default_words_per_day: 5000.0,
        },
        backoff: BackoffSettings::default(),
        health: HealthSettings::default(),
        allow_backfill: false,
        data_dir,
        metadata: ConfigMetadata::default(),
    }
}

/// Build a fully-wired `AppState` rooted at a fresh temp directory, plus
/// the router assembled from it. The temp dir is returned so callers can
/// keep it alive for the test's duration (it's deleted on drop).
pub async fn test_app() -> (Router, AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(dir.path().to_path_buf()));

    let business_day = Arc::new(WeekdayOnly);
    let ledger = Arc::new(Ledger::load(&config.data_dir, config.capacity.default_words_per_day, business_day).await);

    let health = Arc::new(HealthMonitor::new(
        HealthMonitorConfig::default(),
        Arc::new(intake_contracts::NullNotifier),
    ));
    let bus = Arc::new(DashboardBus::new(64, 64));
    let on_hold = Arc::new(OnHoldStore::new());
    let _acceptor: Arc<dyn intake_contracts::Acceptor> = Arc::new(IntakeAcceptor::new(
        ledger.clone(),
        bus.clone(),
        on_hold.clone(),
        Arc::new(LoggingAcceptor),
    ));

    let pause = Arc::new(AtomicBool::new(false));
    let shutdown = Arc::new(AtomicBool::new(true));
    let fleet = Arc::new(ListenerFleet::new(Vec::new(), pause, shutdown));

    let state = AppState {
        config,
        ledger,
        fleet,
        health,
        bus,
        on_hold,
        started_at: chrono::Utc::now(),
    };

    let router = crate::routes::router().with_state(state.clone());
    (router, state, dir)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    assert_eq!(response.status(), StatusCode::OK, "expected 200 for body_json helper");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
