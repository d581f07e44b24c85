//! Task-intake automation service: wires the mailbox listener fleet, the
//! capacity ledger, and the dashboard broadcast bus/REST API into a single
//! process.
//!
//! Configuration is layered (defaults → TOML file → environment → CLI
//! flags, see `intake-config`), logging is `tracing`-based, and the HTTP
//! surface is an axum `Router` built in [`routes`].

pub mod acceptor;
pub mod app_state;
pub mod dashboard;
pub mod errors;
pub mod on_hold;
pub mod routes;
#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Parser;
use intake_config::{Cli, ConfigLoader};
use intake_contracts::{NullNotifier, WeekdayOnly};
use intake_core::{
    BackoffConfig, HealthMonitor, HealthMonitorConfig, ImapConfig, Ledger, ListenerFleet, MailboxListener, UidStore,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::acceptor::{IntakeAcceptor, LoggingAcceptor};
use crate::app_state::AppState;
use crate::dashboard::DashboardBus;
use crate::on_hold::OnHoldStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intake_server=info,intake_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.config.clone() {
        loader = loader.with_config_path(path);
    }
    let mut config = loader.load()?;
    cli.apply(&mut config);
    let config = Arc::new(config);

    tracing::info!(
        mailboxes = ?config.mailboxes,
        port = config.server.port,
        config_file = config.metadata.config_file_present,
        "configuration loaded"
    );

    tokio::fs::create_dir_all(&config.data_dir).await?;

    let business_day = Arc::new(WeekdayOnly);
    let ledger = Arc::new(Ledger::load(&config.data_dir, config.capacity.default_words_per_day, business_day).await);

    let notifier = Arc::new(NullNotifier);
    let health_config = HealthMonitorConfig {
        reconnect_threshold: config.health.reconnect_threshold,
        reconnect_window: config.health.reconnect_window,
        consecutive_failure_threshold: config.health.consecutive_failure_threshold,
        health_check_interval: config.health.health_check_interval,
        health_check_timeout: config.health.health_check_timeout,
    };
    let health = Arc::new(HealthMonitor::new(health_config, notifier));

    let bus = Arc::new(DashboardBus::new(256, 256));
    let on_hold = Arc::new(OnHoldStore::new());
    let acceptor: Arc<dyn intake_contracts::Acceptor> = Arc::new(IntakeAcceptor::new(
        ledger.clone(),
        bus.clone(),
        on_hold.clone(),
        Arc::new(LoggingAcceptor),
    ));

    let pause = Arc::new(AtomicBool::new(false));
    let shutdown = Arc::new(AtomicBool::new(false));
    let uid_store = UidStore::new(&config.data_dir);
    let backoff = BackoffConfig {
        initial_delay: config.backoff.initial_delay,
        max_delay: config.backoff.max_delay,
        max_retries: config.backoff.max_retries,
        max_retry_delay: config.backoff.max_retry_delay,
    };

    let listeners = config
        .mailboxes
        .iter()
        .map(|mailbox| {
            MailboxListener::new(
                mailbox.clone(),
                ImapConfig {
                    host: config.imap.host.clone(),
                    port: config.imap.port,
                    user: config.imap.user.clone(),
                    pass: config.imap.pass.expose().to_string(),
                },
                uid_store.clone(),
                acceptor.clone(),
                health.clone(),
                pause.clone(),
                shutdown.clone(),
                backoff,
            )
        })
        .collect();
    let fleet = Arc::new(ListenerFleet::new(listeners, pause, shutdown.clone()));

    let state = AppState {
        config: config.clone(),
        ledger,
        fleet: fleet.clone(),
        health,
        bus,
        on_hold,
        started_at: chrono::Utc::now(),
    };

    let app = routes::router()
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let fleet_handle = tokio::spawn({
        let fleet = fleet.clone();
        async move { fleet.run().await }
    });

    let addr = std::net::SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>().unwrap_or_else(|_| [0, 0, 0, 0].into()),
        config.server.port,
    ));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dashboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown signal received, stopping listener fleet");
    fleet.shutdown();
    let _ = fleet_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
