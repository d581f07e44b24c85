//! The dashboard's realtime channel: one axum websocket per connected
//! operator. Modeled on the reference server's `handle_websocket` skeleton
//! (upgrade → split → forward-task → receive-loop), with connection
//! liveness tracked locally per task rather than through a shared
//! connection registry — this service has no auth/rooms concept to justify
//! one, so the "missed heartbeat" check lives inline in the receive loop.

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::app_state::AppState;
use crate::dashboard::events::{ClientMessage, DashboardEvent, ServerReply};

/// Dashboard clients are force-closed if they haven't replied to a
/// liveness probe since the previous tick.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(64);

    let mut events = state.bus.subscribe();
    let relay_tx = out_tx.clone();
    let relay_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(frame) => {
                    if let Ok(text) = serde_json::to_string(&frame.event) {
                        if relay_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "dashboard client lagged behind broadcast history");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let forward_task = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut last_seen = Instant::now();
    loop {
        let recv = tokio::time::timeout(HEARTBEAT_INTERVAL, receiver.next()).await;
        let msg = match recv {
            Ok(Some(Ok(msg))) => msg,
            Ok(Some(Err(err))) => {
                tracing::debug!(error = %err, "dashboard websocket error");
                break;
            }
            Ok(None) => break,
            Err(_elapsed) => {
                if last_seen.elapsed() >= HEARTBEAT_INTERVAL {
                    tracing::info!("dashboard client missed heartbeat window, closing");
                    break;
                }
                continue;
            }
        };

        last_seen = Instant::now();
        match msg {
            Message::Text(text) => handle_client_message(&text, &state, &out_tx).await,
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => break,
            Message::Binary(_) => {}
        }
    }

    relay_task.abort();
    forward_task.abort();
}

async fn handle_client_message(text: &str, state: &AppState, out_tx: &mpsc::Sender<String>) {
    let Ok(message) = serde_json::from_str::<ClientMessage>(text) else {
        tracing::debug!(raw = %text, "unrecognized dashboard client message");
        return;
    };

    match message {
        ClientMessage::Ping => {
            if let Ok(text) = serde_json::to_string(&ServerReply::Pong) {
                let _ = out_tx.send(text).await;
            }
        }
        ClientMessage::Refresh => {
            publish_update_status(state).await;
        }
        ClientMessage::TogglePause => {
            let now_paused = !state.fleet.is_paused();
            state.fleet.set_paused(now_paused);
            publish_update_status(state).await;
        }
    }
}

pub async fn publish_update_status(state: &AppState) {
    let accepted_count = state.ledger.tasks_snapshot().await.len();
    let on_hold_count = state.on_hold.len().await;
    state.bus.broadcast(DashboardEvent::UpdateStatus {
        paused: state.fleet.is_paused(),
        accepted_count,
        on_hold_count,
    });
}
