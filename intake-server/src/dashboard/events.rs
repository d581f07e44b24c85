//! Wire shape of everything the bus publishes to dashboard clients, and of
//! the handful of messages clients may send back. Tagged so the client can
//! switch on `type` without a second round of parsing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum DashboardEvent {
    #[serde(rename = "updateStatus")]
    UpdateStatus {
        paused: bool,
        accepted_count: usize,
        on_hold_count: usize,
    },
    #[serde(rename = "capacityUpdated")]
    CapacityUpdated { date: NaiveDate },
    #[serde(rename = "tasksUpdated")]
    TasksUpdated {
        #[serde(skip_serializing_if = "Option::is_none")]
        completed_count: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        on_hold_count: Option<usize>,
    },
    #[serde(rename = "workingHoursUpdated")]
    WorkingHoursUpdated { date: NaiveDate },
    #[serde(rename = "queueUpdated")]
    QueueUpdated,
    #[serde(rename = "diagnostic")]
    Diagnostic { message: String },
}

/// Messages a dashboard client may send over the websocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Ping,
    Refresh,
    TogglePause,
}

/// Server replies that aren't broadcast-worthy events in their own right
/// (e.g. a direct `pong` reply to one client's `ping`).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerReply {
    #[serde(rename = "pong")]
    Pong,
}
