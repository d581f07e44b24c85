//! Shared application state threaded through every axum extractor.
//! Mirrors the reference server's `infra::app_state::AppState` shape: a
//! flat, cheaply-`Clone`-able bag of `Arc`s, one per owned subsystem.

use std::fmt;
use std::sync::Arc;

use intake_config::Config;
use intake_core::{HealthMonitor, Ledger, ListenerFleet};

use crate::dashboard::DashboardBus;
use crate::on_hold::OnHoldStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ledger: Arc<Ledger>,
    pub fleet: Arc<ListenerFleet>,
    pub health: Arc<HealthMonitor>,
    pub bus: Arc<DashboardBus>,
    pub on_hold: Arc<OnHoldStore>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
