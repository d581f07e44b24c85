//! The admission-decision boundary (§4.B's "admission decision (from task
//! offer)"). `intake-core`'s listener fleet knows nothing about the ledger
//! or the dashboard — it only calls `Acceptor::accept`. This module is
//! where that callback actually consults the ledger, publishes the
//! resulting state change, and — on acceptance — delegates the offer to
//! whatever downstream acceptor drives the browser-automation worker
//! (out of scope per §1; `LoggingAcceptor` stands in for it here).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use intake_contracts::{AcceptOutcome, Acceptor};
use intake_core::Ledger;
use intake_model::TaskOffer;

use crate::dashboard::{DashboardBus, DashboardEvent};
use crate::on_hold::OnHoldStore;

/// Default downstream acceptor: logs the offer instead of driving a real
/// browser-automation worker, which this service does not implement
/// (§1, out of scope).
#[derive(Debug, Default)]
pub struct LoggingAcceptor;

#[async_trait]
impl Acceptor for LoggingAcceptor {
    async fn accept(&self, offer: TaskOffer) -> AcceptOutcome {
        tracing::info!(
            order_id = ?offer.order_id,
            accept_url = ?offer.accept_url,
            "dispatching accepted offer to downstream automation (stub)"
        );
        AcceptOutcome::Dispatched
    }
}

/// Wraps the ledger, the dashboard bus, and the on-hold visibility store
/// around a downstream acceptor, implementing the admission decision the
/// listener fleet itself has no knowledge of.
pub struct IntakeAcceptor {
    ledger: Arc<Ledger>,
    bus: Arc<DashboardBus>,
    on_hold: Arc<OnHoldStore>,
    downstream: Arc<dyn Acceptor>,
}

impl IntakeAcceptor {
    pub fn new(
        ledger: Arc<Ledger>,
        bus: Arc<DashboardBus>,
        on_hold: Arc<OnHoldStore>,
        downstream: Arc<dyn Acceptor>,
    ) -> Self {
        Self {
            ledger,
            bus,
            on_hold,
            downstream,
        }
    }
}

/// Parse the parser's normalized `YYYY-MM-DD HH:mm` form into a date for
/// the ledger's business-day walk. The ledger only needs the date
/// component; the time of day plays no role in allocation.
fn parse_planned_end_date(raw: &str) -> Option<chrono::NaiveDate> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .map(|dt| dt.date())
        .ok()
}

#[async_trait]
impl Acceptor for IntakeAcceptor {
    async fn accept(&self, offer: TaskOffer) -> AcceptOutcome {
        let on_hold = offer.is_on_hold();

        match (&offer.accept_url, on_hold) {
            (Some(_), false) => {
                let amount_words = offer.amount_words.unwrap_or(0.0);
                let planned_end_date = offer.planned_end_date.as_deref().and_then(parse_planned_end_date);

                match self
                    .ledger
                    .accept_task(
                        offer.order_id.clone(),
                        offer.workflow_name.clone(),
                        amount_words,
                        offer.planned_end_date.clone(),
                        planned_end_date,
                    )
                    .await
                {
                    Ok(task) => {
                        for entry in &task.allocation_plan {
                            self.bus.broadcast(DashboardEvent::CapacityUpdated { date: entry.date });
                        }
                        self.downstream.accept(offer).await
                    }
                    Err(err) => {
                        tracing::warn!(order_id = ?offer.order_id, error = %err, "offer rejected by ledger");
                        AcceptOutcome::Failed
                    }
                }
            }
            (None, true) => {
                self.on_hold.record(offer).await;
                self.bus.broadcast(DashboardEvent::TasksUpdated {
                    completed_count: None,
                    on_hold_count: Some(self.on_hold.len().await),
                });
                AcceptOutcome::Dispatched
            }
            _ => AcceptOutcome::Failed,
        }
    }
}
