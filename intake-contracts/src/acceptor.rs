use async_trait::async_trait;
use intake_model::TaskOffer;

/// Result of handing an offer to the browser-automation layer. The core
/// does not consult this to adjust its own state — it relies on the
/// acceptor to own its own retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    Dispatched,
    Failed,
}

/// The boundary the core hands every admitted (or on-hold) offer across.
/// Implemented by the browser-automation worker in production, and by a
/// recording fake in tests.
#[async_trait]
pub trait Acceptor: Send + Sync {
    async fn accept(&self, offer: TaskOffer) -> AcceptOutcome;
}
