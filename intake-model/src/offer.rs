use serde::{Deserialize, Serialize};

/// A task offer extracted from a single mailbox message. Ephemeral — it is
/// handed to the acceptor callback and never persisted in this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOffer {
    pub order_id: Option<String>,
    pub workflow_name: Option<String>,
    /// Free-text, e.g. "New", "On Hold". Compared case-insensitively by callers.
    pub status: String,
    pub amount_words: Option<f64>,
    /// Normalized to `YYYY-MM-DD HH:mm`, local time.
    pub planned_end_date: Option<String>,
    /// `None` when the offer is an on-hold notice with no accept link.
    pub accept_url: Option<String>,
}

impl TaskOffer {
    /// Whether this offer's status text is "on hold", case-insensitively.
    pub fn is_on_hold(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("on hold")
    }
}
