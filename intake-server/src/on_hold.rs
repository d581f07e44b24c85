//! In-memory visibility store for on-hold offers. The data model has no
//! persisted shape for these (§3: only accepted-task records are durable),
//! so on-hold offers live only as long as the process and are rebuilt from
//! the next batch of mailbox traffic after a restart.

use tokio::sync::Mutex;

use intake_model::TaskOffer;

#[derive(Debug, Default)]
pub struct OnHoldStore {
    offers: Mutex<Vec<TaskOffer>>,
}

impl OnHoldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, offer: TaskOffer) {
        self.offers.lock().await.push(offer);
    }

    pub async fn snapshot(&self) -> Vec<TaskOffer> {
        self.offers.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.offers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(order_id: &str) -> TaskOffer {
        TaskOffer {
            order_id: Some(order_id.to_string()),
            workflow_name: None,
            status: "On Hold".to_string(),
            amount_words: None,
            planned_end_date: None,
            accept_url: None,
        }
    }

    #[tokio::test]
    async fn records_accumulate_and_snapshot() {
        let store = OnHoldStore::new();
        store.record(offer("1")).await;
        store.record(offer("2")).await;
        assert_eq!(store.len().await, 2);
        assert_eq!(store.snapshot().await.len(), 2);
    }
}
