//! Broadcast hub fanning `DashboardEvent`s to every connected dashboard
//! client. Modeled on the reference server's `MediaEventBus`: a
//! `tokio::sync::broadcast::Sender` for fan-out plus a bounded history of
//! recent events so a client that reconnects mid-burst doesn't miss it.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use super::events::DashboardEvent;

#[derive(Debug, Clone)]
pub struct DashboardFrame {
    pub sequence: u64,
    pub event: DashboardEvent,
}

#[derive(Debug)]
pub struct DashboardBus {
    tx: broadcast::Sender<DashboardFrame>,
    history: Mutex<VecDeque<DashboardFrame>>,
    history_capacity: usize,
    sequence: AtomicU64,
}

impl DashboardBus {
    pub fn new(history_capacity: usize, broadcast_capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity.max(1))),
            history_capacity: history_capacity.max(1),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardFrame> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Serialize `event` to every open session, swallowing per-session send
    /// errors (a lagging or closed receiver never affects another client).
    pub fn broadcast(&self, event: DashboardEvent) -> DashboardFrame {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let frame = DashboardFrame { sequence, event };

        {
            let mut history = self.history.lock().expect("dashboard bus history mutex poisoned");
            if history.len() == self.history_capacity {
                history.pop_front();
            }
            history.push_back(frame.clone());
        }

        let _ = self.tx.send(frame.clone());
        frame
    }

    pub fn history_since(&self, sequence: u64) -> Vec<DashboardFrame> {
        let history = self.history.lock().expect("dashboard bus history mutex poisoned");
        history.iter().filter(|frame| frame.sequence > sequence).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_assigns_increasing_sequence_numbers() {
        let bus = DashboardBus::new(8, 8);
        let first = bus.broadcast(DashboardEvent::QueueUpdated);
        let second = bus.broadcast(DashboardEvent::QueueUpdated);
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    #[test]
    fn history_caps_at_configured_capacity() {
        let bus = DashboardBus::new(2, 8);
        bus.broadcast(DashboardEvent::QueueUpdated);
        bus.broadcast(DashboardEvent::QueueUpdated);
        bus.broadcast(DashboardEvent::QueueUpdated);
        assert_eq!(bus.history_since(0).len(), 2);
    }

    #[tokio::test]
    async fn subscribers_receive_published_frames() {
        let bus = DashboardBus::new(8, 8);
        let mut rx = bus.subscribe();
        bus.broadcast(DashboardEvent::QueueUpdated);
        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.sequence, 1);
    }
}
