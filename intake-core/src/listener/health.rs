//! Health monitor (per-process singleton, injected into every listener):
//! reconnect-storm and consecutive-failure alerting.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use intake_contracts::{ReconnectAlert, ReconnectNotifier};
use tokio::sync::Mutex;

const RECONNECT_HISTORY_CAP: usize = 500;

#[derive(Debug, Clone, Copy)]
pub struct HealthMonitorConfig {
    pub reconnect_threshold: u32,
    pub reconnect_window: Duration,
    pub consecutive_failure_threshold: u32,
    pub health_check_interval: Duration,
    pub health_check_timeout: Duration,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            reconnect_threshold: 10,
            reconnect_window: Duration::from_secs(5 * 60),
            consecutive_failure_threshold: 3,
            health_check_interval: Duration::from_secs(3 * 60),
            health_check_timeout: Duration::from_secs(15),
        }
    }
}

struct MailboxHealth {
    reconnects: VecDeque<Instant>,
    consecutive_failures: u32,
    last_alert_at: Option<Instant>,
}

impl MailboxHealth {
    fn new() -> Self {
        Self {
            reconnects: VecDeque::new(),
            consecutive_failures: 0,
            last_alert_at: None,
        }
    }
}

pub struct HealthMonitor {
    config: HealthMonitorConfig,
    notifier: Arc<dyn ReconnectNotifier>,
    state: Mutex<HashMap<String, MailboxHealth>>,
}

impl HealthMonitor {
    pub fn new(config: HealthMonitorConfig, notifier: Arc<dyn ReconnectNotifier>) -> Self {
        Self {
            config,
            notifier,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Record a reconnect for `mailbox`; fires `ReconnectStorm` once the
    /// windowed count crosses the threshold, with a cooldown of one
    /// window before it can fire again for the same mailbox.
    pub async fn record_reconnect(&self, mailbox: &str) {
        let mut state = self.state.lock().await;
        let entry = state.entry(mailbox.to_string()).or_insert_with(MailboxHealth::new);

        let now = Instant::now();
        entry.reconnects.push_back(now);
        while entry.reconnects.len() > RECONNECT_HISTORY_CAP {
            entry.reconnects.pop_front();
        }
        while let Some(oldest) = entry.reconnects.front() {
            if now.duration_since(*oldest) > self.config.reconnect_window {
                entry.reconnects.pop_front();
            } else {
                break;
            }
        }

        let within_cooldown = entry
            .last_alert_at
            .is_some_and(|last| now.duration_since(last) < self.config.reconnect_window);

        if entry.reconnects.len() as u32 >= self.config.reconnect_threshold && !within_cooldown {
            entry.last_alert_at = Some(now);
            let alert = ReconnectAlert::ReconnectStorm {
                mailbox: mailbox.to_string(),
                count: entry.reconnects.len() as u32,
            };
            let notifier = self.notifier.clone();
            tokio::spawn(async move { notifier.notify(alert).await });
        }
    }

    /// Record the outcome of a periodic no-op health check; fires
    /// `ConsecutiveFailures` at each multiple of the threshold.
    pub async fn record_health_check(&self, mailbox: &str, healthy: bool) {
        let mut state = self.state.lock().await;
        let entry = state.entry(mailbox.to_string()).or_insert_with(MailboxHealth::new);

        if healthy {
            entry.consecutive_failures = 0;
            return;
        }

        entry.consecutive_failures += 1;
        if entry.consecutive_failures % self.config.consecutive_failure_threshold == 0 {
            let alert = ReconnectAlert::ConsecutiveFailures {
                mailbox: mailbox.to_string(),
                count: entry.consecutive_failures,
            };
            let notifier = self.notifier.clone();
            tokio::spawn(async move { notifier.notify(alert).await });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingNotifier(AtomicUsize);

    #[async_trait::async_trait]
    impl ReconnectNotifier for CountingNotifier {
        async fn notify(&self, _alert: ReconnectAlert) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn s6_reconnect_storm_fires_exactly_once() {
        let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));
        let monitor = HealthMonitor::new(HealthMonitorConfig::default(), notifier.clone());

        for _ in 0..10 {
            monitor.record_reconnect("inbox").await;
        }
        // Allow the spawned notify task(s) to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);

        // An eleventh reconnect within the same window must not re-fire.
        monitor.record_reconnect("inbox").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn consecutive_failures_fire_at_each_multiple_of_threshold() {
        let notifier = Arc::new(CountingNotifier(AtomicUsize::new(0)));
        let monitor = HealthMonitor::new(HealthMonitorConfig::default(), notifier.clone());

        for _ in 0..6 {
            monitor.record_health_check("inbox", false).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 2);

        monitor.record_health_check("inbox", true).await;
        monitor.record_health_check("inbox", false).await;
        monitor.record_health_check("inbox", false).await;
        monitor.record_health_check("inbox", false).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(notifier.0.load(Ordering::SeqCst), 3);
    }
}
