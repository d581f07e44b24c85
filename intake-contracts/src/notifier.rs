use async_trait::async_trait;

/// Alert raised by the listener fleet's health monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectAlert {
    /// A mailbox reconnected `count` times within the alert window.
    ReconnectStorm { mailbox: String, count: u32 },
    /// A mailbox's health check has failed `count` times in a row.
    ConsecutiveFailures { mailbox: String, count: u32 },
}

/// Sink for health-monitor alerts. Implemented by the chat-webhook notifier
/// in production (out of scope, §1) and by a recording fake in tests.
#[async_trait]
pub trait ReconnectNotifier: Send + Sync {
    async fn notify(&self, alert: ReconnectAlert);
}

/// A notifier that drops every alert. Useful as a default when no
/// downstream notification channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl ReconnectNotifier for NullNotifier {
    async fn notify(&self, _alert: ReconnectAlert) {}
}
