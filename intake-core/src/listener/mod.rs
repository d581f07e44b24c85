//! Mailbox listener fleet (component D): one autonomous IMAP listener per
//! configured mailbox, each tracking its own UID cursor and state machine,
//! sharing a process-wide pause gate and health monitor.

mod backoff;
mod health;
mod mime;
mod state;

pub use backoff::BackoffConfig;
pub use health::{HealthMonitor, HealthMonitorConfig};
pub use state::ListenerState;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use imap::Session;
use intake_contracts::{AcceptOutcome, Acceptor};
use intake_model::MailboxCursor;
use native_tls::TlsStream;
use tokio::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::parser;
use crate::uid_store::UidStore;

type ImapSession = Session<TlsStream<std::net::TcpStream>>;

#[derive(Debug, Clone)]
pub struct ImapConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

/// One autonomous listener. Cheap to construct; `run` drives it until the
/// fleet's shutdown flag is set.
pub struct MailboxListener {
    mailbox: String,
    imap: ImapConfig,
    uid_store: UidStore,
    acceptor: Arc<dyn Acceptor>,
    health: Arc<HealthMonitor>,
    pause: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    backoff: BackoffConfig,
    state: Mutex<ListenerState>,
    in_flight: AtomicBool,
}

impl MailboxListener {
    pub fn new(
        mailbox: impl Into<String>,
        imap: ImapConfig,
        uid_store: UidStore,
        acceptor: Arc<dyn Acceptor>,
        health: Arc<HealthMonitor>,
        pause: Arc<AtomicBool>,
        shutdown: Arc<AtomicBool>,
        backoff: BackoffConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            mailbox: mailbox.into(),
            imap,
            uid_store,
            acceptor,
            health,
            pause,
            shutdown,
            backoff,
            state: Mutex::new(ListenerState::Disconnected),
            in_flight: AtomicBool::new(false),
        })
    }

    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    pub async fn state(&self) -> ListenerState {
        *self.state.lock().await
    }

    async fn set_state(&self, new_state: ListenerState) {
        *self.state.lock().await = new_state;
        tracing::info!(mailbox = %self.mailbox, state = ?new_state, "listener state transition");
    }

    /// Drive the listener until `shutdown` is observed. Never returns an
    /// error outward — all recovery is local, per the propagation policy.
    pub async fn run(self: Arc<Self>) {
        let mut attempt: u32 = 0;

        while !self.shutdown.load(Ordering::Relaxed) {
            self.set_state(ListenerState::Connecting).await;

            match self.clone().connect_and_serve().await {
                Ok(()) => {
                    // Clean return only happens on shutdown.
                    break;
                }
                Err(err) => {
                    tracing::warn!(mailbox = %self.mailbox, error = %err, "listener session ended, reconnecting");
                    self.health.record_reconnect(&self.mailbox).await;
                    self.set_state(ListenerState::Reconnecting).await;

                    attempt += 1;
                    if attempt > self.backoff.max_retries {
                        self.set_state(ListenerState::Failed).await;
                        tokio::time::sleep(self.backoff.max_retry_delay).await;
                        attempt = 0;
                        continue;
                    }
                    tokio::time::sleep(backoff::delay_for_attempt(&self.backoff, attempt)).await;
                }
            }
        }

        self.set_state(ListenerState::Disconnected).await;
    }

    async fn connect_and_serve(self: Arc<Self>) -> CoreResult<()> {
        let cursor = self.uid_store.load(&self.mailbox).await;
        let handle = tokio::runtime::Handle::current();
        let listener = self.clone();

        tokio::task::spawn_blocking(move || listener.session_loop_blocking(&handle, cursor))
            .await
            .map_err(|err| CoreError::Unexpected(err.to_string()))?
    }

    fn connect_blocking(&self) -> CoreResult<ImapSession> {
        let tls = native_tls::TlsConnector::builder()
            .build()
            .map_err(|err| CoreError::TransientNetwork(err.to_string()))?;
        let client = imap::connect((self.imap.host.as_str(), self.imap.port), &self.imap.host, &tls)
            .map_err(|err| CoreError::TransientNetwork(err.to_string()))?;
        let mut session = client
            .login(&self.imap.user, &self.imap.pass)
            .map_err(|(err, _)| CoreError::TransientNetwork(err.to_string()))?;
        session
            .select(&self.mailbox)
            .map_err(|err| CoreError::ProtocolError(err.to_string()))?;
        Ok(session)
    }

    /// Runs entirely on a blocking-pool thread: connect, then alternate
    /// `Open` (idle-wait) and `Fetching` until shutdown or an error forces
    /// a reconnect.
    fn session_loop_blocking(
        self: Arc<Self>,
        handle: &tokio::runtime::Handle,
        mut cursor: MailboxCursor,
    ) -> CoreResult<()> {
        let mut session = self.connect_blocking()?;
        handle.block_on(self.set_state(ListenerState::Open));

        let mut last_health_check = std::time::Instant::now();
        let health_interval = Duration::from_secs(3 * 60);
        let health_timeout = Duration::from_secs(15);

        while !self.shutdown.load(Ordering::Relaxed) {
            if self.pause.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }

            match session.idle().and_then(|idle| idle.wait_with_timeout(Duration::from_secs(29 * 60))) {
                Ok(imap::extensions::idle::WaitOutcome::MailboxChanged) => {}
                Ok(imap::extensions::idle::WaitOutcome::TimedOut) => {
                    if last_health_check.elapsed() >= health_interval {
                        let (recovered, healthy) = Self::health_check_blocking(session, health_timeout);
                        handle.block_on(self.health.record_health_check(&self.mailbox, healthy));
                        last_health_check = std::time::Instant::now();
                        session = recovered?;
                    }
                    continue;
                }
                Err(err) => {
                    let _ = session.logout();
                    return Err(CoreError::TransientNetwork(err.to_string()));
                }
            }

            handle.block_on(self.set_state(ListenerState::Fetching));
            self.in_flight.store(true, Ordering::Relaxed);
            let result = self.fetch_batch_with_retry(handle, &mut session, &mut cursor);
            self.in_flight.store(false, Ordering::Relaxed);
            handle.block_on(self.set_state(ListenerState::Open));
            result?;
        }

        let _ = session.logout();
        Ok(())
    }

    /// Runs `session.noop()` on its own OS thread and races it against
    /// `timeout`. `imap::Session::noop` is synchronous with no built-in
    /// deadline, so enforcing one means racing the blocking call itself
    /// rather than just bounding how long we wait for it. On timeout the
    /// session is considered lost (the background thread may still be
    /// blocked on it indefinitely) and the caller tears down and
    /// reconnects; on completion within the deadline the session is
    /// handed back for reuse.
    fn health_check_blocking(mut session: ImapSession, timeout: Duration) -> (CoreResult<ImapSession>, bool) {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let healthy = session.noop().is_ok();
            let _ = tx.send((session, healthy));
        });

        match rx.recv_timeout(timeout) {
            Ok((session, healthy)) => (Ok(session), healthy),
            Err(_) => (
                Err(CoreError::TransientNetwork("health check no-op timed out".to_string())),
                false,
            ),
        }
    }

    /// Retries a fetch batch in place (3 attempts, 1s base, exponential
    /// with jitter) before escalating the error to the caller, which tears
    /// the session down and falls back to the reconnect backoff schedule.
    /// The cursor is only ever advanced on a successful attempt, so a
    /// retry replays the same UID range untouched.
    fn fetch_batch_with_retry(
        &self,
        handle: &tokio::runtime::Handle,
        session: &mut ImapSession,
        cursor: &mut MailboxCursor,
    ) -> CoreResult<()> {
        const MAX_ATTEMPTS: u32 = 3;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.fetch_batch_blocking(handle, session, cursor) {
                Ok(()) => return Ok(()),
                Err(err) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(mailbox = %self.mailbox, attempt, error = %err, "fetch batch failed, retrying");
                    std::thread::sleep(backoff::batch_retry_delay(attempt));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fetch every UID in `(lastSeenUid, *]`, skipping ones already in
    /// `seenUids`, parse and dispatch each, then advance and persist the
    /// cursor. On any mid-batch error, the cursor is left untouched so the
    /// retry wrapper replays the whole batch.
    fn fetch_batch_blocking(
        &self,
        handle: &tokio::runtime::Handle,
        session: &mut ImapSession,
        cursor: &mut MailboxCursor,
    ) -> CoreResult<()> {
        let search_range = format!("{}:*", cursor.last_seen_uid.saturating_add(1));
        let uids = session
            .uid_search(&search_range)
            .map_err(|err| CoreError::ProtocolError(err.to_string()))?;

        let mut sorted: Vec<u32> = uids.into_iter().collect();
        sorted.sort_unstable();
        if sorted.is_empty() {
            return Ok(());
        }

        let mut max_fetched = cursor.last_seen_uid;
        let mut fetched_this_batch = Vec::new();

        for uid in sorted {
            if cursor.contains(uid) {
                continue;
            }

            let fetch_result = session
                .uid_fetch(uid.to_string(), "RFC822")
                .map_err(|err| CoreError::ProtocolError(err.to_string()))?;

            let Some(message) = fetch_result.iter().next() else {
                continue;
            };
            let Some(body) = message.body() else {
                continue;
            };

            match mime::parse_message(body) {
                Ok(parts) => {
                    let offers = parser::parse_offer(
                        &parts.subject,
                        &parts.text,
                        parts.html.as_deref(),
                        parts.content_language.as_deref(),
                    );
                    for offer in offers {
                        let acceptor = self.acceptor.clone();
                        handle.spawn(async move {
                            match acceptor.accept(offer).await {
                                AcceptOutcome::Dispatched => {}
                                AcceptOutcome::Failed => {
                                    tracing::warn!("acceptor reported failure for dispatched offer");
                                }
                            }
                        });
                    }
                }
                Err(err) => {
                    tracing::warn!(mailbox = %self.mailbox, uid, error = %err, "parse error, marking uid processed anyway");
                }
            }

            max_fetched = max_fetched.max(uid);
            fetched_this_batch.push(uid);
        }

        if !fetched_this_batch.is_empty() {
            cursor.advance(&fetched_this_batch);
            debug_assert_eq!(cursor.last_seen_uid, max_fetched.max(cursor.last_seen_uid));
            handle.block_on(self.uid_store.save(&self.mailbox, cursor));
        }

        Ok(())
    }
}

/// Owns every configured listener plus the process-wide pause gate.
pub struct ListenerFleet {
    listeners: Vec<Arc<MailboxListener>>,
    pause: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl ListenerFleet {
    pub fn new(listeners: Vec<Arc<MailboxListener>>, pause: Arc<AtomicBool>, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            listeners,
            pause,
            shutdown,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Relaxed)
    }

    pub fn set_paused(&self, paused: bool) {
        self.pause.store(paused, Ordering::Relaxed);
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Spawn every listener's run loop as an independent task and wait for
    /// all of them to return (only happens after `shutdown`).
    pub async fn run(&self) {
        let handles: Vec<_> = self
            .listeners
            .iter()
            .map(|listener| tokio::spawn(listener.clone().run()))
            .collect();

        for handle in handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "listener task panicked");
            }
        }
    }

    pub async fn statuses(&self) -> Vec<(String, ListenerState)> {
        let mut out = Vec::with_capacity(self.listeners.len());
        for listener in &self.listeners {
            out.push((listener.mailbox().to_string(), listener.state().await));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_contracts::NullNotifier;

    struct NoopAcceptor;

    #[async_trait::async_trait]
    impl Acceptor for NoopAcceptor {
        async fn accept(&self, _offer: intake_model::TaskOffer) -> AcceptOutcome {
            AcceptOutcome::Dispatched
        }
    }

    #[tokio::test]
    async fn fleet_reports_pause_state() {
        let pause = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(true));
        let fleet = ListenerFleet::new(Vec::new(), pause, shutdown);
        assert!(!fleet.is_paused());
        fleet.set_paused(true);
        assert!(fleet.is_paused());
    }

    #[tokio::test]
    async fn listener_starts_disconnected() {
        let dir = tempfile::tempdir().unwrap();
        let listener = MailboxListener::new(
            "inbox",
            ImapConfig {
                host: "imap.example.com".into(),
                port: 993,
                user: "user".into(),
                pass: "pass".into(),
            },
            UidStore::new(dir.path()),
            Arc::new(NoopAcceptor),
            Arc::new(HealthMonitor::new(HealthMonitorConfig::default(), Arc::new(NullNotifier))),
            Arc::new(AtomicBool::new(false)),
            Arc::new(AtomicBool::new(false)),
            BackoffConfig::default(),
        );
        assert_eq!(listener.state().await, ListenerState::Disconnected);
    }
}
