use crate::cache::InputCache;
use eip_monitor_sdk::{
    DatagramConsumer, MonitorError, MonitorResult, ProtocolClient, SessionHandle, SessionState,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

struct Inner {
    state: SessionState,
    handle: Option<SessionHandle>,
}

/// Session lifecycle state machine over a protocol-client collaborator.
///
/// `Unregistered -> Registered -> Connected -> Monitoring -> Closing ->
/// Registered -> Unregistered`. Lifecycle operations are serialized by an
/// async mutex; transitions are published on a watch channel. During the
/// monitoring phase the session and connection handles are read-only; the
/// input cache is the only state shared with the background receive path.
pub struct SessionMonitor {
    client: Arc<dyn ProtocolClient>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
    state_rx: watch::Receiver<SessionState>,
    cancel: CancellationToken,
}

impl SessionMonitor {
    pub fn new(client: Arc<dyn ProtocolClient>) -> Self {
        let (state_tx, state_rx) = watch::channel(SessionState::Unregistered);
        Self {
            client,
            inner: Mutex::new(Inner {
                state: SessionState::Unregistered,
                handle: None,
            }),
            state_tx,
            state_rx,
            cancel: CancellationToken::new(),
        }
    }

    #[inline]
    pub fn client(&self) -> &Arc<dyn ProtocolClient> {
        &self.client
    }

    /// Receiver always holding the latest lifecycle state.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Token cancelling the foreground wait; cancellation still flows into
    /// teardown rather than aborting the run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn set_state(&self, inner: &mut Inner, next: SessionState) {
        inner.state = next;
        let _ = self.state_tx.send(next);
    }

    /// Register a session with the controller. Fatal on failure; the core
    /// performs no automatic retry.
    #[instrument(level = "info", skip(self))]
    pub async fn register(&self, target: SocketAddr) -> MonitorResult<SessionHandle> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Unregistered {
            return Err(MonitorError::InvalidState {
                expected: "Unregistered",
                actual: inner.state.to_string(),
            });
        }

        let handle = self.client.register_session(target).await?;
        inner.handle = Some(handle);
        self.set_state(&mut inner, SessionState::Registered);
        info!(%handle, "session registered");
        Ok(handle)
    }

    /// Open the implicit-messaging (forward-open) connection. On failure the
    /// session remains registered and must still be unregistered.
    #[instrument(level = "info", skip_all)]
    pub async fn connect(&self) -> MonitorResult<()> {
        let mut inner = self.inner.lock().await;
        let handle = match (inner.state, inner.handle) {
            (SessionState::Registered, Some(h)) => h,
            _ => {
                return Err(MonitorError::InvalidState {
                    expected: "Registered",
                    actual: inner.state.to_string(),
                })
            }
        };

        self.client.open_connection(handle).await?;
        self.set_state(&mut inner, SessionState::Connected);
        info!(%handle, "implicit messaging connection open");
        Ok(())
    }

    /// Install `consumer` as the exclusive receiver of inbound datagrams.
    /// Installing a second consumer replaces the first.
    #[instrument(level = "info", skip_all)]
    pub async fn begin_monitoring(&self, consumer: Arc<dyn DatagramConsumer>) -> MonitorResult<()> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SessionState::Connected | SessionState::Monitoring => {}
            _ => {
                return Err(MonitorError::InvalidState {
                    expected: "Connected",
                    actual: inner.state.to_string(),
                })
            }
        }

        self.client.set_receive_callback(consumer);
        self.set_state(&mut inner, SessionState::Monitoring);
        info!("monitoring started");
        Ok(())
    }

    /// Close the implicit-messaging connection. Idempotent; a no-op unless a
    /// connection is open. After this returns no further datagram deliveries
    /// occur.
    #[instrument(level = "info", skip_all)]
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        let handle = match (inner.state, inner.handle) {
            (SessionState::Monitoring | SessionState::Connected, Some(h)) => h,
            _ => return,
        };

        self.set_state(&mut inner, SessionState::Closing);
        self.client.close_connection(handle).await;
        self.set_state(&mut inner, SessionState::Registered);
        info!(%handle, "implicit messaging connection closed");
    }

    /// Unregister the session. Idempotent. Attempts `close()` first so the
    /// close-before-unregister invariant holds even if the caller skipped it.
    #[instrument(level = "info", skip_all)]
    pub async fn unregister(&self) {
        self.close().await;

        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Registered {
            return;
        }
        let Some(handle) = inner.handle.take() else {
            return;
        };

        self.client.unregister_session(handle).await;
        self.set_state(&mut inner, SessionState::Unregistered);
        info!(%handle, "session unregistered");
    }

    /// Foreground observation loop: periodically snapshot the input cache
    /// until the window elapses or the monitor is cancelled. Suspends only at
    /// the periodic wait.
    pub async fn watch_input(
        &self,
        cache: &InputCache,
        window: Option<Duration>,
        poll_interval: Duration,
    ) {
        let deadline = window.map(|w| tokio::time::Instant::now() + w);
        let mut ticker = tokio::time::interval(poll_interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("monitoring interrupted");
                    return;
                }
                _ = sleep_until_opt(deadline) => {
                    info!("monitoring window elapsed");
                    return;
                }
                _ = ticker.tick() => {
                    let snapshot = cache.read();
                    debug!(input = ?snapshot.as_ref(), "latest cyclic input");
                }
            }
        }
    }

    /// Run the whole session lifecycle with guaranteed release: resources
    /// acquired by register/connect are always released via close/unregister
    /// on every exit path after registration succeeds, whether monitoring
    /// ends by window expiry, interruption or error. Teardown steps are
    /// attempted independently (best-effort complete).
    pub async fn run(
        &self,
        target: SocketAddr,
        consumer: Arc<dyn DatagramConsumer>,
        cache: Arc<InputCache>,
        window: Option<Duration>,
        poll_interval: Duration,
    ) -> MonitorResult<()> {
        self.register(target).await?;

        let outcome = self
            .run_monitoring(consumer, &cache, window, poll_interval)
            .await;

        self.close().await;
        self.unregister().await;
        outcome
    }

    async fn run_monitoring(
        &self,
        consumer: Arc<dyn DatagramConsumer>,
        cache: &InputCache,
        window: Option<Duration>,
        poll_interval: Duration,
    ) -> MonitorResult<()> {
        self.connect().await?;
        self.begin_monitoring(consumer).await?;
        self.watch_input(cache, window, poll_interval).await;
        Ok(())
    }
}

async fn sleep_until_opt(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}
