use async_trait::async_trait;
use bytes::Bytes;
use eip_monitor_sdk::{
    DatagramConsumer, MonitorError, MonitorResult, ProtocolClient, SessionHandle, SessionState,
};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Once,
    },
    time::Duration,
};
use tracing::Level;

/// One entry per collaborator invocation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RegisterSession,
    OpenConnection,
    CloseConnection,
    UnregisterSession,
    SendDatagram(Vec<u8>),
}

/// Recording protocol-client collaborator.
///
/// Registers every invocation, supports injected registration/connection/send
/// failures, and lets tests push inbound datagrams through the installed
/// consumer with `deliver`.
#[derive(Default)]
pub struct MockClient {
    calls: Mutex<Vec<Call>>,
    consumer: Mutex<Option<Arc<dyn DatagramConsumer>>>,
    latest: Mutex<Bytes>,
    pub fail_register: AtomicBool,
    pub fail_connect: AtomicBool,
    pub fail_next_send: AtomicBool,
}

impl MockClient {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Attempted acknowledgment sends, in order (including failed attempts).
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::SendDatagram(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, want: &Call) -> usize {
        self.calls().iter().filter(|c| *c == want).count()
    }

    /// Simulate one inbound cyclic datagram. Returns false when no consumer
    /// is installed (e.g. after close).
    pub fn deliver(&self, payload: &[u8]) -> bool {
        let payload = Bytes::copy_from_slice(payload);
        *self.latest.lock().unwrap() = payload.clone();
        match self.consumer.lock().unwrap().clone() {
            Some(consumer) => {
                consumer.on_datagram(payload);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ProtocolClient for MockClient {
    async fn register_session(&self, _target: SocketAddr) -> MonitorResult<SessionHandle> {
        self.calls.lock().unwrap().push(Call::RegisterSession);
        if self.fail_register.load(Ordering::Relaxed) {
            return Err(MonitorError::Registration("controller unreachable".into()));
        }
        Ok(SessionHandle::new(0xBEEF_0001))
    }

    async fn open_connection(&self, _handle: SessionHandle) -> MonitorResult<()> {
        self.calls.lock().unwrap().push(Call::OpenConnection);
        if self.fail_connect.load(Ordering::Relaxed) {
            return Err(MonitorError::Connection("forward open rejected".into()));
        }
        Ok(())
    }

    async fn close_connection(&self, _handle: SessionHandle) {
        self.calls.lock().unwrap().push(Call::CloseConnection);
        self.consumer.lock().unwrap().take();
    }

    async fn unregister_session(&self, _handle: SessionHandle) {
        self.calls.lock().unwrap().push(Call::UnregisterSession);
    }

    fn set_receive_callback(&self, consumer: Arc<dyn DatagramConsumer>) {
        *self.consumer.lock().unwrap() = Some(consumer);
    }

    async fn send_datagram(&self, payload: Bytes) -> MonitorResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::SendDatagram(payload.to_vec()));
        if self.fail_next_send.swap(false, Ordering::Relaxed) {
            return Err(MonitorError::Send("explicit send timed out".into()));
        }
        Ok(())
    }

    fn latest_cyclic_input(&self) -> Bytes {
        self.latest.lock().unwrap().clone()
    }
}

/// Consumer recording every payload it receives.
#[derive(Default)]
pub struct Recorder {
    got: Mutex<Vec<Vec<u8>>>,
}

impl Recorder {
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.got.lock().unwrap().clone()
    }
}

impl DatagramConsumer for Recorder {
    fn on_datagram(&self, payload: Bytes) {
        self.got.lock().unwrap().push(payload.to_vec());
    }
}

/// Global one-time tracing initialization guard for integration tests.
static INIT_TRACING: Once = Once::new();

/// Initialize a compact `tracing` subscriber so lifecycle transitions and
/// send failures are visible in test runs.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .try_init();
    });
}

pub fn target() -> SocketAddr {
    "192.168.1.10:44818".parse().expect("static test address")
}

/// Poll `cond` until it holds or `timeout_dur` elapses.
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout_dur: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout_dur;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Wait until the lifecycle state becomes `want` or time out.
pub async fn wait_for_state(
    mut state_rx: tokio::sync::watch::Receiver<SessionState>,
    want: SessionState,
    timeout_dur: Duration,
) -> anyhow::Result<()> {
    let res = tokio::time::timeout(timeout_dur, async move {
        loop {
            if *state_rx.borrow() == want {
                return Ok(());
            }
            if state_rx.changed().await.is_err() {
                return Err(anyhow::anyhow!("state channel closed before {want}"));
            }
        }
    })
    .await;

    match res {
        Ok(inner) => inner,
        Err(_) => Err(anyhow::anyhow!("timeout waiting for state {want}")),
    }
}
