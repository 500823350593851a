use async_trait::async_trait;
use bytes::Bytes;
use eip_monitor_sdk::{DatagramConsumer, MonitorResult, ProtocolClient, SessionHandle};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

struct SimState {
    consumer: Mutex<Option<Arc<dyn DatagramConsumer>>>,
    latest: Mutex<Bytes>,
}

/// In-process controller emitting scripted cyclic datagrams.
///
/// Stands in for field hardware so the binary runs end-to-end; real
/// deployments supply their own `ProtocolClient` implementation. The emitted
/// payload carries a little-endian sequence counter, so the first byte's
/// low bit toggles every cycle and every other datagram qualifies as a
/// sensor event under the default policy.
pub struct SimulatedController {
    period: Duration,
    next_handle: AtomicU32,
    state: Arc<SimState>,
    emitter: Mutex<Option<CancellationToken>>,
    acks_received: AtomicU64,
}

impl SimulatedController {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_handle: AtomicU32::new(0x1000_0001),
            state: Arc::new(SimState {
                consumer: Mutex::new(None),
                latest: Mutex::new(Bytes::new()),
            }),
            emitter: Mutex::new(None),
            acks_received: AtomicU64::new(0),
        }
    }

    pub fn acks_received(&self) -> u64 {
        self.acks_received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ProtocolClient for SimulatedController {
    async fn register_session(&self, target: SocketAddr) -> MonitorResult<SessionHandle> {
        let handle = SessionHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        info!(%target, %handle, "simulated controller accepted session registration");
        Ok(handle)
    }

    async fn open_connection(&self, handle: SessionHandle) -> MonitorResult<()> {
        let cancel = CancellationToken::new();
        if let Some(prev) = self.emitter.lock().unwrap().replace(cancel.clone()) {
            prev.cancel();
        }
        tokio::spawn(run_emitter(Arc::clone(&self.state), self.period, cancel));
        info!(%handle, "simulated forward open accepted, cyclic emission started");
        Ok(())
    }

    async fn close_connection(&self, handle: SessionHandle) {
        if let Some(cancel) = self.emitter.lock().unwrap().take() {
            cancel.cancel();
        }
        // Delivery must stop once close returns, even for an in-flight tick.
        self.state.consumer.lock().unwrap().take();
        info!(%handle, "simulated forward close, cyclic emission stopped");
    }

    async fn unregister_session(&self, handle: SessionHandle) {
        info!(%handle, "simulated session unregistered");
    }

    fn set_receive_callback(&self, consumer: Arc<dyn DatagramConsumer>) {
        *self.state.consumer.lock().unwrap() = Some(consumer);
    }

    async fn send_datagram(&self, payload: Bytes) -> MonitorResult<()> {
        self.acks_received.fetch_add(1, Ordering::Relaxed);
        info!(payload = ?payload.as_ref(), "simulated controller received acknowledgment");
        Ok(())
    }

    fn latest_cyclic_input(&self) -> Bytes {
        self.state.latest.lock().unwrap().clone()
    }
}

async fn run_emitter(state: Arc<SimState>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    let mut seq: u32 = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {
                seq = seq.wrapping_add(1);
                let payload = Bytes::from(seq.to_le_bytes().to_vec());
                *state.latest.lock().unwrap() = payload.clone();

                let consumer = state.consumer.lock().unwrap().clone();
                match consumer {
                    Some(c) => c.on_datagram(payload),
                    None => debug!(seq, "no consumer installed, datagram dropped"),
                }
            }
        }
    }
}
