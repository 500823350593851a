use crate::{
    cache::InputCache,
    policy::{AckDecision, AckPolicy},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use eip_monitor_sdk::{DatagramConsumer, ProtocolClient};
use std::sync::{
    atomic::{AtomicI64, AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct DispatchStats {
    received: AtomicU64,
    acknowledged: AtomicU64,
    send_failures: AtomicU64,
    /// Epoch millis of the last datagram; 0 until the first arrival.
    last_activity_ms: AtomicI64,
}

/// Point-in-time snapshot of dispatcher activity.
#[derive(Debug, Clone)]
pub struct DispatchMetrics {
    pub received: u64,
    pub acknowledged: u64,
    pub send_failures: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Bridges the background datagram-arrival path to the acknowledgment policy
/// without blocking the transport's receive path.
///
/// Safe under concurrent, overlapping `on_datagram` invocations: all state is
/// atomics, the lock-free input cache, and an mpsc sender. Qualifying events
/// are queued in processing order on an unbounded channel and drained by a
/// single sender task, so acknowledgments are emitted in that same order,
/// without loss or duplication.
pub struct EventDispatcher {
    cache: Arc<InputCache>,
    policy: Arc<dyn AckPolicy>,
    ack_tx: mpsc::UnboundedSender<Bytes>,
    stats: Arc<DispatchStats>,
}

impl EventDispatcher {
    /// Wire a dispatcher to `client` and spawn its ack-sender task.
    ///
    /// The task exits when `cancel` fires or when the dispatcher is dropped.
    pub fn spawn(
        client: Arc<dyn ProtocolClient>,
        cache: Arc<InputCache>,
        policy: Arc<dyn AckPolicy>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();
        let stats = Arc::new(DispatchStats::default());
        tokio::spawn(run_ack_sender(client, ack_rx, Arc::clone(&stats), cancel));

        Arc::new(Self {
            cache,
            policy,
            ack_tx,
            stats,
        })
    }

    #[inline]
    pub fn cache(&self) -> &Arc<InputCache> {
        &self.cache
    }

    pub fn metrics(&self) -> DispatchMetrics {
        let last_ms = self.stats.last_activity_ms.load(Ordering::Relaxed);
        DispatchMetrics {
            received: self.stats.received.load(Ordering::Relaxed),
            acknowledged: self.stats.acknowledged.load(Ordering::Relaxed),
            send_failures: self.stats.send_failures.load(Ordering::Relaxed),
            last_activity: (last_ms != 0)
                .then(|| DateTime::from_timestamp_millis(last_ms))
                .flatten(),
        }
    }
}

impl DatagramConsumer for EventDispatcher {
    fn on_datagram(&self, payload: Bytes) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        self.stats
            .last_activity_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);

        self.cache.write(&payload);

        match self.policy.decide(&payload) {
            AckDecision::Acknowledge(datagram) => {
                debug!(len = payload.len(), "sensor event detected, queueing acknowledgment");
                if self.ack_tx.send(datagram).is_err() {
                    warn!("acknowledgment queue closed, dropping datagram");
                }
            }
            AckDecision::Ignore => {}
        }
    }
}

/// Drain queued acknowledgments sequentially, preserving processing order.
/// A failed send is warned and counted; it never terminates monitoring.
async fn run_ack_sender(
    client: Arc<dyn ProtocolClient>,
    mut ack_rx: mpsc::UnboundedReceiver<Bytes>,
    stats: Arc<DispatchStats>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            maybe = ack_rx.recv() => {
                match maybe {
                    Some(datagram) => match client.send_datagram(datagram).await {
                        Ok(()) => {
                            stats.acknowledged.fetch_add(1, Ordering::Relaxed);
                            debug!("acknowledgment sent");
                        }
                        Err(e) => {
                            stats.send_failures.fetch_add(1, Ordering::Relaxed);
                            warn!(error = %e, "acknowledgment send failed, monitoring continues");
                        }
                    },
                    None => break,
                }
            }
        }
    }
}
