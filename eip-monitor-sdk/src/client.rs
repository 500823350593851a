use crate::{MonitorResult, SessionHandle};
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;

/// Consumer of inbound cyclic datagrams.
///
/// Invoked once per arrived datagram from the transport's receive path. The
/// transport does not guarantee sequential, non-overlapping invocations, so
/// implementations must be safe to call concurrently and must return quickly
/// without blocking.
pub trait DatagramConsumer: Send + Sync {
    fn on_datagram(&self, payload: Bytes);
}

/// Contract of the underlying protocol-client library.
///
/// Wire encoding, the transport socket and the forward-open negotiation all
/// live behind this trait; the monitor core only orchestrates the calls.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Register a session with the controller at `target`.
    async fn register_session(&self, target: SocketAddr) -> MonitorResult<SessionHandle>;

    /// Open the implicit-messaging (forward-open) connection.
    async fn open_connection(&self, handle: SessionHandle) -> MonitorResult<()>;

    /// Close the implicit-messaging connection. Idempotent; after this
    /// returns, no further `on_datagram` invocations occur.
    async fn close_connection(&self, handle: SessionHandle);

    /// Unregister the session. Idempotent.
    async fn unregister_session(&self, handle: SessionHandle);

    /// Install the sole consumer of inbound datagrams. Installing a new
    /// consumer supersedes the prior one, which receives no further
    /// invocations.
    fn set_receive_callback(&self, consumer: Arc<dyn DatagramConsumer>);

    /// Fire-and-forget explicit send; no delivery confirmation is tracked.
    async fn send_datagram(&self, payload: Bytes) -> MonitorResult<()>;

    /// Read-only view of the latest cyclic input buffer.
    fn latest_cyclic_input(&self) -> Bytes;
}
