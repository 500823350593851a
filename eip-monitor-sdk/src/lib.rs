mod client;
mod error;
mod types;

pub type MonitorResult<T> = Result<T, MonitorError>;

pub use client::{DatagramConsumer, ProtocolClient};
pub use error::MonitorError;
pub use types::{SessionHandle, SessionState};
