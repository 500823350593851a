use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Opaque session token issued by the controller at registration.
///
/// All connection and I/O operations require a valid handle. At most one
/// active session exists per client instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHandle(u32);

impl SessionHandle {
    #[inline]
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl Display for SessionHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Session lifecycle state.
///
/// Transitions: `Unregistered -> Registered -> Connected -> Monitoring ->
/// Closing -> Registered -> Unregistered`. `Closing` is transient and only
/// observable through the state watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Unregistered,
    Registered,
    Connected,
    Monitoring,
    Closing,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
