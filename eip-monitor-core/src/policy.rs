use bytes::Bytes;

/// Outcome of evaluating one inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckDecision {
    /// No acknowledgment warranted; the dispatcher performs no side effects.
    Ignore,
    /// Send the contained datagram back to the controller.
    Acknowledge(Bytes),
}

/// Pure decision logic over inbound payloads.
///
/// Implementations must be deterministic and side-effect-free so they are
/// testable without network I/O. The dispatcher is polymorphic over this
/// seam; the bit test below is a reference policy, not a protocol-mandated
/// rule.
pub trait AckPolicy: Send + Sync {
    fn decide(&self, payload: &[u8]) -> AckDecision;
}

/// Reference policy: acknowledge when the first payload byte ANDs
/// `trigger_mask` to non-zero.
///
/// An empty payload never triggers; malformed input is treated as no event,
/// not as an error.
#[derive(Debug, Clone, Copy)]
pub struct SensorBitPolicy {
    pub trigger_mask: u8,
    pub ack_byte: u8,
}

impl SensorBitPolicy {
    pub const DEFAULT_TRIGGER_MASK: u8 = 0x01;
    pub const DEFAULT_ACK_BYTE: u8 = 0xAC;

    pub fn new(trigger_mask: u8, ack_byte: u8) -> Self {
        Self {
            trigger_mask,
            ack_byte,
        }
    }
}

impl Default for SensorBitPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TRIGGER_MASK, Self::DEFAULT_ACK_BYTE)
    }
}

impl AckPolicy for SensorBitPolicy {
    fn decide(&self, payload: &[u8]) -> AckDecision {
        match payload.first() {
            Some(first) if first & self.trigger_mask != 0 => {
                AckDecision::Acknowledge(Bytes::copy_from_slice(&[self.ack_byte]))
            }
            _ => AckDecision::Ignore,
        }
    }
}
