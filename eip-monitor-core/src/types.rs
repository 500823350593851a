use eip_monitor_sdk::{MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

/// Monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorConfig {
    /// Controller IP address.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Monitoring window in seconds; `None` runs until interrupted.
    #[serde(default = "default_run_for_secs")]
    pub run_for_secs: Option<u64>,
    /// Foreground cache-observation period.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Bytes of each cyclic payload retained in the input cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// First-byte mask that qualifies a payload as a sensor event.
    #[serde(default = "default_trigger_mask")]
    pub trigger_mask: u8,
    /// Acknowledgment datagram content.
    #[serde(default = "default_ack_byte")]
    pub ack_byte: u8,
}

fn default_port() -> u16 {
    44818
}

fn default_run_for_secs() -> Option<u64> {
    Some(30)
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_cache_capacity() -> usize {
    8
}

fn default_trigger_mask() -> u8 {
    0x01
}

fn default_ack_byte() -> u8 {
    0xAC
}

impl MonitorConfig {
    pub fn target(&self) -> MonitorResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| MonitorError::Configuration(format!("invalid target address: {e}")))
    }

    #[inline]
    pub fn window(&self) -> Option<Duration> {
        self.run_for_secs.map(Duration::from_secs)
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
