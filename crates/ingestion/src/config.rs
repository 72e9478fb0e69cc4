//! Ingestion configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// TCP ingestion listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Address the sensor listener binds
    pub listen: String,
    /// Close a sensor session after this long without input (0, the default, disables)
    pub idle_timeout_ms: u64,
    /// Bytes requested per socket read
    pub read_buffer_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:14673".to_string(),
            idle_timeout_ms: 0,
            read_buffer_size: 1024,
        }
    }
}

impl IngestConfig {
    /// Idle timeout, if enabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_ms > 0).then(|| Duration::from_millis(self.idle_timeout_ms))
    }
}

/// UDP handshake gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatagramConfig {
    /// Whether the gateway runs at all
    pub enabled: bool,
    /// Address the gateway binds
    pub listen: String,
    /// Sensor is considered down after this long without a datagram
    pub liveness_timeout_ms: u64,
}

impl Default for DatagramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: "127.0.0.1:4638".to_string(),
            liveness_timeout_ms: 7_000,
        }
    }
}

impl DatagramConfig {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_timeout_is_opt_in() {
        assert_eq!(IngestConfig::default().idle_timeout(), None);

        let config = IngestConfig {
            idle_timeout_ms: 3_000,
            ..Default::default()
        };
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(3)));
    }
}
