use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub enabled: bool,

    /// `ws://host:port/sync`. Empty means "find a relay via discovery".
    pub relay_address: String,

    /// Base64 pre-shared key. Empty disables payload encryption.
    pub encryption_key: String,

    pub reconnect_delay_ms: u64,

    /// Binary payloads above this size are not sent.
    pub max_payload_bytes: usize,
}

impl SyncSettings {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn encryption_enabled(&self) -> bool {
        !self.encryption_key.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub max_history_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub multicast_group: String,
    pub port: u16,
    pub advertisement_interval_ms: u64,
    /// A peer not re-advertised for this long is evicted.
    pub server_timeout_ms: u64,
    pub sweep_interval_ms: u64,
    /// Receive timeout; bounds how long a loop takes to observe stop.
    pub socket_timeout_ms: u64,
    pub client_discovery_timeout_ms: u64,
    pub max_message_bytes: usize,
}

impl DiscoverySettings {
    pub fn advertisement_interval(&self) -> Duration {
        Duration::from_millis(self.advertisement_interval_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn client_discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.client_discovery_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub bind_address: String,
    pub port: u16,
    pub server_name: String,
    pub max_frame_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "current_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub history: HistorySettings,

    /// Regular expressions applied by the capture layer; opaque here.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    #[serde(default)]
    pub discovery: DiscoverySettings,

    #[serde(default)]
    pub relay: RelaySettings,
}

fn current_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"sync":{"enabled":true},"history":{}}"#).expect("parse");
        assert!(settings.sync.enabled);
        assert_eq!(settings.sync.relay_address, "ws://localhost:8080/sync");
        assert_eq!(settings.history.max_history_items, 200);
        assert_eq!(settings.discovery.port, 8081);
        assert_eq!(settings.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn encryption_enabled_only_with_key() {
        let mut sync = SyncSettings::default();
        assert!(!sync.encryption_enabled());
        sync.encryption_key = "  ".to_string();
        assert!(!sync.encryption_enabled());
        sync.encryption_key = "a2V5".to_string();
        assert!(sync.encryption_enabled());
    }
}
