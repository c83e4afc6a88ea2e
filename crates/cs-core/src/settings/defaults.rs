use super::model::*;

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            relay_address: "ws://localhost:8080/sync".to_string(),
            encryption_key: String::new(),
            reconnect_delay_ms: 5_000,
            max_payload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_history_items: 200,
        }
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            multicast_group: "224.0.0.251".to_string(),
            port: 8081,
            advertisement_interval_ms: 5_000,
            server_timeout_ms: 15_000,
            sweep_interval_ms: 15_000,
            socket_timeout_ms: 3_000,
            client_discovery_timeout_ms: 10_000,
            max_message_bytes: 512,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            server_name: "ClipSync Relay".to_string(),
            // Must exceed the base64 size of `sync.max_payload_bytes`.
            max_frame_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            sync: SyncSettings::default(),
            history: HistorySettings::default(),
            ignore_patterns: Vec::new(),
            discovery: DiscoverySettings::default(),
            relay: RelaySettings::default(),
        }
    }
}
