//! UDP discovery wire record and the client-side view of discovered relays.

use serde::{Deserialize, Serialize};

use crate::DeviceId;

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscoveryMessageType {
    ServerAdvertisement,
    ClientDiscoveryRequest,
}

/// One discovery datagram. Requests carry no server fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryMessage {
    #[serde(rename = "type")]
    pub message_type: DiscoveryMessageType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    #[serde(rename = "serverIP", default, skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_port: Option<u16>,

    pub device_id: DeviceId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_devices: Option<u32>,

    /// Unix epoch milliseconds at send time.
    pub timestamp: i64,

    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}

impl DiscoveryMessage {
    pub fn advertisement(
        server_name: impl Into<String>,
        server_ip: impl Into<String>,
        server_port: u16,
        device_id: DeviceId,
        connected_devices: u32,
        timestamp: i64,
    ) -> Self {
        Self {
            message_type: DiscoveryMessageType::ServerAdvertisement,
            server_name: Some(server_name.into()),
            server_ip: Some(server_ip.into()),
            server_port: Some(server_port),
            device_id,
            connected_devices: Some(connected_devices),
            timestamp,
            version: default_version(),
        }
    }

    pub fn discovery_request(device_id: DeviceId, timestamp: i64) -> Self {
        Self {
            message_type: DiscoveryMessageType::ClientDiscoveryRequest,
            server_name: None,
            server_ip: None,
            server_port: None,
            device_id,
            connected_devices: None,
            timestamp,
            version: default_version(),
        }
    }

    pub fn is_advertisement(&self) -> bool {
        self.message_type == DiscoveryMessageType::ServerAdvertisement
    }

    pub fn is_discovery_request(&self) -> bool {
        self.message_type == DiscoveryMessageType::ClientDiscoveryRequest
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// A relay seen on the local network. Owned by the discoverer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPeer {
    pub peer_id: DeviceId,
    pub display_name: String,
    pub address: String,
    pub port: u16,
    pub connected_device_count: u32,
    pub last_seen_ms: i64,
    pub online: bool,
}

impl DiscoveredPeer {
    /// Build a peer from an advertisement. Returns `None` for requests or
    /// advertisements missing an address or port.
    pub fn from_advertisement(message: &DiscoveryMessage, now_ms: i64) -> Option<Self> {
        if !message.is_advertisement() {
            return None;
        }
        let address = message.server_ip.clone()?;
        let port = message.server_port?;
        Some(Self {
            peer_id: message.device_id.clone(),
            display_name: message
                .server_name
                .clone()
                .unwrap_or_else(|| address.clone()),
            address,
            port,
            connected_device_count: message.connected_devices.unwrap_or(0),
            last_seen_ms: now_ms,
            online: true,
        })
    }

    /// Copy the advertised fields and bump `last_seen_ms`.
    pub fn refresh_from(&mut self, other: DiscoveredPeer) {
        self.display_name = other.display_name;
        self.address = other.address;
        self.port = other.port;
        self.connected_device_count = other.connected_device_count;
        self.last_seen_ms = other.last_seen_ms;
        self.online = true;
    }

    pub fn is_stale(&self, now_ms: i64, timeout_ms: i64) -> bool {
        now_ms - self.last_seen_ms > timeout_ms
    }

    pub fn relay_url(&self) -> String {
        format!("ws://{}:{}/sync", self.address, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    PeerDiscovered(DiscoveredPeer),
    PeerLost(DiscoveredPeer),
    StatusChanged { active: bool },
}
