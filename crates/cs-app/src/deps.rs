//! Dependency grouping for the sync coordinator.
//!
//! Plain parameter grouping: every field is required and nothing is built
//! here.

use std::sync::Arc;

use cs_core::ports::{
    ClipboardHistoryPort, DeviceIdentityPort, DiscoveryPort, EncryptionPort, RelayTransportPort,
};

pub struct SyncDeps {
    pub history: Arc<dyn ClipboardHistoryPort>,
    pub transport: Arc<dyn RelayTransportPort>,
    pub discovery: Arc<dyn DiscoveryPort>,
    pub encryption: Arc<dyn EncryptionPort>,
    pub device_identity: Arc<dyn DeviceIdentityPort>,
}
