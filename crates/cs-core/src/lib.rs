//! # cs-core
//!
//! Core domain models and port traits for ClipSync.
//!
//! This crate contains pure domain logic without any infrastructure dependencies:
//! clipboard items, wire records for discovery and relay, settings and the
//! ports that infrastructure and network adapters implement.

pub mod clipboard;
pub mod config;
pub mod ids;
pub mod network;
pub mod ports;
pub mod security;
pub mod settings;

pub use clipboard::{ClipboardEvent, ClipboardItem, ClipboardKind, ClipboardOrigin, ContentHash};
pub use config::AppConfig;
pub use ids::{DeviceId, SessionId};
pub use network::{
    ConnectionStatus, DiscoveredPeer, DiscoveryEvent, DiscoveryMessage, DiscoveryMessageType,
    SyncEnvelope,
};
pub use settings::model::Settings;
