//! # cs-network
//!
//! Network adapters for ClipSync: UDP multicast discovery of relays, the
//! WebSocket relay server that fans frames out between sessions, and the
//! reconnecting relay client.

pub mod discovery;
pub mod net_utils;
pub mod relay;

pub use discovery::{NetworkDiscoverer, PeerRegistry, ServerAdvertiser};
pub use relay::{RelayClient, RelayServer, SessionCount};
