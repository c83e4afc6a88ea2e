//! UDP multicast discovery.
//!
//! Relays advertise themselves on a fixed multicast group; clients send a
//! discovery request when they start and keep a registry of the relays they
//! have heard from, evicting those that stop advertising.

mod advertiser;
mod discoverer;
mod registry;
mod socket;

pub use advertiser::ServerAdvertiser;
pub use discoverer::NetworkDiscoverer;
pub use registry::PeerRegistry;
pub use socket::{bind_multicast, group_addr};
