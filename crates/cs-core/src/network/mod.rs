//! Wire records and network-facing domain types.

pub mod discovery;
pub mod envelope;
mod status;

pub use discovery::{
    DiscoveredPeer, DiscoveryEvent, DiscoveryMessage, DiscoveryMessageType, PROTOCOL_VERSION,
};
pub use envelope::{EnvelopeError, SyncEnvelope};
pub use status::ConnectionStatus;
