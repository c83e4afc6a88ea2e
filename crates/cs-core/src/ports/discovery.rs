use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::network::{DiscoveredPeer, DiscoveryEvent};
use crate::ports::DiscoveryError;

/// Client-side relay discovery.
#[async_trait]
pub trait DiscoveryPort: Send + Sync {
    /// Opens the socket and sends one discovery request. Failure disables
    /// discovery for this run but is not fatal to the caller.
    async fn start(&self) -> Result<(), DiscoveryError>;

    /// Idempotent. Clears all known peers.
    async fn stop(&self);

    /// Resend a discovery request.
    async fn refresh(&self) -> Result<(), DiscoveryError>;

    async fn peers(&self) -> Vec<DiscoveredPeer>;

    fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent>;

    fn is_active(&self) -> bool;
}
