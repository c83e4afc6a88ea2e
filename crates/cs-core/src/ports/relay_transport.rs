use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::network::ConnectionStatus;
use crate::ports::TransportError;

/// Client side of the relay connection.
#[async_trait]
pub trait RelayTransportPort: Send + Sync {
    /// Start connecting to `url`, reconnecting after drops until
    /// [`Self::disconnect`].
    async fn connect(&self, url: &str) -> anyhow::Result<()>;

    /// Idempotent.
    async fn disconnect(&self);

    fn status(&self) -> ConnectionStatus;

    fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus>;

    /// Refuses with [`TransportError::NotConnected`] unless connected.
    async fn send_frame(&self, frame: String) -> Result<(), TransportError>;

    /// Inbound text frames. Can be taken once.
    async fn subscribe_frames(&self) -> anyhow::Result<mpsc::Receiver<String>>;
}
