use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::clipboard::{ClipboardEvent, ClipboardItem};

/// Capability set shared by every clipboard manager implementation.
#[async_trait]
pub trait ClipboardManagerPort: Send + Sync {
    async fn start(&self) -> anyhow::Result<()>;

    /// Idempotent.
    async fn stop(&self);

    fn subscribe(&self) -> broadcast::Receiver<ClipboardEvent>;

    /// Entry point for the capture layer. Returns `true` if the item was new.
    async fn notify(&self, item: ClipboardItem) -> anyhow::Result<bool>;
}
