use cs_core::ClipboardEvent;
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

/// Typed fan-out of clipboard events. Subscribers must not rely on
/// delivery order between each other.
#[derive(Clone)]
pub struct ClipboardEventBus {
    tx: broadcast::Sender<ClipboardEvent>,
}

impl ClipboardEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns the number of subscribers that will see the event.
    pub fn publish(&self, event: ClipboardEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("clipboard event published without subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClipboardEvent> {
        self.tx.subscribe()
    }
}

impl Default for ClipboardEventBus {
    fn default() -> Self {
        Self::new()
    }
}
