use crate::clipboard::{ClipboardItem, ClipboardOrigin};
use crate::network::ConnectionStatus;

/// Events published to clipboard subscribers (presentation and sync alike).
#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardEvent {
    /// A new item entered the local history.
    Changed {
        item: ClipboardItem,
        origin: ClipboardOrigin,
    },
    /// Relay connectivity changed.
    SyncStatusChanged(ConnectionStatus),
}

impl ClipboardEvent {
    pub fn local(item: ClipboardItem) -> Self {
        Self::Changed {
            item,
            origin: ClipboardOrigin::Local,
        }
    }

    pub fn remote(item: ClipboardItem) -> Self {
        Self::Changed {
            item,
            origin: ClipboardOrigin::Remote,
        }
    }
}
