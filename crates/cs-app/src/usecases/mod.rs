//! Business logic use cases.

pub mod clipboard;
pub mod network;

pub use clipboard::{
    CaptureClipboardUseCase, ClipboardHistoryUseCase, SyncInboundClipboardUseCase,
    SyncOutboundClipboardUseCase,
};
pub use network::ResolveRelayUseCase;
