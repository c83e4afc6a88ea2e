//! WebSocket broadcast relay.
//!
//! The server forwards every frame it receives to all other sessions without
//! looking inside it. The client keeps one connection to a relay alive and
//! hands inbound frames to the sync layer.

mod client;
mod server;
mod sessions;

pub use client::RelayClient;
pub use server::RelayServer;
pub use sessions::SessionCount;

/// The only path the relay accepts upgrades on.
pub const SYNC_PATH: &str = "/sync";

pub(crate) fn ws_config(max_frame_bytes: usize) -> tokio_tungstenite::tungstenite::protocol::WebSocketConfig {
    tokio_tungstenite::tungstenite::protocol::WebSocketConfig::default()
        .max_message_size(Some(max_frame_bytes))
        .max_frame_size(Some(max_frame_bytes))
}

/// First `max_chars` characters of a frame, for logs.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        preview.push_str("...");
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_frames() {
        let long = "x".repeat(150);
        assert_eq!(preview(&long, 100).len(), 103);
        assert_eq!(preview("short", 100), "short");
    }
}
