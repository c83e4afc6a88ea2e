mod capture_clipboard;
mod history;
mod sync_inbound;
mod sync_outbound;

pub use capture_clipboard::CaptureClipboardUseCase;
pub use history::ClipboardHistoryUseCase;
pub use sync_inbound::SyncInboundClipboardUseCase;
pub use sync_outbound::SyncOutboundClipboardUseCase;

use anyhow::{Context, Result};
use cs_core::security::SharedKey;
use cs_core::settings::SyncSettings;

/// Parse the configured pre-shared key. An empty setting disables encryption.
pub fn shared_key_from_settings(sync: &SyncSettings) -> Result<Option<SharedKey>> {
    if !sync.encryption_enabled() {
        return Ok(None);
    }
    let key = SharedKey::from_base64(&sync.encryption_key)
        .context("configured encryption key is not 32 bytes of base64")?;
    Ok(Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_disables_encryption() {
        let sync = SyncSettings::default();
        assert!(shared_key_from_settings(&sync).expect("parse").is_none());
    }

    #[test]
    fn malformed_key_is_an_error() {
        let sync = SyncSettings {
            encryption_key: "not-a-key".to_string(),
            ..SyncSettings::default()
        };
        assert!(shared_key_from_settings(&sync).is_err());
    }

    #[test]
    fn valid_key_is_parsed() {
        let key = SharedKey::from_bytes(&[3u8; 32]).expect("key");
        let sync = SyncSettings {
            encryption_key: key.to_base64(),
            ..SyncSettings::default()
        };
        assert_eq!(shared_key_from_settings(&sync).expect("parse"), Some(key));
    }
}
