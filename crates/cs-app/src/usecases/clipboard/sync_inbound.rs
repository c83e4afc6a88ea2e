use std::sync::Arc;

use anyhow::{Context, Result};
use cs_core::ports::{ClipboardHistoryPort, DeviceIdentityPort, EncryptionPort};
use cs_core::security::SharedKey;
use cs_core::{ClipboardEvent, ClipboardItem, SyncEnvelope};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::event_bus::ClipboardEventBus;

/// Apply one frame received from the relay.
///
/// Frames from this device are discarded. Content already in the history is
/// not stored or published again, so redelivery is harmless.
pub struct SyncInboundClipboardUseCase {
    history: Arc<dyn ClipboardHistoryPort>,
    encryption: Arc<dyn EncryptionPort>,
    device_identity: Arc<dyn DeviceIdentityPort>,
    bus: ClipboardEventBus,
    key: Option<SharedKey>,
    max_history_items: usize,
}

impl SyncInboundClipboardUseCase {
    pub fn new(
        history: Arc<dyn ClipboardHistoryPort>,
        encryption: Arc<dyn EncryptionPort>,
        device_identity: Arc<dyn DeviceIdentityPort>,
        bus: ClipboardEventBus,
        key: Option<SharedKey>,
        max_history_items: usize,
    ) -> Self {
        Self {
            history,
            encryption,
            device_identity,
            bus,
            key,
            max_history_items,
        }
    }

    /// Returns the stored item when the frame carried something new.
    pub async fn execute(&self, frame: &str) -> Result<Option<ClipboardItem>> {
        let envelope =
            SyncEnvelope::from_json(frame).context("failed to decode inbound envelope")?;

        let span = info_span!(
            "usecase.clipboard.sync_inbound.execute",
            origin_device_id = %envelope.device_id,
            hash = %envelope.hash,
            kind = envelope.kind.as_str(),
        );

        async move {
            if envelope.device_id == self.device_identity.current_device_id() {
                debug!("ignoring inbound frame from local device");
                return Ok(None);
            }

            let raw = envelope
                .content_bytes()
                .context("failed to decode inbound content")?;

            let content = match (&self.key, envelope.encrypted) {
                (Some(key), true) => self
                    .encryption
                    .decrypt(&raw, key)
                    .context("failed to decrypt inbound clipboard payload")?,
                (Some(_), false) => {
                    warn!("dropping unencrypted frame, encryption is configured");
                    return Ok(None);
                }
                (None, true) => {
                    warn!("dropping encrypted frame, no key configured");
                    return Ok(None);
                }
                (None, false) => raw,
            };

            let item = envelope
                .into_item(content)
                .context("inbound content does not match its hash")?;

            let inserted = self
                .history
                .upsert_and_enforce_history(&item, self.max_history_items)
                .await
                .context("failed to persist inbound clipboard item")?;
            if !inserted {
                debug!("inbound item already in history");
                return Ok(None);
            }

            info!(preview = %item.preview(40), "inbound clipboard item stored");
            self.bus.publish(ClipboardEvent::remote(item.clone()));
            Ok(Some(item))
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sqlite_history, FixedIdentity};
    use cs_core::{ClipboardOrigin, DeviceId};
    use cs_infra::XChaChaEncryption;

    fn frame_from(device: &str, item: &ClipboardItem) -> String {
        SyncEnvelope::from_item(item, DeviceId::new(device))
            .to_json()
            .expect("encode")
    }

    fn encrypted_frame_from(device: &str, item: &ClipboardItem, key: &SharedKey) -> String {
        let mut envelope = SyncEnvelope::from_item(item, DeviceId::new(device));
        let ciphertext = XChaChaEncryption.encrypt(&item.content, key).expect("encrypt");
        envelope.set_content_bytes(&ciphertext, true);
        envelope.to_json().expect("encode")
    }

    fn use_case(
        history: Arc<dyn ClipboardHistoryPort>,
        bus: ClipboardEventBus,
        key: Option<SharedKey>,
    ) -> SyncInboundClipboardUseCase {
        SyncInboundClipboardUseCase::new(
            history,
            Arc::new(XChaChaEncryption),
            Arc::new(FixedIdentity::new("dev-B")),
            bus,
            key,
            100,
        )
    }

    #[tokio::test]
    async fn redelivered_frame_yields_one_item() {
        let (_dir, history) = sqlite_history();
        let bus = ClipboardEventBus::new();
        let mut events = bus.subscribe();
        let uc = use_case(history.clone(), bus, None);

        let item = ClipboardItem::text("hello");
        let frame = frame_from("dev-A", &item);

        let first = uc.execute(&frame).await.expect("first delivery");
        assert_eq!(first.map(|i| i.content_hash), Some(item.content_hash.clone()));
        assert!(uc.execute(&frame).await.expect("redelivery").is_none());

        assert_eq!(history.count().await.expect("count"), 1);
        match events.try_recv().expect("one event") {
            ClipboardEvent::Changed { origin, .. } => assert_eq!(origin, ClipboardOrigin::Remote),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn own_frames_are_discarded() {
        let (_dir, history) = sqlite_history();
        let uc = use_case(history.clone(), ClipboardEventBus::new(), None);

        let frame = frame_from("dev-B", &ClipboardItem::text("echo"));
        assert!(uc.execute(&frame).await.expect("self echo").is_none());
        assert_eq!(history.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn received_tags_and_category_are_kept_unpinned() {
        let (_dir, history) = sqlite_history();
        let uc = use_case(history.clone(), ClipboardEventBus::new(), None);

        let item = ClipboardItem::text("tagged")
            .with_tags(["Work"])
            .with_category("Notes")
            .pinned(true);
        let stored = uc
            .execute(&frame_from("dev-A", &item))
            .await
            .expect("deliver")
            .expect("new item");

        assert!(!stored.pinned);
        assert_eq!(stored.category, "Notes");
        assert!(stored.tags.contains("work"));
    }

    #[tokio::test]
    async fn tampered_content_is_rejected() {
        let (_dir, history) = sqlite_history();
        let uc = use_case(history.clone(), ClipboardEventBus::new(), None);

        let mut envelope = SyncEnvelope::from_item(&ClipboardItem::text("original"), DeviceId::new("dev-A"));
        envelope.set_content_bytes(b"replaced", false);
        let frame = envelope.to_json().expect("encode");

        assert!(uc.execute(&frame).await.is_err());
        assert_eq!(history.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn malformed_frame_is_an_error() {
        let (_dir, history) = sqlite_history();
        let uc = use_case(history, ClipboardEventBus::new(), None);
        assert!(uc.execute("{\"type\":\"TEXT\"").await.is_err());
    }

    #[tokio::test]
    async fn encrypted_frames_follow_key_configuration() {
        let key = XChaChaEncryption.generate_key().expect("key");
        let other_key = XChaChaEncryption.generate_key().expect("key");
        let item = ClipboardItem::text("secret");

        let (_dir, history) = sqlite_history();
        let with_key = use_case(history.clone(), ClipboardEventBus::new(), Some(key.clone()));
        assert!(with_key
            .execute(&frame_from("dev-A", &ClipboardItem::text("plain")))
            .await
            .expect("plain frame")
            .is_none());
        assert!(with_key
            .execute(&encrypted_frame_from("dev-A", &item, &other_key))
            .await
            .is_err());
        assert!(with_key
            .execute(&encrypted_frame_from("dev-A", &item, &key))
            .await
            .expect("decrypt")
            .is_some());

        let (_dir2, history2) = sqlite_history();
        let without_key = use_case(history2.clone(), ClipboardEventBus::new(), None);
        assert!(without_key
            .execute(&encrypted_frame_from("dev-A", &item, &key))
            .await
            .expect("encrypted frame")
            .is_none());
        assert_eq!(history2.count().await.expect("count"), 0);
    }
}
