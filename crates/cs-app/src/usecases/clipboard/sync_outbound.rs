use std::sync::Arc;

use anyhow::{Context, Result};
use cs_core::ports::{DeviceIdentityPort, EncryptionPort, RelayTransportPort, TransportError};
use cs_core::security::SharedKey;
use cs_core::{ClipboardItem, ClipboardOrigin, SyncEnvelope};
use tracing::{debug, info, info_span, warn, Instrument};

/// Send a locally captured item to the relay.
///
/// Remote-origin items are never sent back out, which breaks rebroadcast
/// loops. Nothing is queued while disconnected.
pub struct SyncOutboundClipboardUseCase {
    transport: Arc<dyn RelayTransportPort>,
    encryption: Arc<dyn EncryptionPort>,
    device_identity: Arc<dyn DeviceIdentityPort>,
    key: Option<SharedKey>,
    max_payload_bytes: usize,
}

impl SyncOutboundClipboardUseCase {
    pub fn new(
        transport: Arc<dyn RelayTransportPort>,
        encryption: Arc<dyn EncryptionPort>,
        device_identity: Arc<dyn DeviceIdentityPort>,
        key: Option<SharedKey>,
        max_payload_bytes: usize,
    ) -> Self {
        Self {
            transport,
            encryption,
            device_identity,
            key,
            max_payload_bytes,
        }
    }

    /// Returns `true` when a frame was handed to the transport.
    pub async fn execute(&self, item: &ClipboardItem, origin: ClipboardOrigin) -> Result<bool> {
        let span = info_span!(
            "usecase.clipboard.sync_outbound.execute",
            origin = origin.as_str(),
            hash = %item.content_hash,
            size = item.size(),
        );

        async move {
            if origin.is_remote() {
                debug!("skipping outbound sync for remote item");
                return Ok(false);
            }

            if !self.transport.status().is_connected() {
                debug!("skipping outbound sync, relay not connected");
                return Ok(false);
            }

            if item.kind.is_binary() && item.size() > self.max_payload_bytes {
                warn!(
                    limit = self.max_payload_bytes,
                    "skipping outbound sync, payload exceeds relay ceiling"
                );
                return Ok(false);
            }

            let mut envelope =
                SyncEnvelope::from_item(item, self.device_identity.current_device_id());
            if let Some(key) = &self.key {
                let ciphertext = self
                    .encryption
                    .encrypt(&item.content, key)
                    .context("failed to encrypt outbound clipboard payload")?;
                envelope.set_content_bytes(&ciphertext, true);
            }

            let frame = envelope
                .to_json()
                .context("failed to encode outbound envelope")?;

            match self.transport.send_frame(frame).await {
                Ok(()) => {
                    info!(encrypted = envelope.encrypted, "clipboard item sent to relay");
                    Ok(true)
                }
                Err(TransportError::NotConnected) => {
                    debug!("relay disconnected before send");
                    Ok(false)
                }
                Err(e) => Err(e).context("failed to send clipboard frame"),
            }
        }
        .instrument(span)
        .await
    }
}
