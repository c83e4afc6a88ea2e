//! Relay wire message.
//!
//! The relay forwards these frames opaquely; only endpoints decode them.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clipboard::{normalize_category, normalize_tags, ClipboardItem, ClipboardKind};
use crate::{ContentHash, DeviceId};

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope content is not valid base64")]
    Base64(#[from] base64::DecodeError),

    #[error("content hash mismatch: envelope {expected}, computed {actual}")]
    HashMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEnvelope {
    #[serde(rename = "type", deserialize_with = "wire_kind::deserialize")]
    pub kind: ClipboardKind,

    /// Base64 of the raw bytes, or of `nonce || ciphertext` when `encrypted`.
    pub content: String,

    #[serde(with = "wire_timestamp")]
    pub timestamp: NaiveDateTime,

    pub hash: ContentHash,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub category: Option<String>,

    pub device_id: DeviceId,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub encrypted: bool,
}

impl SyncEnvelope {
    /// Package an item as a plaintext envelope.
    pub fn from_item(item: &ClipboardItem, device_id: DeviceId) -> Self {
        Self {
            kind: item.kind,
            content: STANDARD.encode(&item.content),
            timestamp: item.created_at,
            hash: item.content_hash.clone(),
            tags: item.tags.iter().cloned().collect(),
            category: Some(item.category.clone()),
            device_id,
            encrypted: false,
        }
    }

    pub fn content_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(STANDARD.decode(self.content.as_bytes())?)
    }

    pub fn set_content_bytes(&mut self, bytes: &[u8], encrypted: bool) {
        self.content = STANDARD.encode(bytes);
        self.encrypted = encrypted;
    }

    /// Rebuild a clipboard item from already-decrypted content.
    ///
    /// Received items are never pinned. The hash is recomputed and must match
    /// the advertised one.
    pub fn into_item(self, content: Vec<u8>) -> Result<ClipboardItem, EnvelopeError> {
        let actual = ContentHash::of(&content);
        if actual != self.hash {
            return Err(EnvelopeError::HashMismatch {
                expected: self.hash,
                actual,
            });
        }

        Ok(ClipboardItem {
            kind: self.kind,
            content,
            created_at: self.timestamp,
            content_hash: actual,
            tags: normalize_tags(self.tags),
            category: normalize_category(self.category.as_deref().unwrap_or_default()),
            pinned: false,
        })
    }

    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Written upper case; any case accepted on read.
mod wire_kind {
    use serde::{Deserialize, Deserializer};

    use crate::clipboard::ClipboardKind;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ClipboardKind, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `yyyy-MM-ddTHH:mm:ss` on the wire; fractional seconds accepted on read.
mod wire_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
    const READ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(WRITE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, READ_FORMAT).map_err(serde::de::Error::custom)
    }
}
