use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::id_macro::impl_id;

/// Stable per-installation identifier.
///
/// Every clipboard envelope and discovery advertisement is labelled with it,
/// so receivers can drop their own echoes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl_id!(DeviceId);

impl DeviceId {
    /// Generate a fresh `<prefix>-<8 hex chars>` identifier.
    pub fn generate(prefix: &str) -> Self {
        let mut suffix = [0u8; 4];
        rand::rng().fill_bytes(&mut suffix);
        Self(format!("{}-{}", prefix, hex::encode(suffix)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_has_prefix_and_hex_suffix() {
        let id = DeviceId::generate("device");
        let suffix = id.as_str().strip_prefix("device-").expect("prefix");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(DeviceId::generate("device"), DeviceId::generate("device"));
    }

    #[test]
    fn device_id_from_str() {
        let id: DeviceId = "dev-A".into();
        assert_eq!(id.as_str(), "dev-A");
        assert!(!id.is_empty());
        assert!(DeviceId::new("  ").is_empty());
    }
}
