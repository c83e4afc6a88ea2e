//! Port interfaces for the application layer
//!
//! Ports define the contract between the use cases and the infrastructure or
//! network adapters that implement them. Use cases only ever hold
//! `Arc<dyn Port>` values.

mod clipboard_history;
mod clipboard_manager;
mod clock;
pub mod device_identity;
pub mod discovery;
pub mod encryption;
pub mod errors;
pub mod relay_transport;
pub mod settings;

pub use clipboard_history::ClipboardHistoryPort;
pub use clipboard_manager::ClipboardManagerPort;
pub use clock::ClockPort;
pub use device_identity::DeviceIdentityPort;
pub use discovery::DiscoveryPort;
pub use encryption::EncryptionPort;
pub use errors::{DiscoveryError, StoreError, TransportError};
pub use relay_transport::RelayTransportPort;
pub use settings::{SettingsMigrationPort, SettingsPort};
