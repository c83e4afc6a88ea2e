pub mod db;
pub mod device;
pub mod fs;
pub mod security;
pub mod settings;
pub mod time;

pub use device::LocalDeviceIdentity;
pub use security::XChaChaEncryption;
pub use settings::FileSettingsRepository;
pub use time::SystemClock;
