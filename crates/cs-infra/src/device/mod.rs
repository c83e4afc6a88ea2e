//! Local device identity.
//!
//! The id lives as plain text in the config directory. It is read (or
//! generated) at most once per process and cached; storage failures fall back
//! to a fresh in-memory id so callers never see an error.

mod storage;

use std::path::PathBuf;
use std::sync::OnceLock;

use cs_core::ports::DeviceIdentityPort;
use cs_core::DeviceId;
use tracing::{info, warn};

const CLIENT_PREFIX: &str = "device";
const CLIENT_ID_FILE: &str = "device_id.txt";
const RELAY_PREFIX: &str = "server";
const RELAY_ID_FILE: &str = "relay_id.txt";

pub struct LocalDeviceIdentity {
    config_dir: PathBuf,
    prefix: &'static str,
    file_name: &'static str,
    cached: OnceLock<DeviceId>,
}

impl LocalDeviceIdentity {
    /// Identity of a syncing client installation.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            prefix: CLIENT_PREFIX,
            file_name: CLIENT_ID_FILE,
            cached: OnceLock::new(),
        }
    }

    /// Identity a relay advertises. Kept apart from the client id so a
    /// process running both roles does not drop its own relay as a self-echo.
    pub fn relay(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            prefix: RELAY_PREFIX,
            file_name: RELAY_ID_FILE,
            cached: OnceLock::new(),
        }
    }

    fn load_or_create(&self) -> DeviceId {
        match storage::load_from_disk(&self.config_dir, self.file_name) {
            Ok(Some(id)) => return id,
            Ok(None) => {}
            Err(err) => warn!(error = %err, "failed to read persisted device id, generating a new one"),
        }

        let id = DeviceId::generate(self.prefix);
        match storage::save_to_disk(&self.config_dir, self.file_name, &id) {
            Ok(()) => info!(device_id = %id, "created new device id"),
            Err(err) => {
                warn!(device_id = %id, error = %err, "failed to persist device id, using it for this run only")
            }
        }
        id
    }
}

impl DeviceIdentityPort for LocalDeviceIdentity {
    fn current_device_id(&self) -> DeviceId {
        self.cached.get_or_init(|| self.load_or_create()).clone()
    }
}
