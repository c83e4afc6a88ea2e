//! Dependency assembly.
//!
//! The only place that depends on cs-infra, cs-network and cs-app together.
//! It builds concrete adapters and hands them to the application layer as
//! port trait objects. No decisions beyond which role gets which parts.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cs_app::{SyncCoordinator, SyncDeps};
use cs_core::ports::{DeviceIdentityPort, SettingsPort};
use cs_core::{AppConfig, Settings};
use cs_infra::db::mappers::ClipboardItemRowMapper;
use cs_infra::db::pool::init_db_pool;
use cs_infra::db::repositories::DieselClipboardHistoryRepository;
use cs_infra::db::DieselSqliteExecutor;
use cs_infra::fs::AppDirs;
use cs_infra::{FileSettingsRepository, LocalDeviceIdentity, SystemClock, XChaChaEncryption};
use cs_network::{NetworkDiscoverer, RelayClient, RelayServer, ServerAdvertiser};
use tracing::info;

/// Which parts a process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    Relay,
    #[default]
    Client,
    Both,
}

impl Role {
    pub fn runs_relay(&self) -> bool {
        matches!(self, Role::Relay | Role::Both)
    }

    pub fn runs_client(&self) -> bool {
        matches!(self, Role::Client | Role::Both)
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    /// Empty means the default role.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "client" => Ok(Role::Client),
            "relay" | "server" => Ok(Role::Relay),
            "both" => Ok(Role::Both),
            other => bail!("unknown role '{}', expected relay, client or both", other),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Relay => "relay",
            Role::Client => "client",
            Role::Both => "both",
        };
        f.write_str(name)
    }
}

/// A configured data dir roots everything; otherwise platform directories.
pub fn resolve_app_dirs(config: &AppConfig) -> Result<AppDirs> {
    if config.data_dir.as_os_str().is_empty() {
        AppDirs::from_platform()
    } else {
        Ok(AppDirs::rooted_at(&config.data_dir))
    }
}

pub fn ensure_dirs(dirs: &AppDirs) -> Result<()> {
    for dir in [&dirs.config_dir, &dirs.data_dir, &dirs.logs_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

pub async fn load_settings(dirs: &AppDirs) -> Result<Settings> {
    let repo = FileSettingsRepository::in_dir(&dirs.config_dir);
    let settings = repo.load().await.context("failed to load settings")?;
    info!(path = %repo.path().display(), "settings loaded");
    Ok(settings)
}

/// Relay server plus the advertiser announcing it.
pub struct RelayComponents {
    pub server: Arc<RelayServer>,
    pub advertiser: ServerAdvertiser,
}

pub fn build_relay(settings: &Settings, dirs: &AppDirs) -> RelayComponents {
    let server = Arc::new(RelayServer::new(settings.relay.clone()));
    let identity: Arc<dyn DeviceIdentityPort> =
        Arc::new(LocalDeviceIdentity::relay(&dirs.config_dir));
    let advertiser = ServerAdvertiser::new(
        settings.discovery.clone(),
        settings.relay.server_name.clone(),
        settings.relay.port,
        identity,
        Arc::new(SystemClock),
        server.clone(),
    );
    RelayComponents { server, advertiser }
}

pub fn build_coordinator(settings: &Settings, dirs: &AppDirs) -> Result<SyncCoordinator> {
    let db_path = dirs.database_path();
    let db_url = db_path
        .to_str()
        .context("database path is not valid UTF-8")?;
    let pool = init_db_pool(db_url).context("failed to open clipboard history database")?;
    let history = DieselClipboardHistoryRepository::new(
        DieselSqliteExecutor::new(pool),
        ClipboardItemRowMapper,
    );

    let identity: Arc<dyn DeviceIdentityPort> = Arc::new(LocalDeviceIdentity::new(&dirs.config_dir));
    let discovery = NetworkDiscoverer::new(
        settings.discovery.clone(),
        identity.clone(),
        Arc::new(SystemClock),
    );
    let transport = RelayClient::new(
        settings.sync.reconnect_delay(),
        settings.relay.max_frame_bytes,
    );

    let deps = SyncDeps {
        history: Arc::new(history),
        transport: Arc::new(transport),
        discovery: Arc::new(discovery),
        encryption: Arc::new(XChaChaEncryption),
        device_identity: identity,
    };
    SyncCoordinator::new(deps, settings)
}
