mod defaults;
pub mod model;

pub use model::{
    DiscoverySettings, HistorySettings, RelaySettings, Settings, SyncSettings,
    CURRENT_SCHEMA_VERSION,
};
