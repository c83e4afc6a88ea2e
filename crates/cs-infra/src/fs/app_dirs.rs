use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "clipsync";

/// Where ClipSync keeps its files.
///
/// The directories are not created here; callers create them when needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl AppDirs {
    /// Platform defaults, e.g. `~/.config/clipsync` and `~/.local/share/clipsync` on Linux.
    pub fn from_platform() -> Result<Self> {
        let config_base = dirs::config_dir().context("unable to resolve platform config directory")?;
        let data_base = dirs::data_dir().context("unable to resolve platform data directory")?;
        let data_dir = data_base.join(APP_DIR_NAME);
        Ok(Self {
            config_dir: config_base.join(APP_DIR_NAME),
            logs_dir: data_dir.join("logs"),
            data_dir,
        })
    }

    /// Everything under one root; used when the data directory is configured.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.to_path_buf(),
            logs_dir: root.join("logs"),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("clipboard_history.db")
    }
}
