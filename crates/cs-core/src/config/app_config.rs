//! Bootstrap configuration DTO.
//!
//! Pure data mapped from TOML. No validation and no defaults beyond "absent
//! means empty"; the bootstrap layer decides what empty values mean.

use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Raw role string: `relay`, `client` or `both`. May be empty.
    pub role: String,

    /// Overrides the platform data directory when non-empty.
    pub data_dir: PathBuf,

    /// Whether to also write logs to a file.
    pub log_to_file: bool,
}

impl AppConfig {
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        Ok(Self {
            role: toml_value
                .get("general")
                .and_then(|g| g.get("role"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            data_dir: PathBuf::from(
                toml_value
                    .get("storage")
                    .and_then(|s| s.get("data_dir"))
                    .and_then(|v| v.as_str())
                    .unwrap_or(""),
            ),
            log_to_file: toml_value
                .get("logging")
                .and_then(|l| l.get("file"))
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }
}
