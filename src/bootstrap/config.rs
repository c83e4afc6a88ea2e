//! App config loading.
//!
//! Pure data loading: the file is read and mapped to [`AppConfig`] as-is.
//! Interpreting empty values (role, data dir) is left to the wiring layer.

use std::path::{Path, PathBuf};

use anyhow::Context;
use cs_core::AppConfig;

/// Environment variable that points at the config file.
pub const CONFIG_ENV: &str = "CLIPSYNC_CONFIG";

const CONFIG_FILE: &str = "config.toml";

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Fails when the file cannot be read or is not valid TOML.
pub fn load_config(config_path: &Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    AppConfig::from_toml(&toml_value)
}

/// `$CLIPSYNC_CONFIG`, else `<config_dir>/clipsync/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs::config_dir().map(|dir| dir.join("clipsync").join(CONFIG_FILE)),
    }
}

/// Load the config if the file exists. A missing file means defaults.
pub fn load_config_or_default(config_path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match config_path {
        Some(path) if path.exists() => load_config(path),
        _ => Ok(AppConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_valid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
            [general]
            role = "both"

            [storage]
            data_dir = "/tmp/clipsync"

            [logging]
            file = true
            "#,
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.role, "both");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/clipsync"));
        assert!(config.log_to_file);
    }

    #[test]
    fn unknown_role_is_kept_verbatim() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[general]\nrole = \"observer\"\n").unwrap();

        assert_eq!(load_config(file.path()).unwrap().role, "observer");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/this/path/does/not/exist/config.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[general\nrole = ").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config as TOML"));
    }

    #[test]
    fn absent_file_yields_defaults() {
        let config =
            load_config_or_default(Some(Path::new("/this/path/does/not/exist.toml"))).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(load_config_or_default(None).unwrap(), AppConfig::default());
    }
}
