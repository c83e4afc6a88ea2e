//! File I/O for the persisted device id.

use anyhow::{Context, Result};
use std::path::Path;

use cs_core::DeviceId;

/// `None` when the file is missing or blank.
pub(crate) fn load_from_disk(config_dir: &Path, file_name: &str) -> Result<Option<DeviceId>> {
    let path = config_dir.join(file_name);

    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("read device id file failed: {}", path.display()))?;

    let id_str = content.trim();
    if id_str.is_empty() {
        return Ok(None);
    }

    Ok(Some(DeviceId::new(id_str)))
}

pub(crate) fn save_to_disk(config_dir: &Path, file_name: &str, id: &DeviceId) -> Result<()> {
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("create config dir failed: {}", config_dir.display()))?;

    let path = config_dir.join(file_name);

    // Rename can fail across devices; fall back to a direct write.
    let tmp_path = path.with_extension("txt.tmp");
    std::fs::write(&tmp_path, id.as_str())
        .with_context(|| format!("write temp device id failed: {}", tmp_path.display()))?;

    match std::fs::rename(&tmp_path, &path) {
        Ok(_) => Ok(()),
        Err(rename_err) => {
            std::fs::write(&path, id.as_str()).with_context(|| {
                format!(
                    "direct write device id failed after rename error ({}): {}",
                    rename_err,
                    path.display()
                )
            })?;
            let _ = std::fs::remove_file(&tmp_path);
            Ok(())
        }
    }
}
