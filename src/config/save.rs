use crate::config::types::UserSettings;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// 將設定寫成格式化的 JSON
pub fn save_settings_to(path: &Path, settings: &UserSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;

    fs::write(path, content)
        .with_context(|| format!("Failed to write settings to {}", path.display()))?;

    Ok(())
}
