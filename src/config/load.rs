use crate::config::types::{Config, UserSettings};
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::Path;

/// 設定檔預設位置（目前工作目錄）
pub const SETTINGS_FILE: &str = "settings.json";

impl Config {
    /// 讀取 `settings.json`，不存在或無法解析時使用預設值
    pub fn new() -> Result<Self> {
        let settings = Self::load_settings(Path::new(SETTINGS_FILE)).unwrap_or_else(|e| {
            warn!("無法載入設定，改用預設值: {e:#}");
            UserSettings::default()
        });

        Ok(Self { settings })
    }

    /// 從指定路徑讀取設定，錯誤會回傳給呼叫端
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(Self {
            settings: Self::load_settings(path)?,
        })
    }

    fn load_settings(path: &Path) -> Result<UserSettings> {
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }
}
