//! TOML configuration
//!
//! Every field has a default, so a missing file or a partial file both load.
//! The file lives at `<config dir>/kidsplay/config.toml` unless
//! `KIDSPLAY_CONFIG` points somewhere else.

use crate::api::ApiSettings;
use crate::gestures::GestureSettings;
use crate::playback::PlaybackSettings;
use crate::runtime::RuntimeSettings;
use crate::scan::ScanSettings;
use crate::swipe::SwipeSettings;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR: &str = "kidsplay";
const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "KIDSPLAY_CONFIG";

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct KidsModeConfig {
    pub api: ApiSettings,
    pub gestures: GestureSettings,
    pub swipe: SwipeSettings,
    pub playback: PlaybackSettings,
    pub scan: ScanSettings,
}

impl KidsModeConfig {
    /// Default location, honoring `KIDSPLAY_CONFIG`
    pub fn path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        let mut path = dirs::config_dir().ok_or_else(|| eyre!("No config directory on this system"))?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Loads from the default location, writing defaults there first if needed
    pub async fn load() -> Result<Self> {
        let path = Self::path()?;
        ensure_default_config(&path).await?;
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config {}: {}", path.display(), e))?;
        let config: KidsModeConfig = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config {}: {}", path.display(), e))?;
        info!("Loaded config from {}", path.display());
        debug!("Config: {:?}", config);
        Ok(config)
    }

    /// Splits out the settings the runtime components take
    pub fn runtime_settings(&self) -> RuntimeSettings {
        RuntimeSettings {
            gestures: self.gestures.clone(),
            swipe: self.swipe.clone(),
            playback: self.playback.clone(),
            scan: self.scan.clone(),
        }
    }
}

/// Writes a default config to `path` unless a file is already there
pub async fn ensure_default_config(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path)
        .await
        .map_err(|e| eyre!("Failed to check if config exists: {}", e))?
    {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
    }

    let content = toml::to_string_pretty(&KidsModeConfig::default())
        .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| eyre!("Failed to write default config: {}", e))?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}
