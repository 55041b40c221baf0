use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "config.json";

pub fn app_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    base.join("reflex_overlay")
}

pub fn default_config_path() -> PathBuf { app_data_dir().join(CONFIG_FILE_NAME) }

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevelSetting {
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevelSetting {
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevelSetting::Info => tracing::Level::INFO,
            LogLevelSetting::Warn => tracing::Level::WARN,
            LogLevelSetting::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WindowSize {
    pub width: f32,
    pub height: f32,
}

impl WindowSize {
    pub const fn new(width: f32, height: f32) -> Self { Self { width, height } }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    /// Track catalog served to the browser.
    pub catalog_path: PathBuf,
    /// Seconds between unconditional track list refreshes.
    pub refresh_interval_secs: u64,
    /// Shown when a track's own preview image is missing.
    pub default_preview_image: Option<PathBuf>,
    /// Least severe application log level mirrored into the log window.
    pub log_min_level: LogLevelSetting,
    pub track_window: WindowSize,
    pub log_window: WindowSize,
    pub preview_pane: WindowSize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            catalog_path: app_data_dir().join("catalog.json"),
            refresh_interval_secs: 10,
            default_preview_image: None,
            log_min_level: LogLevelSetting::Info,
            track_window: WindowSize::new(960.0, 982.0),
            log_window: WindowSize::new(934.0, 244.0),
            preview_pane: WindowSize::new(656.0, 376.0),
        }
    }
}

impl OverlayConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        let cfg: OverlayConfig =
            serde_json::from_slice(&bytes).with_context(|| format!("parse config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load `path`, falling back to defaults when it is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("{e:#}; using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json).with_context(|| format!("write config {}", path.display()))?;
        Ok(())
    }

    /// Never shorter than one second so a bad config cannot hammer the service.
    pub fn refresh_interval(&self) -> Duration { Duration::from_secs(self.refresh_interval_secs.max(1)) }
}
