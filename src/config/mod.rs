//! Application Configuration
//!
//! User settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// Overlay settings
    pub overlay: OverlaySettings,
    /// Hotkey settings
    pub hotkey: HotkeySettings,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log filter directive, overridden by `RUST_LOG`
    pub log_level: String,
}

impl GeneralConfig {
    /// Filter directive to install: a non-empty `RUST_LOG` wins over `log_level`
    pub fn log_filter(&self, rust_log: Option<&str>) -> String {
        match rust_log.map(str::trim) {
            Some(env) if !env.is_empty() => env.to_string(),
            _ => self.log_level.clone(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Overlay-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    /// How often the native window visibility is polled
    pub poll_interval_ms: u64,
    /// Show the overlay once at startup
    pub show_on_start: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            show_on_start: false,
        }
    }
}

impl OverlaySettings {
    /// Poll interval, never shorter than 1ms
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Global hotkey settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeySettings {
    /// Whether to register the global toggle hotkey
    pub enabled: bool,
    /// Key combination toggling the overlay, e.g. "Alt+Space"
    pub toggle: String,
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            toggle: "Alt+Space".to_string(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let proj_dirs = directories::ProjectDirs::from("com", "swii", "swii")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    let config_dir = proj_dirs.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;

    Ok(config_dir)
}

/// Load configuration from `path`, or from the default location when `None`.
///
/// Missing or unreadable files fall back to defaults. At the default
/// location a missing file is created with the defaults.
pub fn load_or_default(path: Option<&Path>) -> AppConfig {
    match path {
        Some(path) => load_from(path, false),
        None => match get_config_dir() {
            Ok(dir) => load_from(&dir.join(CONFIG_FILE_NAME), true),
            Err(e) => {
                warn!("No config directory available: {}", e);
                AppConfig::default()
            }
        },
    }
}

/// Load `path`, falling back to defaults. With `create`, a missing file is
/// written out with the defaults.
pub fn load_from(path: &Path, create: bool) -> AppConfig {
    if !path.exists() {
        let config = AppConfig::default();
        if create {
            match save_config(&config, path) {
                Ok(()) => info!("Wrote default configuration to {:?}", path),
                Err(e) => warn!("Could not write default configuration {:?}: {}", path, e),
            }
        } else {
            info!("Using default configuration");
        }
        return config;
    }

    match load_config(path) {
        Ok(config) => {
            info!("Loaded configuration from {:?}", path);
            config
        }
        Err(e) => {
            warn!("Ignoring invalid configuration {:?}: {}", path, e);
            AppConfig::default()
        }
    }
}
