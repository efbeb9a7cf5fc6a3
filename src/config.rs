/// Application configuration
///
/// Loaded from `config.toml` in the platform config directory:
/// - Linux: ~/.config/arc-studio/config.toml
/// - macOS: ~/Library/Application Support/arc-studio/config.toml
/// - Windows: %APPDATA%\arc-studio\config.toml
///
/// A missing file means defaults. A broken file is logged and also falls back
/// to defaults so the gallery always starts.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::Result;

const APP_DIR: &str = "arc-studio";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "arc_studio.db";

pub const DEFAULT_ENDPOINT: &str = "https://image.pollinations.ai/prompt";
pub const DEFAULT_USERNAME: &str = "@user";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the generation endpoint; the prompt becomes the next path segment
    pub endpoint: String,
    /// Upper bound for a single generation or download request
    pub request_timeout_secs: u64,
    /// Overrides the default database location
    pub database_path: Option<PathBuf>,
    /// Shown on records created before a username was set
    pub default_username: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            database_path: None,
            default_username: DEFAULT_USERNAME.to_string(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Where the SQLite store lives
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."));
            path.push(APP_DIR);
            path.push(DATABASE_FILE);
            path
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_DIR);
        path.push(CONFIG_FILE);
        path
    })
}

/// Load the config from the default location, writing the defaults there
/// on first run so they can be edited
pub fn load() -> AppConfig {
    let Some(path) = default_config_path() else {
        return AppConfig::default();
    };
    if path.exists() {
        return load_from_path(&path);
    }

    let config = AppConfig::default();
    match save_to_path(&config, &path) {
        Ok(()) => info!("📝 Wrote default config to {}", path.display()),
        Err(e) => warn!("Could not write default config {}: {}", path.display(), e),
    }
    config
}

pub fn load_from_path(path: &Path) -> AppConfig {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return AppConfig::default();
        }
    };

    toml::from_str(&content).unwrap_or_else(|e| {
        warn!("Ignoring invalid config {}: {}", path.display(), e);
        AppConfig::default()
    })
}

pub fn save_to_path(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
