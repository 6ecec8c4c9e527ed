use std::path::{Path, PathBuf};

use clocktone_services::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;
/// Widest offset any real time zone uses (UTC-12 to UTC+14)
pub const MAX_UTC_OFFSET_HOURS: f64 = 14.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Fixed offset applied to the system clock; 0 is GMT
    pub utc_offset_hours: f64,
    pub tick_interval_ms: u64,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 0.0,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            engine: EngineConfig::default(),
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clocktone")
        .join("config.toml")
}

pub fn parse_config(text: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Missing or unreadable files fall back to the defaults
pub fn load_config(path: &Path) -> AppConfig {
    let Ok(text) = std::fs::read_to_string(path) else {
        debug!(path = %path.display(), "No config file, using defaults");
        return AppConfig::default();
    };
    parse_config(&text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
        AppConfig::default()
    })
}
