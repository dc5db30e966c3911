//! TOML-based configuration system.
//!
//! Loads settings from a `config.toml` file, falling back to defaults that
//! reproduce the stock reader shell. Every struct implements `Default` so a
//! missing or partial config file behaves like no file at all.
//!
//! ## Config file search order
//!
//! 1. `TRIALREADER_CONFIG` environment variable (explicit override)
//! 2. Next to the executable (`<exe_dir>/config.toml`)
//! 3. Platform config directory (`<config_dir>/TrialReader/config.toml`)
//! 4. Current working directory (`./config.toml`)
//! 5. No file found → `Config::default()`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// The one page this shell exists to show.
pub const DEFAULT_START_URL: &str = "https://quwarm.github.io/Trial-and-Error-Reading/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Config structs
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub window: WindowConfig,
    pub downloads: DownloadsConfig,
    pub bridge: BridgeConfig,
    pub servo: ServoConfig,
    pub privacy: PrivacyConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub start_url: String,
    pub window_title: String,
}

/// Window dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
}

/// Download queue and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    /// Destination directory. Empty = the platform downloads directory.
    pub directory: String,
    pub allow_metered: bool,
    pub allow_roaming: bool,
    /// Show a notice when a queued download finishes.
    pub notify_on_completion: bool,
}

/// Script-to-host bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name of the object exposed on `window` to page script.
    pub namespace: String,
}

/// Servo engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    /// Maximum layout threads. 0 = auto-detect from CPU count.
    pub layout_threads: i64,
    /// HTTP cache size used when the cache is not bypassed.
    pub cache_size: i64,
    /// User-agent string. Empty = default UA.
    pub user_agent: String,
    /// Pre-cache GPU shaders at startup.
    pub precache_shaders: bool,
}

/// Privacy toggles applied to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    pub disable_geolocation: bool,
    pub disable_bluetooth: bool,
    pub disable_notifications: bool,
    pub disable_webrtc: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Default impls
// ─────────────────────────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            window_title: "Trial and Error Reading".to_string(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            allow_metered: true,
            allow_roaming: true,
            notify_on_completion: true,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            namespace: "Android".to_string(),
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            layout_threads: 0,
            cache_size: 50_000,
            user_agent: String::new(),
            precache_shaders: true,
        }
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            disable_geolocation: true,
            disable_bluetooth: true,
            disable_notifications: true,
            disable_webrtc: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Loads configuration from the standard locations. Never panics:
    /// returns defaults if no file is found or if parsing fails.
    pub fn load() -> Self {
        let Some(path) = find_config_path() else {
            info!("No config file found, using defaults");
            return Config::default();
        };

        match Self::from_path(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Configuration loaded");
                config
            }
            Err(e) => {
                warn!(error = %e, "Unusable config, using defaults");
                Config::default()
            }
        }
    }

    /// Parses one config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Explicit downloads directory, if configured.
    pub fn downloads_dir_override(&self) -> Option<PathBuf> {
        let dir = self.downloads.directory.trim();
        (!dir.is_empty()).then(|| PathBuf::from(dir))
    }
}

/// Searches for a config file in the standard locations.
fn find_config_path() -> Option<PathBuf> {
    // 1. Explicit env var override
    if let Ok(path) = std::env::var("TRIALREADER_CONFIG") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
    }

    // 2. Next to the executable
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 3. Platform config directory
    if let Some(dir) = platform_config_dir() {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 4. Current working directory
    let p = PathBuf::from("config.toml");
    if p.is_file() {
        return Some(p);
    }

    None
}

/// `TrialReader` under the platform config directory
/// (`%APPDATA%`, `~/Library/Application Support`, `$XDG_CONFIG_HOME`).
fn platform_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("TrialReader"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let c = Config::default();
        assert_eq!(c.general.start_url, DEFAULT_START_URL);
        assert_eq!(c.window.width, 1024);
        assert_eq!(c.bridge.namespace, "Android");
        assert!(c.downloads.allow_metered);
        assert!(c.downloads.allow_roaming);
        assert!(c.downloads.notify_on_completion);
        assert_eq!(c.servo.cache_size, 50_000);
        assert!(c.downloads_dir_override().is_none());
    }

    #[test]
    fn test_empty_toml_returns_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.general.start_url, DEFAULT_START_URL);
        assert!(config.privacy.disable_webrtc);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let toml = r#"
[downloads]
directory = "/tmp/reader-downloads"
allow_roaming = false
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.downloads_dir_override(),
            Some(PathBuf::from("/tmp/reader-downloads"))
        );
        assert!(!config.downloads.allow_roaming);
        assert!(config.downloads.allow_metered); // default
        assert_eq!(config.bridge.namespace, "Android"); // default
    }

    #[test]
    fn test_blank_directory_means_platform_default() {
        let config: Config = toml::from_str("[downloads]\ndirectory = \"  \"\n").unwrap();
        assert!(config.downloads_dir_override().is_none());
    }

    #[test]
    fn test_from_path_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[window\nwidth = ").unwrap();
        assert!(matches!(
            Config::from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::from_path(&dir.path().join("absent.toml")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_full_toml_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.general.start_url, config.general.start_url);
        assert_eq!(deserialized.bridge.namespace, config.bridge.namespace);
    }
}
