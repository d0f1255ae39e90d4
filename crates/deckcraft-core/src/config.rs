//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/deckcraft/config.toml)
//! 3. Environment variables (DECKCRAFT_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::export::{
    archive::MAX_COMPRESSION_LEVEL, ExportOptions, DEFAULT_COMPRESSION_LEVEL, MAX_SCALE,
};
use crate::history::DEFAULT_DEBOUNCE;

/// Environment variable prefix
const ENV_PREFIX: &str = "DECKCRAFT";

/// Keys accepted by [`Config::set`]
pub const KEYS: &[&str] = &[
    "data_dir",
    "export_dir",
    "history_debounce_ms",
    "export_scale",
    "compression_level",
    "status_linger_ms",
    "log_level",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the persisted deck (one JSON file per key)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where exported images and archives are written
    /// (defaults to `<data_dir>/exports`)
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    /// Quiet period before an edit becomes an undo step
    #[serde(default = "default_history_debounce_ms")]
    pub history_debounce_ms: u64,

    /// Pixel density multiplier for exported images
    #[serde(default = "default_export_scale")]
    pub export_scale: u32,

    /// DEFLATE level for deck archives (0..=9)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// How long the final export status stays visible
    #[serde(default = "default_status_linger_ms")]
    pub status_linger_ms: u64,

    /// Log level used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[serde(default)]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            export_dir: None,
            history_debounce_ms: default_history_debounce_ms(),
            export_scale: default_export_scale(),
            compression_level: default_compression_level(),
            status_linger_ms: default_status_linger_ms(),
            log_level: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DECKCRAFT_DATA_DIR, DECKCRAFT_EXPORT_DIR, ...)
    /// 2. Config file (~/.config/deckcraft/config.toml or DECKCRAFT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit file from the command line
    pub fn load_with_cli_override(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.normalize();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        config.normalize();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }

        if let Some(val) = env_var("EXPORT_DIR") {
            self.export_dir = non_empty(val).map(PathBuf::from);
        }

        if let Some(val) = env_var("HISTORY_DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
            self.history_debounce_ms = val;
        }

        if let Some(val) = env_var("EXPORT_SCALE").and_then(|v| v.parse().ok()) {
            self.export_scale = val;
        }

        if let Some(val) = env_var("COMPRESSION_LEVEL").and_then(|v| v.parse().ok()) {
            self.compression_level = val;
        }

        if let Some(val) = env_var("STATUS_LINGER_MS").and_then(|v| v.parse().ok()) {
            self.status_linger_ms = val;
        }

        if let Some(val) = env_var("LOG_LEVEL") {
            self.log_level = non_empty(val);
        }

        if let Some(val) = env_var("LOG_FILE") {
            self.log_file = non_empty(val).map(PathBuf::from);
        }
    }

    /// Pull out-of-range values back into range
    fn normalize(&mut self) {
        self.compression_level = self.compression_level.min(MAX_COMPRESSION_LEVEL);
        self.export_scale = self.export_scale.clamp(1, MAX_SCALE);
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Set a single key from its string form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "export_dir" => self.export_dir = non_empty(value.to_string()).map(PathBuf::from),
            "history_debounce_ms" => self.history_debounce_ms = parse_number(key, value)?,
            "export_scale" => self.export_scale = parse_number(key, value)?,
            "compression_level" => self.compression_level = parse_number(key, value)?,
            "status_linger_ms" => self.status_linger_ms = parse_number(key, value)?,
            "log_level" => self.log_level = non_empty(value.to_string()),
            "log_file" => self.log_file = non_empty(value.to_string()).map(PathBuf::from),
            _ => bail!("Unknown config key '{}'. Valid keys: {}", key, KEYS.join(", ")),
        }
        self.normalize();
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with DECKCRAFT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("deckcraft")
            .join("config.toml")
    }

    /// Directory downloads land in
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("exports"))
    }

    pub fn history_debounce(&self) -> Duration {
        Duration::from_millis(self.history_debounce_ms)
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            scale: self.export_scale,
            status_linger: Duration::from_millis(self.status_linger_ms),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid value '{}' for {}: expected a number", value, key))
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("deckcraft")
}

fn default_history_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

fn default_export_scale() -> u32 {
    crate::export::DEFAULT_SCALE
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_status_linger_ms() -> u64 {
    crate::export::DEFAULT_STATUS_LINGER.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "DECKCRAFT_CONFIG",
        "DECKCRAFT_DATA_DIR",
        "DECKCRAFT_EXPORT_DIR",
        "DECKCRAFT_HISTORY_DEBOUNCE_MS",
        "DECKCRAFT_EXPORT_SCALE",
        "DECKCRAFT_COMPRESSION_LEVEL",
        "DECKCRAFT_STATUS_LINGER_MS",
        "DECKCRAFT_LOG_LEVEL",
        "DECKCRAFT_LOG_FILE",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.data_dir.ends_with("deckcraft"));
        assert_eq!(config.history_debounce_ms, 500);
        assert_eq!(config.export_scale, 2);
        assert_eq!(config.compression_level, 6);
        assert_eq!(config.status_linger_ms, 2000);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_export_dir_defaults_under_data_dir() {
        let mut config = Config {
            data_dir: PathBuf::from("/data/deckcraft"),
            ..Config::default()
        };
        assert_eq!(config.export_dir(), PathBuf::from("/data/deckcraft/exports"));

        config.export_dir = Some(PathBuf::from("/tmp/out"));
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("DECKCRAFT_DATA_DIR", "/tmp/deckcraft-test");
        config.apply_env_overrides();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/deckcraft-test"));
    }

    #[test]
    fn test_env_override_numbers() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("DECKCRAFT_HISTORY_DEBOUNCE_MS", "250");
        env::set_var("DECKCRAFT_EXPORT_SCALE", "3");
        config.apply_env_overrides();
        assert_eq!(config.history_debounce(), Duration::from_millis(250));
        assert_eq!(config.export_scale, 3);

        // Garbage is ignored
        env::set_var("DECKCRAFT_EXPORT_SCALE", "lots");
        config.apply_env_overrides();
        assert_eq!(config.export_scale, 3);
    }

    #[test]
    fn test_env_override_export_dir() {
        let _guard = EnvGuard::new(ENV_VARS);

        let mut config = Config::default();

        env::set_var("DECKCRAFT_EXPORT_DIR", "/srv/decks");
        config.apply_env_overrides();
        assert_eq!(config.export_dir, Some(PathBuf::from("/srv/decks")));

        // Empty string clears it
        env::set_var("DECKCRAFT_EXPORT_DIR", "");
        config.apply_env_overrides();
        assert!(config.export_dir.is_none());
    }

    #[test]
    fn test_compression_level_is_clamped() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_str("compression_level = 12").unwrap();
        assert_eq!(config.compression_level, 9);
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            export_dir = "/custom/exports"
            history_debounce_ms = 800
            log_level = "debug"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.export_dir(), PathBuf::from("/custom/exports"));
        assert_eq!(config.history_debounce_ms, 800);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        // Unspecified keys keep their defaults
        assert_eq!(config.export_scale, 2);
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp = TempDir::new().unwrap();
        env::set_var("DECKCRAFT_DATA_DIR", temp.path().join("data"));

        let config = Config::load_from_path(&temp.path().join("missing.toml")).unwrap();
        assert_eq!(config.history_debounce_ms, 500);
        assert!(temp.path().join("data").is_dir());
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config {
            data_dir: temp.path().join("data"),
            ..Config::default()
        };
        config.set("export_scale", "4").unwrap();
        config.set("log_file", "/tmp/deckcraft.log").unwrap();
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut config = Config::default();
        assert!(config.set("colour", "red").is_err());
        assert!(config.set("export_scale", "big").is_err());
        assert_eq!(config.export_scale, 2);

        config.set("export_scale", "0").unwrap();
        assert_eq!(config.export_scale, 1);
    }

    #[test]
    fn test_export_scale_is_capped() {
        let _guard = EnvGuard::new(ENV_VARS);
        let mut config = Config::default();
        config.set("export_scale", "20000000").unwrap();
        assert_eq!(config.export_scale, MAX_SCALE);
        assert_eq!(config.export_options().scale, MAX_SCALE);

        let loaded = Config::load_from_str("export_scale = 100\n").unwrap();
        assert_eq!(loaded.export_scale, MAX_SCALE);
    }
}
