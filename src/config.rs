use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::api::{OutputFormat, WriteMode};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub server: ServerConfig,
    pub defaults: DefaultsConfig,
    pub telemetry: TelemetryConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the tabular-data service
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Output format preselected in the Convert form ("parquet" or "csv")
    pub output_format: String,
    /// Write mode preselected in the Save Table form ("append" or "overwrite")
    pub write_mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Maximum entries kept per input history file
    pub history_limit: usize,
    /// Terminal event poll interval in milliseconds
    pub event_poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.3".to_string(),
            server: ServerConfig::default(),
            defaults: DefaultsConfig::default(),
            telemetry: TelemetryConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_format: "parquet".to_string(),
            write_mode: "append".to_string(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
            event_poll_interval_ms: 25,
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let mut config = AppConfig::default();

        // Try to load user config (if exists)
        if let Ok(user_config) = Self::load_user_config(app_name) {
            config.merge(user_config);
        }

        config.validate()?;

        Ok(config)
    }

    /// Load user configuration from the platform config directory
    fn load_user_config(app_name: &str) -> Result<AppConfig> {
        let config_manager = ConfigManager::new(app_name)?;
        Self::load_from_path(&config_manager.config_path("config.toml"))
    }

    /// Load configuration from a specific file
    pub fn load_from_path(config_path: &Path) -> Result<AppConfig> {
        if !config_path.exists() {
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config on top of this one, keeping non-default values
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }
        self.server.merge(other.server);
        self.defaults.merge(other.defaults);
        self.telemetry.merge(other.telemetry);
        self.ui.merge(other.ui);
    }

    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.3") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.3.x",
                self.version
            ));
        }

        if !self.server.url.starts_with("http://") && !self.server.url.starts_with("https://") {
            return Err(eyre!(
                "server.url must start with http:// or https://, got: {}",
                self.server.url
            ));
        }

        if OutputFormat::from_name(&self.defaults.output_format).is_none() {
            return Err(eyre!(
                "Invalid defaults.output_format: {}. Must be 'parquet' or 'csv'",
                self.defaults.output_format
            ));
        }

        if WriteMode::from_name(&self.defaults.write_mode).is_none() {
            return Err(eyre!(
                "Invalid defaults.write_mode: {}. Must be 'append' or 'overwrite'",
                self.defaults.write_mode
            ));
        }

        if self.ui.history_limit == 0 {
            return Err(eyre!("ui.history_limit must be greater than 0"));
        }

        if self.ui.event_poll_interval_ms == 0 {
            return Err(eyre!("ui.event_poll_interval_ms must be greater than 0"));
        }

        Ok(())
    }

    /// Output format preselected in the Convert form
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_name(&self.defaults.output_format).unwrap_or_default()
    }

    /// Write mode preselected in the Save Table form
    pub fn write_mode(&self) -> WriteMode {
        WriteMode::from_name(&self.defaults.write_mode).unwrap_or_default()
    }
}

impl ServerConfig {
    pub fn merge(&mut self, other: Self) {
        if other.url != ServerConfig::default().url {
            self.url = other.url;
        }
    }
}

impl DefaultsConfig {
    pub fn merge(&mut self, other: Self) {
        let default = DefaultsConfig::default();
        if other.output_format != default.output_format {
            self.output_format = other.output_format;
        }
        if other.write_mode != default.write_mode {
            self.write_mode = other.write_mode;
        }
    }
}

impl TelemetryConfig {
    pub fn merge(&mut self, other: Self) {
        if other.enabled != TelemetryConfig::default().enabled {
            self.enabled = other.enabled;
        }
    }
}

impl UiConfig {
    pub fn merge(&mut self, other: Self) {
        let default = UiConfig::default();
        if other.history_limit != default.history_limit {
            self.history_limit = other.history_limit;
        }
        if other.event_poll_interval_ms != default.event_poll_interval_ms {
            self.event_poll_interval_ms = other.event_poll_interval_ms;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.url, "http://localhost:8000");
        assert_eq!(config.output_format(), OutputFormat::Parquet);
        assert_eq!(config.write_mode(), WriteMode::Append);
    }

    #[test]
    fn test_default_template_parses_to_defaults() {
        let parsed: AppConfig = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.server.url, AppConfig::default().server.url);
    }

    #[test]
    fn test_merge_keeps_non_default_values() {
        let mut config = AppConfig::default();
        let other: AppConfig = toml::from_str(
            r#"
            [server]
            url = "http://data.internal:9000"

            [defaults]
            output_format = "csv"
            "#,
        )
        .unwrap();

        config.merge(other);
        assert_eq!(config.server.url, "http://data.internal:9000");
        assert_eq!(config.output_format(), OutputFormat::Csv);
        // Untouched sections keep their defaults
        assert_eq!(config.write_mode(), WriteMode::Append);
        assert!(config.telemetry.enabled);
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = AppConfig::default();
        config.server.url = "localhost:8000".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_format() {
        let mut config = AppConfig::default();
        config.defaults.output_format = "xlsx".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_history_limit() {
        let mut config = AppConfig::default();
        config.ui.history_limit = 0;
        assert!(config.validate().is_err());
    }
}
