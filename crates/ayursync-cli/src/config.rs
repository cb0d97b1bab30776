//! AYUR-SYNC CLI Configuration Management
//!
//! Configuration is layered with figment, lowest priority first:
//! - Built-in defaults
//! - `ayursync.toml` in the working directory
//! - `~/.ayursync/config.toml`
//! - Environment variables (`AYURSYNC_API__BASE_URL`, ...)
//! - Command line overrides

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use ayursync_core::{ApiConfig, MonitorConfig, DEFAULT_API_BASE_URL};

const CONFIG_DIR: &str = ".ayursync";
const CONFIG_FILE: &str = "config.toml";
const LOCAL_CONFIG_FILE: &str = "ayursync.toml";
const TOKEN_FILE: &str = "token";
const ENV_PREFIX: &str = "AYURSYNC_";

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the admin client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Backend connection settings
    pub api: ApiSection,

    /// Deep reset progress polling
    pub monitor: MonitorSection,

    /// Session token storage
    pub auth: AuthSection,

    /// Output settings
    pub cli: CliSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Base URL including the `/api` prefix
    pub base_url: String,

    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub poll_interval_ms: u64,

    /// Pause between the completion marker and the suggestions view
    pub redirect_delay_ms: u64,

    /// Give up after this many polls; unbounded when absent
    pub max_poll_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Defaults to `~/.ayursync/token`
    pub token_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSection {
    pub verbose: bool,

    pub colored_output: bool,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for ApiSection {
    fn default() -> Self {
        let api = ApiConfig::default();
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: api.request_timeout.as_secs(),
        }
    }
}

impl Default for MonitorSection {
    fn default() -> Self {
        let monitor = MonitorConfig::default();
        Self {
            poll_interval_ms: monitor.poll_interval.as_millis() as u64,
            redirect_delay_ms: monitor.redirect_delay.as_millis() as u64,
            max_poll_attempts: monitor.max_poll_attempts,
        }
    }
}

impl Default for CliSection {
    fn default() -> Self {
        Self {
            verbose: false,
            colored_output: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

/// Values given on the command line, applied above every other layer
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub token_file: Option<PathBuf>,
    pub verbose: Option<bool>,
}

impl AdminConfig {
    /// Load configuration from the standard locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_overrides(None, ConfigOverrides::default())
    }

    /// Load configuration from a specific file path, without the standard locations
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()));

        let config: AdminConfig = figment.extract().map_err(|e| {
            ConfigError::Loading(format!(
                "Failed to load from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with command line overrides
    ///
    /// An explicit `config_file` replaces the two standard file locations.
    pub fn load_with_overrides(
        config_file: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        figment = match config_file {
            Some(path) => figment.merge(Toml::file(path)),
            None => {
                let mut figment = figment.merge(Toml::file(LOCAL_CONFIG_FILE));
                if let Some(path) = Self::default_config_path() {
                    figment = figment.merge(Toml::file(path));
                }
                figment
            }
        };

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        if let Some(url) = overrides.api_url {
            figment = figment.merge(("api.base_url", url));
        }
        if let Some(path) = overrides.token_file {
            figment = figment.merge(("auth.token_file", path));
        }
        if let Some(verbose) = overrides.verbose {
            figment = figment.merge(("cli.verbose", verbose));
        }

        let config: AdminConfig = figment
            .extract()
            .map_err(|e| ConfigError::Loading(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// `~/.ayursync/config.toml`, when a home directory is known
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Save configuration to a specific file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::FileSystem(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), toml_string)
            .map_err(|e| ConfigError::FileSystem(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_config().validate()?;
        self.monitor_config().validate()?;

        if let Some(path) = &self.auth.token_file {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Validation(
                    "Token file path must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api.base_url.clone(),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(self.monitor.poll_interval_ms),
            redirect_delay: Duration::from_millis(self.monitor.redirect_delay_ms),
            max_poll_attempts: self.monitor.max_poll_attempts,
        }
    }

    /// Where the session token lives between invocations
    pub fn token_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.auth.token_file {
            return Ok(path.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(CONFIG_DIR).join(TOKEN_FILE))
            .ok_or_else(|| {
                ConfigError::Environment(
                    "No home directory found; set auth.token_file or --token-file".to_string(),
                )
            })
    }

    /// Create example configuration file content
    pub fn example_config() -> String {
        let example_config = AdminConfig {
            api: ApiSection {
                base_url: "https://ayursync.example.org/api".to_string(),
                request_timeout_secs: 30,
            },
            monitor: MonitorSection {
                max_poll_attempts: Some(1440),
                ..Default::default()
            },
            auth: AuthSection {
                token_file: Some(PathBuf::from("/var/lib/ayursync/token")),
            },
            cli: CliSection::default(),
        };

        toml::to_string_pretty(&example_config)
            .unwrap_or_else(|_| "# Failed to generate example config".to_string())
    }
}

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {0}")]
    Loading(String),

    #[error(transparent)]
    Invalid(#[from] ayursync_core::ConfigError),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = AdminConfig::default();
        assert!(!config.cli.verbose);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.monitor.poll_interval_ms, 2500);
        assert_eq!(config.monitor.redirect_delay_ms, 1200);
        assert_eq!(config.monitor.max_poll_attempts, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = AdminConfig::default();

        let mut invalid_config = config.clone();
        invalid_config.monitor.poll_interval_ms = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.api.base_url = "ftp://backend/api".to_string();
        assert!(matches!(
            invalid_config.validate(),
            Err(ConfigError::Invalid(_))
        ));

        let mut invalid_config = config.clone();
        invalid_config.auth.token_file = Some(PathBuf::new());
        assert!(invalid_config.validate().is_err());
    }

    #[test]
    fn test_section_conversion() {
        let mut config = AdminConfig::default();
        config.monitor.poll_interval_ms = 100;
        config.monitor.max_poll_attempts = Some(3);
        config.api.request_timeout_secs = 5;

        let monitor = config.monitor_config();
        assert_eq!(monitor.poll_interval, Duration::from_millis(100));
        assert_eq!(monitor.redirect_delay, Duration::from_millis(1200));
        assert_eq!(monitor.max_poll_attempts, Some(3));
        assert_eq!(config.api_config().request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_load_from_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ayursync.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"https://staging.example.org/api\"\n\n[monitor]\npoll_interval_ms = 500\n",
        )
        .unwrap();

        let config = AdminConfig::load_from_file(&path).unwrap();
        assert_eq!(config.api.base_url, "https://staging.example.org/api");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.monitor.poll_interval_ms, 500);
        assert_eq!(config.monitor.redirect_delay_ms, 1200);
    }

    #[test]
    fn test_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api]\nbase_url = \"https://file.example.org/api\"\n").unwrap();

        let config = AdminConfig::load_with_overrides(
            Some(&path),
            ConfigOverrides {
                api_url: Some("https://flag.example.org/api".to_string()),
                token_file: Some(dir.path().join("tok")),
                verbose: Some(true),
            },
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://flag.example.org/api");
        assert_eq!(config.token_path().unwrap(), dir.path().join("tok"));
        assert!(config.cli.verbose);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AdminConfig::default();
        config.monitor.max_poll_attempts = Some(10);
        config.save_to_file(&path).unwrap();

        let reloaded = AdminConfig::load_from_file(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_example_config_generation() {
        let example = AdminConfig::example_config();
        assert!(example.contains("[api]"));
        assert!(example.contains("[monitor]"));
        assert!(example.contains("[auth]"));
        assert!(example.contains("[cli]"));
    }
}
