//! Configuration management for Prospector.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Loading is best-effort: a missing
//! file yields defaults, a malformed file is an error.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// Loaded from `~/.config/prospector/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scraping behavior settings
    pub scraping: ScrapingConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Record validation settings
    pub validation: ValidationConfig,
    /// Session budget settings
    pub session: SessionConfig,
    /// Work store settings
    pub store: StoreConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PROSPECTOR_HEADLESS`: Override browser headless mode (true/false)
    /// - `PROSPECTOR_STEALTH`: Override stealth mode (true/false)
    /// - `PROSPECTOR_MAX_RETRIES`: Override the per-target retry budget
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        if let Ok(val) = std::env::var("PROSPECTOR_HEADLESS") {
            if let Ok(headless) = val.parse() {
                config.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("PROSPECTOR_STEALTH") {
            if let Ok(stealth) = val.parse() {
                config.browser.use_stealth = stealth;
                tracing::debug!("Override browser.use_stealth from env: {}", stealth);
            }
        }

        if let Ok(val) = std::env::var("PROSPECTOR_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                config.scraping.max_retries = retries;
                tracing::debug!("Override scraping.max_retries from env: {}", retries);
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/prospector/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("dev", "prospector", "prospector").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path (work store database lives here).
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("dev", "prospector", "prospector").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Validate cross-field constraints.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for out-of-range values.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scraping.delay_min_secs > self.scraping.delay_max_secs {
            return Err(ConfigError::InvalidValue {
                field: "scraping.delay_min_secs".to_string(),
                reason: format!(
                    "must not exceed delay_max_secs ({} > {})",
                    self.scraping.delay_min_secs, self.scraping.delay_max_secs
                ),
            });
        }
        if self.scraping.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.max_retries".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.validation.min_completeness > 100 {
            return Err(ConfigError::InvalidValue {
                field: "validation.min_completeness".to_string(),
                reason: "must be a score in 0-100".to_string(),
            });
        }
        Ok(())
    }
}

/// Scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Maximum profiles to enqueue per search
    pub max_profiles_per_search: u32,
    /// Lower bound of the inter-profile delay in seconds
    pub delay_min_secs: u64,
    /// Upper bound of the inter-profile delay in seconds
    pub delay_max_secs: u64,
    /// Per-target retry budget before abandoning
    pub max_retries: u32,
    /// Navigation timeout in seconds
    pub timeout_secs: u64,
    /// Number of targets claimed per batch
    pub batch_size: u32,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_profiles_per_search: 100,
            delay_min_secs: 15,
            delay_max_secs: 30,
            max_retries: 3,
            timeout_secs: 60,
            batch_size: 10,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Apply anti-automation stealth patches
    pub use_stealth: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            use_stealth: true,
        }
    }
}

/// Record validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Completed records scoring below this are reopened for re-scrape
    pub min_completeness: u8,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_completeness: 40,
        }
    }
}

/// Session budget settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum profiles to scrape in one session (0 = unbounded)
    pub max_profiles: u32,
    /// Maximum session duration in minutes (0 = unbounded)
    pub max_minutes: u64,
    /// Run a validation sweep every N scrape batches
    pub validate_every_batches: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_profiles: 0,
            max_minutes: 0,
            validate_every_batches: 5,
        }
    }
}

/// Work store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file path; empty means the XDG data directory default
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scraping.max_profiles_per_search, 100);
        assert_eq!(config.scraping.delay_min_secs, 15);
        assert_eq!(config.scraping.delay_max_secs, 30);
        assert_eq!(config.scraping.max_retries, 3);
        assert!(!config.browser.headless);
        assert!(config.browser.use_stealth);
        assert_eq!(config.validation.min_completeness, 40);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[scraping]"));
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[validation]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.scraping.max_retries, config.scraping.max_retries);
    }

    #[test]
    fn test_partial_config() {
        // Partial TOML files fill the rest with defaults
        let toml_str = r#"
[scraping]
max_retries = 5
delay_min_secs = 5
delay_max_secs = 10

[browser]
headless = true
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.scraping.max_retries, 5);
        assert!(config.browser.headless);
        // These should be defaults
        assert_eq!(config.scraping.max_profiles_per_search, 100);
        assert_eq!(config.validation.min_completeness, 40);
    }

    #[test]
    fn test_invalid_delay_range() {
        let mut config = AppConfig::default();
        config.scraping.delay_min_secs = 60;
        config.scraping.delay_max_secs = 30;

        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field, .. }) if field == "scraping.delay_min_secs"
        ));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut config = AppConfig::default();
        config.scraping.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("PROSPECTOR_MAX_RETRIES", "7");

        // Exercise the override logic directly; load_with_env also reads
        // the config file which may not exist in test environments
        let mut config = AppConfig::default();
        if let Ok(val) = std::env::var("PROSPECTOR_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                config.scraping.max_retries = retries;
            }
        }
        assert_eq!(config.scraping.max_retries, 7);

        std::env::remove_var("PROSPECTOR_MAX_RETRIES");
    }
}
