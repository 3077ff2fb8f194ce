//! Application configuration (fleetmap.toml)
//!
//! Layered in precedence order: built-in defaults → config file →
//! environment (API token) → CLI flags. Every section has working defaults
//! so the file only needs to state what differs from the stock deployment.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::advice::AdviceConfig;
use crate::cache::SnapshotCache;
use crate::classifier::ClassifyConfig;
use crate::stage::AdvanceConfig;

/// Environment variable overriding the configured API token
pub const TOKEN_ENV: &str = "FLEETMAP_API_TOKEN";

/// Default config file path, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "fleetmap.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// CRM API token; [`TOKEN_ENV`] overrides this
    pub api_token: String,

    /// CRM company domain, used only for deep links
    pub company_domain: String,

    pub crm_base_url: String,

    pub geocoder_base_url: String,

    /// ISO country codes passed to the geocoder
    pub country_codes: String,

    /// Contact custom field (opaque hash key) holding the primary address;
    /// unset means the fallback chain starts at the organization address
    pub custom_address_field: Option<String>,

    /// Open-record page size. One page only; records beyond this are
    /// silently dropped.
    pub record_limit: u32,

    /// Timeout for CRM and geocoder requests, in seconds
    pub http_timeout_secs: u64,

    /// Floor between consecutive geocoder requests, in milliseconds
    pub geocode_min_interval_ms: u64,

    /// Use seeded in-memory backends instead of live services
    pub mock: bool,

    /// Snapshot file location; unset means the default data directory
    pub snapshot_path: Option<PathBuf>,

    pub classify: ClassifyConfig,

    pub advance: AdvanceConfig,

    pub advice: AdviceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            company_domain: "example".to_string(),
            crm_base_url: "https://api.pipedrive.com/v1".to_string(),
            geocoder_base_url: "https://nominatim.openstreetmap.org/search".to_string(),
            country_codes: "pl".to_string(),
            custom_address_field: None,
            record_limit: 500,
            http_timeout_secs: 10,
            geocode_min_interval_ms: 1100,
            mock: false,
            snapshot_path: None,
            classify: ClassifyConfig::default(),
            advance: AdvanceConfig::default(),
            advice: AdviceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load and parse config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse config from a TOML string
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config: explicit path must exist; the default path is used
    /// only when present, otherwise built-in defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply environment overrides (highest precedence below CLI flags)
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.api_token = token;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crm_base_url.trim().is_empty() {
            return Err(ConfigError::Validation("crm_base_url must not be empty".into()));
        }
        if self.geocoder_base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "geocoder_base_url must not be empty".into(),
            ));
        }
        if self.record_limit == 0 {
            return Err(ConfigError::Validation("record_limit must be at least 1".into()));
        }
        self.classify.validate().map_err(ConfigError::Validation)?;
        self.advance.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn geocode_min_interval(&self) -> Duration {
        Duration::from_millis(self.geocode_min_interval_ms)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(SnapshotCache::default_path)
    }
}
