//! Configuration loading for the Yolp client.
//!
//! All fields are required unless explicitly marked optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use yolp_sync::CacheConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    /// Where the session cookie is kept between runs. Defaults to
    /// `$HOME/.yolp/session.json`.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    pub cache: CacheSettings,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Age after which cached data is refetched on read. Omit to keep data
    /// until a write invalidates it.
    #[serde(default)]
    pub stale_after_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directives, overridden by `YOLP_LOG` / `RUST_LOG`.
    #[serde(default)]
    pub filter: Option<String>,
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or YOLP_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api_base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self
            .session_file
            .as_deref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "session_file",
                reason: "must not be empty when set".to_string(),
            });
        }
        if self.cache.stale_after_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "cache.stale_after_ms",
                reason: "must be > 0 when set".to_string(),
            });
        }
        if self
            .log
            .filter
            .as_deref()
            .is_some_and(|filter| filter.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "log.filter",
                reason: "must not be empty when set".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Session file to use, falling back to one under `$HOME`. `None` keeps
    /// the session in memory only.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file.clone().or_else(|| {
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".yolp").join("session.json"))
        })
    }

    pub fn cache_config(&self) -> CacheConfig {
        match self.cache.stale_after_ms {
            Some(ms) => CacheConfig::new().with_stale_after(Duration::from_millis(ms)),
            None => CacheConfig::new(),
        }
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("YOLP_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
