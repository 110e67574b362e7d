// Configuration models
// Control API credentials, filesystem locations and capture settings
//
// Loaded once at startup: defaults, then an optional config.toml, then
// environment overrides. Validated before any client is built.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::utils::paths;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CHARLESFLOW_CONFIG";
pub const USERNAME_ENV: &str = "CHARLESFLOW_USERNAME";
pub const PASSWORD_ENV: &str = "CHARLESFLOW_PASSWORD";
pub const PROXY_ENV: &str = "CHARLESFLOW_PROXY";
pub const CONTROL_URL_ENV: &str = "CHARLESFLOW_CONTROL_URL";

/// Upper bound for any control API timeout
pub const MAX_TIMEOUT_SECS: u64 = 10;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CONFIG_READ_FAILED",
            ConfigError::Parse(_) => "CONFIG_PARSE_FAILED",
            ConfigError::Invalid { .. } => "CONFIG_INVALID",
        }
    }
}

impl From<ConfigError> for String {
    fn from(err: ConfigError) -> Self {
        err.to_string()
    }
}

/// Connection settings for the Charles control API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Virtual host answered by Charles itself
    pub base_url: String,
    /// Charles HTTP proxy every control request is routed through
    pub proxy_url: String,
    pub username: String,
    pub password: String,
    pub request_timeout_secs: u64,
    pub quit_timeout_secs: u64,
    /// Pause after quit so Charles can release its config files
    pub quit_grace_millis: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            base_url: "http://control.charles".to_string(),
            proxy_url: "http://127.0.0.1:8888".to_string(),
            username: "tower".to_string(),
            password: "123456".to_string(),
            request_timeout_secs: 5,
            quit_timeout_secs: 3,
            quit_grace_millis: 2000,
        }
    }
}

impl ControlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn quit_timeout(&self) -> Duration {
        Duration::from_secs(self.quit_timeout_secs)
    }

    pub fn quit_grace(&self) -> Duration {
        Duration::from_millis(self.quit_grace_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("control.base_url", &self.base_url)?;
        validate_http_url("control.proxy_url", &self.proxy_url)?;

        if self.username.is_empty() {
            return Err(ConfigError::Invalid {
                field: "control.username",
                message: "must not be empty".to_string(),
            });
        }
        validate_timeout("control.request_timeout_secs", self.request_timeout_secs)?;
        validate_timeout("control.quit_timeout_secs", self.quit_timeout_secs)?;

        if self.quit_grace_millis > MAX_TIMEOUT_SECS * 1000 {
            return Err(ConfigError::Invalid {
                field: "control.quit_grace_millis",
                message: format!("must be at most {} ms", MAX_TIMEOUT_SECS * 1000),
            });
        }
        Ok(())
    }
}

fn validate_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::Invalid {
        field,
        message: format!("'{}' is not a valid URL: {}", value, e),
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::Invalid {
            field,
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(())
}

fn validate_timeout(field: &'static str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::Invalid {
            field,
            message: format!("must be between 1 and {} seconds", MAX_TIMEOUT_SECS),
        });
    }
    Ok(())
}

/// Filesystem locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Live Charles config file (unknown when no roaming data dir exists)
    pub config_file: Option<PathBuf>,
    /// Live Charles profiles directory
    pub profiles_dir: Option<PathBuf>,
    /// Where the snapshot is kept
    pub backup_dir: PathBuf,
    /// Where exported sessions are cached
    pub cache_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = paths::app_data_dir_or_temp();
        Self {
            config_file: paths::default_charles_config_file(),
            profiles_dir: paths::default_charles_profiles_dir(),
            backup_dir: data_dir.join(paths::BACKUP_DIR_NAME),
            cache_dir: data_dir.join(paths::CACHE_DIR_NAME),
        }
    }
}

impl PathsConfig {
    /// All locations rooted under one directory (used by tests and portable setups)
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            config_file: Some(root.join("Charles").join("charles.config")),
            profiles_dir: Some(root.join("Charles").join("data").join("profiles")),
            backup_dir: root.join(paths::BACKUP_DIR_NAME),
            cache_dir: root.join(paths::CACHE_DIR_NAME),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backup_dir == self.cache_dir {
            return Err(ConfigError::Invalid {
                field: "paths.cache_dir",
                message: "must differ from paths.backup_dir".to_string(),
            });
        }
        Ok(())
    }
}

/// Capture window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Progress is reported once per tick
    pub tick_seconds: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self { tick_seconds: 10 }
    }
}

impl CaptureSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_seconds == 0 {
            return Err(ConfigError::Invalid {
                field: "capture.tick_seconds",
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub control: ControlConfig,
    pub paths: PathsConfig,
    pub capture: CaptureSettings,
}

impl AppConfig {
    /// Load from `.env`, the config file and environment, then validate
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| paths::get_app_data_dir().ok().map(|d| d.join("config.toml")));

        let mut config = match path {
            Some(ref path) if path.exists() => {
                log::info!("[Config] Loading {}", path.display());
                Self::from_file(path)?
            }
            _ => {
                log::debug!("[Config] No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        if let Some(username) = read(USERNAME_ENV) {
            self.control.username = username;
        }
        if let Some(password) = read(PASSWORD_ENV) {
            self.control.password = password;
        }
        if let Some(proxy) = read(PROXY_ENV) {
            self.control.proxy_url = proxy;
        }
        if let Some(base_url) = read(CONTROL_URL_ENV) {
            self.control.base_url = base_url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control.validate()?;
        self.paths.validate()?;
        self.capture.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.control.base_url, "http://control.charles");
        assert_eq!(config.control.proxy_url, "http://127.0.0.1:8888");
        assert_eq!(config.capture.tick_seconds, 10);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [control]
            username = "alice"
            request_timeout_secs = 4

            [capture]
            tick_seconds = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.control.username, "alice");
        assert_eq!(config.control.password, "123456");
        assert_eq!(config.control.request_timeout(), Duration::from_secs(4));
        assert_eq!(config.capture.tick_seconds, 5);
    }

    #[test]
    fn test_rejects_bad_proxy_url() {
        let mut config = ControlConfig::default();
        config.proxy_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), "CONFIG_INVALID");
        assert!(err.to_string().contains("control.proxy_url"));
    }

    #[test]
    fn test_rejects_out_of_range_timeout() {
        let mut config = ControlConfig::default();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.request_timeout_secs = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_tick() {
        let settings = CaptureSettings { tick_seconds: 0 };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rooted_paths() {
        let root = Path::new("/tmp/cf");
        let paths = PathsConfig::rooted_at(root);
        assert_eq!(
            paths.config_file.as_deref(),
            Some(Path::new("/tmp/cf/Charles/charles.config"))
        );
        assert!(paths.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let err = AppConfig::from_toml_str("[control\nusername=").unwrap_err();
        assert_eq!(err.code(), "CONFIG_PARSE_FAILED");
    }
}
