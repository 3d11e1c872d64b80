//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub timezone: TimezoneConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Check-in server connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// CSRF token attached to state-changing requests
    pub csrf_token: Option<String>,

    /// Raw session cookie pair, e.g. `session=abc123`
    pub session_cookie: Option<String>,

    /// Unset means requests never time out
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            csrf_token: None,
            session_cookie: None,
            request_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Client-side image upload filtering
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,

    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_max_image_size() -> u64 {
    5 * 1024 * 1024 // 5 MB
}

fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp", "heic", "heif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_size: default_max_image_size(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

/// Auto-dismiss delays for both notification presentations
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_dismiss_ms")]
    pub modal_dismiss_ms: u64,

    #[serde(default = "default_dismiss_ms")]
    pub toast_dismiss_ms: u64,
}

fn default_dismiss_ms() -> u64 {
    3000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            modal_dismiss_ms: default_dismiss_ms(),
            toast_dismiss_ms: default_dismiss_ms(),
        }
    }
}

/// History view behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u64,

    #[serde(default = "default_reload_delay_ms")]
    pub reload_delay_ms: u64,

    /// Link target of the empty-state call-to-action when the server omits one
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,
}

fn default_fade_ms() -> u64 {
    300
}

fn default_reload_delay_ms() -> u64 {
    1000
}

fn default_dashboard_path() -> String {
    "/checkin/dashboard".to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            fade_ms: default_fade_ms(),
            reload_delay_ms: default_reload_delay_ms(),
            dashboard_path: default_dashboard_path(),
        }
    }
}

/// Time zone reported to the server
#[derive(Debug, Clone, Deserialize)]
pub struct TimezoneConfig {
    /// Fixed zone name; resolved from the host when unset
    pub name: Option<String>,

    #[serde(default = "default_timezone")]
    pub default: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            name: None,
            default: default_timezone(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("checkin").join("config.toml")),
            Some(PathBuf::from("/etc/checkin/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CHECKIN_BASE_URL") {
            self.server.base_url = url;
        }
        if let Ok(token) = std::env::var("CHECKIN_CSRF_TOKEN") {
            self.server.csrf_token = Some(token);
        }
        if let Ok(cookie) = std::env::var("CHECKIN_SESSION_COOKIE") {
            self.server.session_cookie = Some(cookie);
        }

        if let Ok(size) = std::env::var("CHECKIN_MAX_IMAGE_SIZE") {
            if let Ok(bytes) = size.parse() {
                self.upload.max_image_size = bytes;
            }
        }

        if let Ok(level) = std::env::var("CHECKIN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CHECKIN_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Daily Check-in client configuration
#
# Environment variables override these settings:
# - CHECKIN_BASE_URL
# - CHECKIN_CSRF_TOKEN
# - CHECKIN_SESSION_COOKIE
# - CHECKIN_MAX_IMAGE_SIZE
# - CHECKIN_LOG_LEVEL
# - CHECKIN_LOG_FORMAT

[server]
# Check-in server URL
base_url = "http://localhost:5000"

# CSRF token for check-in and delete requests (fetched from the dashboard if unset)
# csrf_token = ""

# Session cookie copied from a logged-in browser
# session_cookie = "session=..."

# Request timeout in seconds (unset = wait indefinitely)
# request_timeout_secs = 30

[upload]
# Images above this size (bytes) are skipped before upload
max_image_size = 5242880

# Image types accepted for upload
allowed_extensions = ["jpg", "jpeg", "png", "gif", "webp", "heic", "heif"]

[notifications]
# Auto-dismiss delay of centered overlay messages (ms)
modal_dismiss_ms = 3000

# Auto-dismiss delay of corner toasts (ms)
toast_dismiss_ms = 3000

[history]
# Fade-out duration before a deleted row is removed (ms)
fade_ms = 300

# Delay before a full reload when a deleted row cannot be located (ms)
reload_delay_ms = 1000

# Fallback "Check In Now" link target
dashboard_path = "/checkin/dashboard"

[timezone]
# Fixed zone name sent to the server; resolved from the host when unset
# name = "Europe/Berlin"

# Zone used when the host zone cannot be resolved
default = "UTC"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://localhost:5000");
        assert_eq!(config.upload.max_image_size, 5 * 1024 * 1024);
        assert!(config.upload.allowed_extensions.contains(&"heic".to_string()));
        assert_eq!(config.notifications.modal_dismiss_ms, 3000);
        assert_eq!(config.history.fade_ms, 300);
        assert!(config.server.request_timeout().is_none());
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.upload.max_image_size, 5_242_880);
        assert_eq!(config.history.reload_delay_ms, 1000);
        assert_eq!(config.timezone.default, "UTC");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nbase_url = \"https://checkin.example.com\"\nrequest_timeout_secs = 10\n\n[upload]\nmax_image_size = 1024"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.base_url, "https://checkin.example.com");
        assert_eq!(config.server.request_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.upload.max_image_size, 1024);
        // Untouched sections keep their defaults
        assert_eq!(config.notifications.toast_dismiss_ms, 3000);
        assert_eq!(config.upload.allowed_extensions.len(), 7);
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nbase_url = ").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/checkin.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
