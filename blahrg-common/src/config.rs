//! Configuration loading and config file resolution
//!
//! The bot is configured by a single TOML file read once at startup.
//! The file path is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`BLAHRG_CONF`)
//! 3. Per-user config directory (`~/.config/blahrg/config.toml` on Linux)
//!
//! A missing or malformed file is a fatal error; there are no compiled
//! defaults for the token or owner.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "BLAHRG_CONF";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub telegram: TelegramConfig,
    pub media: MediaConfig,
    pub db: DbConfig,

    #[serde(default)]
    pub wizard: WizardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram Bot API settings
#[derive(Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    pub token: String,

    /// Numeric identity of the bot owner
    pub owner: i64,

    /// Additional identities allowed to run privileged commands
    #[serde(default)]
    pub whitelist: Vec<i64>,

    /// Bot API base URL (self-hosted Bot API servers)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Long polling timeout passed to getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

// Hand-written so the token never ends up in logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("whitelist", &self.whitelist)
            .field("api_url", &self.api_url)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

/// Media directory holding raw clip binaries
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub path: PathBuf,
}

/// Clip record store location
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Add-clip wizard settings
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WizardConfig {
    /// Discard unfinished wizards older than this many seconds (never if unset)
    #[serde(default)]
    pub expiry_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration text and validate required values
    pub fn parse(toml_str: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(toml_str)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// Relative media and database paths are resolved against the
    /// directory containing the configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::parse(&toml_str)?;

        if let Some(base) = path.parent() {
            config.media.path = resolve_relative(base, &config.media.path);
            config.db.path = resolve_relative(base, &config.db.path);
        }

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.token.trim().is_empty() {
            return Err(Error::Config("telegram.token must not be empty".to_string()));
        }
        if self.telegram.poll_timeout_secs == 0 {
            return Err(Error::Config(
                "telegram.poll_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.media.path.as_os_str().is_empty() {
            return Err(Error::Config("media.path must not be empty".to_string()));
        }
        if self.db.path.as_os_str().is_empty() {
            return Err(Error::Config("db.path must not be empty".to_string()));
        }
        Ok(())
    }

    /// Whether `user_id` may run privileged commands (owner or whitelisted)
    pub fn is_authorized(&self, user_id: i64) -> bool {
        user_id == self.telegram.owner || self.telegram.whitelist.contains(&user_id)
    }
}

fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Resolve the configuration file path
///
/// **Priority:** CLI argument → `BLAHRG_CONF` → user config directory
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    let user_config = dirs::config_dir()
        .map(|d| d.join("blahrg").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if user_config.exists() {
        Ok(user_config)
    } else {
        Err(Error::Config(format!(
            "Could not find configuration file (pass --config, set {} or create {})",
            CONFIG_ENV_VAR,
            user_config.display()
        )))
    }
}
