//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$IMAPDUMP_CONFIG` (environment variable)
//! 2. `~/.config/imapdump/config.toml` (Linux/macOS)
//!    `%APPDATA%\imapdump\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Command-line flags override whatever the file says.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mail server settings.
    pub imap: ImapConfig,
    /// Where accounts come from and where messages go.
    pub archive: ArchiveConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Interface language ("en", "ru"). Defaults to the system locale.
    pub language: Option<String>,
}

/// Mail server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapConfig {
    /// IMAPS host shared by every account.
    pub host: String,
    /// IMAPS port.
    pub port: u16,
}

/// Archive input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Root of the archive tree.
    pub output_dir: PathBuf,
    /// Credential list, one `login;password` per line.
    pub accounts_file: PathBuf,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
            language: None,
        }
    }
}

impl Default for ImapConfig {
    fn default() -> Self {
        Self {
            host: "imap.yandex.ru".to_string(),
            port: 993,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("emails"),
            accounts_file: PathBuf::from("down_email.txt"),
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    let Some(path) = config_file_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }
    match load_config_from(&path) {
        Ok(cfg) => {
            tracing::info!(path = %path.display(), "Loaded config");
            cfg
        }
        Err(e) => {
            tracing::warn!(error = %e, "Using default config");
            Config::default()
        }
    }
}

/// Load configuration from a specific file.
pub fn load_config_from(path: &Path) -> Result<Config, ArchiveError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ArchiveError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    toml::from_str::<Config>(&contents).map_err(|e| ArchiveError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("IMAPDUMP_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("imapdump").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("imapdump")
}
