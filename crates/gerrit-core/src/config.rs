//! Configuration management for gerrit-mcp.
//!
//! Two layers are involved:
//!
//! - [`Config`]: optional operator settings loaded from a TOML file stored in
//!   a platform-specific location (`~/.config/gerrit-mcp/config.toml` on
//!   macOS/Linux, `%APPDATA%\gerrit-mcp\config.toml` on Windows).
//! - [`ConnectionConfig`]: the three connection credentials, resolved once
//!   at startup. Environment variables win over the file; the password is
//!   only ever read from the environment.
//!
//! # Example
//!
//! ```ignore
//! use gerrit_core::config::{Config, ConnectionConfig};
//!
//! let config = Config::load()?;
//! let connection = ConnectionConfig::resolve(&config, |key| std::env::var(key).ok())?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::batch::{DEFAULT_AUDIT_MESSAGE, VoteSubmitSettings};
use crate::sync::DEFAULT_SYNC_COMMAND;
use crate::{Error, Result};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "gerrit-mcp";

/// Environment variable holding the Gerrit base URL.
pub const HOST_ENV: &str = "GERRIT_HOST";
/// Environment variable holding the Gerrit username.
pub const USERNAME_ENV: &str = "GERRIT_USERNAME";
/// Environment variable holding the Gerrit HTTP password.
pub const PASSWORD_ENV: &str = "GERRIT_PASSWORD";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Gerrit server settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gerrit: Option<GerritConfig>,

    /// Batch approval settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Local sync settings
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Gerrit server configuration (no secrets).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GerritConfig {
    /// Gerrit base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// HTTP username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Batch vote-then-submit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Pause between voting and submitting, in milliseconds
    #[serde(default = "default_vote_delay_ms")]
    pub vote_delay_ms: u64,
    /// Review message attached to batch approvals
    #[serde(default = "default_audit_message")]
    pub message: String,
}

/// External sync tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Program invoked as `<command> download <project> <change>/<patchset>`
    #[serde(default = "default_sync_command")]
    pub command: String,
}

fn default_vote_delay_ms() -> u64 {
    1000
}

fn default_audit_message() -> String {
    DEFAULT_AUDIT_MESSAGE.to_string()
}

fn default_sync_command() -> String {
    DEFAULT_SYNC_COMMAND.to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            vote_delay_ms: default_vote_delay_ms(),
            message: default_audit_message(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            command: default_sync_command(),
        }
    }
}

impl BatchConfig {
    /// Vote-then-submit settings with the default votes.
    pub fn vote_submit_settings(&self) -> VoteSubmitSettings {
        VoteSubmitSettings {
            message: self.message.clone(),
            delay: Duration::from_millis(self.vote_delay_ms),
            ..Default::default()
        }
    }
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `gerrit.url`, `batch.vote_delay_ms`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;

        match section {
            "gerrit" => {
                let config = self.gerrit.get_or_insert_with(GerritConfig::default);
                match field {
                    "url" | "host" => config.url = Some(value.to_string()),
                    "username" | "user" => config.username = Some(value.to_string()),
                    "password" => {
                        return Err(Error::Config(format!(
                            "The password is not stored in the config file; set {} instead",
                            PASSWORD_ENV
                        )))
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown gerrit config field: {}",
                            field
                        )))
                    }
                }
            }
            "batch" => match field {
                "vote_delay_ms" | "delay" => {
                    self.batch.vote_delay_ms = value.parse().map_err(|_| {
                        Error::Config(format!("Invalid vote delay '{}': expected milliseconds", value))
                    })?;
                }
                "message" => self.batch.message = value.to_string(),
                _ => {
                    return Err(Error::Config(format!(
                        "Unknown batch config field: {}",
                        field
                    )))
                }
            },
            "sync" => match field {
                "command" => self.sync.command = value.to_string(),
                _ => {
                    return Err(Error::Config(format!(
                        "Unknown sync config field: {}",
                        field
                    )))
                }
            },
            _ => {
                return Err(Error::Config(format!("Unknown config section: {}", section)));
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `section.field` (e.g., `gerrit.url`, `sync.command`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;

        match section {
            "gerrit" => {
                let Some(config) = &self.gerrit else {
                    return Ok(None);
                };
                match field {
                    "url" | "host" => Ok(config.url.clone()),
                    "username" | "user" => Ok(config.username.clone()),
                    _ => Err(Error::Config(format!(
                        "Unknown gerrit config field: {}",
                        field
                    ))),
                }
            }
            "batch" => match field {
                "vote_delay_ms" | "delay" => Ok(Some(self.batch.vote_delay_ms.to_string())),
                "message" => Ok(Some(self.batch.message.clone())),
                _ => Err(Error::Config(format!(
                    "Unknown batch config field: {}",
                    field
                ))),
            },
            "sync" => match field {
                "command" => Ok(Some(self.sync.command.clone())),
                _ => Err(Error::Config(format!(
                    "Unknown sync config field: {}",
                    field
                ))),
            },
            _ => Err(Error::Config(format!("Unknown config section: {}", section))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.len() != 2 {
        return Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: section.field",
            key
        )));
    }
    Ok((parts[0], parts[1]))
}

// =============================================================================
// Connection credentials
// =============================================================================

/// Connection settings for the Gerrit REST API.
///
/// Constructed once at process start and passed by reference to whatever
/// issues remote calls.
#[derive(Clone, PartialEq)]
pub struct ConnectionConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl ConnectionConfig {
    /// Resolve credentials from `lookup` (usually the process environment),
    /// falling back to the config file for the URL and username.
    ///
    /// Every missing value is reported at once.
    pub fn resolve<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let file = config.gerrit.clone().unwrap_or_default();

        let url = non_empty(HOST_ENV).or(file.url);
        let username = non_empty(USERNAME_ENV).or(file.username);
        let password = non_empty(PASSWORD_ENV);

        match (url, username, password) {
            (Some(url), Some(username), Some(password)) => Ok(Self {
                url: url.trim_end_matches('/').to_string(),
                username,
                password,
            }),
            (url, username, password) => {
                let missing: Vec<&str> = [
                    (url.is_none(), HOST_ENV),
                    (username.is_none(), USERNAME_ENV),
                    (password.is_none(), PASSWORD_ENV),
                ]
                .into_iter()
                .filter_map(|(missing, name)| missing.then_some(name))
                .collect();

                Err(Error::Config(format!(
                    "Missing required Gerrit settings: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
