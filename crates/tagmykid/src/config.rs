//! Configuration management for tagmykid.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::contact::{CommandDrafter, ContactBridge};
use crate::error::{Error, Result};
use crate::storage::StorageBackend;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "tagmykid";

/// Default account document name for the JSON backend.
const ACCOUNTS_JSON_FILE_NAME: &str = "accounts.json";

/// Default database file name for the `SQLite` backend.
const ACCOUNTS_DB_FILE_NAME: &str = "accounts.db";

/// Default directory for the session and pending-tag slots.
const SESSION_DIR_NAME: &str = "session";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "TAGMYKID_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TAGMYKID_`, sections split on `__`)
/// 2. TOML config file at `~/.config/tagmykid/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Tag registry configuration.
    pub registry: RegistryConfig,
    /// Deep link and QR configuration.
    pub links: LinksConfig,
    /// Parent contact configuration.
    pub contact: ContactConfig,
    /// Message drafting configuration.
    pub drafting: DraftingConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which identity store to use.
    pub backend: StorageBackend,
    /// Path to the account store.
    /// Defaults to `~/.local/share/tagmykid/accounts.json` (or `accounts.db`)
    pub path: Option<PathBuf>,
    /// Directory holding the session and pending tag.
    /// Defaults to `~/.local/share/tagmykid/session`
    pub session_dir: Option<PathBuf>,
}

/// Tag registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How many codes to try before accepting a colliding one.
    /// 1 takes the first code without checking.
    pub code_attempts: u32,
}

/// Deep link and QR configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    /// Origin and path in front of `#/found/`.
    pub base_url: String,
    /// Hosted QR image service.
    pub qr_service_url: String,
    /// Edge length of hosted QR images in pixels.
    pub qr_size: u32,
}

/// Parent contact configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    /// Chat link service.
    pub messaging_url: String,
    /// Country code substituted for the trunk prefix.
    #[serde(deserialize_with = "digit_string")]
    pub country_code: String,
    /// Leading digit of local numbers.
    #[serde(deserialize_with = "digit_string")]
    pub trunk_prefix: String,
}

// Env values and bare TOML numbers arrive as integers.
fn digit_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Digits {
        Text(String),
        Number(u64),
    }

    Ok(match Digits::deserialize(deserializer)? {
        Digits::Text(text) => text,
        Digits::Number(number) => number.to_string(),
    })
}

/// Message drafting configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftingConfig {
    /// Program and arguments; it reads a prompt on stdin and prints a
    /// message. Empty disables drafting.
    pub command: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { code_attempts: 1 }
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            base_url: "https://tagmykid.app/".to_string(),
            qr_service_url: "https://api.qrserver.com/v1/create-qr-code/".to_string(),
            qr_size: 250,
        }
    }
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            messaging_url: "https://wa.me".to_string(),
            country_code: "27".to_string(),
            trunk_prefix: "0".to_string(),
        }
    }
}

fn check_url(key: &str, value: &str) -> Result<()> {
    Url::parse(value).map_err(|e| Error::ConfigValidation {
        message: format!("{key} {value:?} is not a valid URL: {e}"),
    })?;
    Ok(())
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `TAGMYKID_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        Self::from_sources(&config_file, Env::prefixed(ENV_PREFIX))
    }

    fn from_sources(config_file: &Path, env: Env) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(env.split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.registry.code_attempts == 0 {
            return Err(Error::ConfigValidation {
                message: "registry.code_attempts must be greater than 0".to_string(),
            });
        }

        check_url("links.base_url", &self.links.base_url)?;
        check_url("links.qr_service_url", &self.links.qr_service_url)?;
        if self.links.qr_size == 0 {
            return Err(Error::ConfigValidation {
                message: "links.qr_size must be greater than 0".to_string(),
            });
        }

        check_url("contact.messaging_url", &self.contact.messaging_url)?;
        let code = &self.contact.country_code;
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::ConfigValidation {
                message: format!("contact.country_code {code:?} must be digits only"),
            });
        }
        let prefix = &self.contact.trunk_prefix;
        if prefix.len() != 1 || !prefix.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::ConfigValidation {
                message: format!("contact.trunk_prefix {prefix:?} must be a single digit"),
            });
        }

        Ok(())
    }

    /// Get the account store path, resolving defaults if not set.
    #[must_use]
    pub fn accounts_path(&self) -> PathBuf {
        self.storage.path.clone().unwrap_or_else(|| {
            let file_name = match self.storage.backend {
                StorageBackend::Json => ACCOUNTS_JSON_FILE_NAME,
                StorageBackend::Sqlite => ACCOUNTS_DB_FILE_NAME,
            };
            Self::default_data_dir().join(file_name)
        })
    }

    /// Get the session directory, resolving defaults if not set.
    #[must_use]
    pub fn session_dir(&self) -> PathBuf {
        self.storage
            .session_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(SESSION_DIR_NAME))
    }

    /// Contact bridge built from the contact section.
    #[must_use]
    pub fn contact_bridge(&self) -> ContactBridge {
        ContactBridge::new(
            &self.contact.messaging_url,
            &self.contact.country_code,
            &self.contact.trunk_prefix,
        )
    }

    /// The configured drafting program, if any.
    #[must_use]
    pub fn drafter(&self) -> Option<CommandDrafter> {
        CommandDrafter::from_argv(&self.drafting.command)
    }
}
