//! API key storage.
//!
//! The key lives in `~/.sudothink/config.json` as `{"openai_api_key": "..."}`.
//! The `OPENAI_API_KEY` environment variable takes precedence over the file.
//! The store is an explicit value built once in `main` and handed to whoever
//! needs it.

use crate::error::ConfigError;
use dirs::home_dir;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable that overrides the stored key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const API_KEY_FIELD: &str = "openai_api_key";
const API_KEY_PREFIX: &str = "sk-";
const CONFIG_FILE: &str = "config.json";

#[cfg(unix)]
const FILE_MODE: u32 = 0o600;
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_dir: PathBuf,
    env_api_key: Option<String>,
}

impl ConfigStore {
    /// Builds the store for the current user, capturing `OPENAI_API_KEY`.
    pub fn load() -> Result<Self, ConfigError> {
        let env_api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        Ok(Self::new(Self::get_config_dir()?, env_api_key))
    }

    /// Builds a store rooted at `config_dir` with an explicit override value.
    pub fn new(config_dir: impl Into<PathBuf>, env_api_key: Option<String>) -> Self {
        Self {
            config_dir: config_dir.into(),
            env_api_key,
        }
    }

    pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
        let home = home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".sudothink"))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Returns the API key, environment first, then the config file.
    ///
    /// Absence and unreadable files both yield `None`.
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(key) = &self.env_api_key {
            return Some(key.clone());
        }

        match self.read_object() {
            Ok(Some(config)) => config
                .get(API_KEY_FIELD)
                .and_then(Value::as_str)
                .map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable config {}: {}", self.config_path().display(), e);
                None
            }
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_some()
    }

    /// Key shortened for display, e.g. `sk-abcd...wxyz`.
    pub fn masked_api_key(&self) -> Option<String> {
        self.get_api_key().map(|key| mask_api_key(&key))
    }

    /// Validates and stores the key, keeping any other fields in the file.
    pub fn set_api_key(&self, api_key: &str) -> Result<(), ConfigError> {
        let api_key = api_key.trim();
        validate_api_key(api_key)?;

        self.ensure_config_dir()?;

        let mut config = match self.read_object() {
            Ok(existing) => existing.unwrap_or_default(),
            Err(e) => {
                warn!("Replacing unreadable config: {}", e);
                Map::new()
            }
        };
        config.insert(API_KEY_FIELD.to_string(), Value::String(api_key.to_string()));

        self.write_object(&config)?;
        info!("API key saved to {}", self.config_path().display());
        Ok(())
    }

    /// Removes the stored key. Returns whether a key was actually present.
    pub fn remove_api_key(&self) -> Result<bool, ConfigError> {
        let mut config = match self.read_object() {
            Ok(Some(config)) => config,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("Config unreadable, nothing to remove: {}", e);
                return Ok(false);
            }
        };

        if config.remove(API_KEY_FIELD).is_none() {
            return Ok(false);
        }

        self.write_object(&config)?;
        info!("API key removed from {}", self.config_path().display());
        Ok(true)
    }

    fn read_object(&self) -> Result<Option<Map<String, Value>>, ConfigError> {
        let path = self.config_path();
        if !path.exists() {
            debug!("No config file at {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(config) => Ok(Some(config)),
            _ => Ok(Some(Map::new())),
        }
    }

    fn write_object(&self, config: &Map<String, Value>) -> Result<(), ConfigError> {
        let path = self.config_path();
        let content = serde_json::to_string_pretty(config)?;
        let mut file = open_private(&path)?;
        file.write_all(content.as_bytes())?;
        // An existing file keeps its mode on open.
        #[cfg(unix)]
        restrict_permissions(&path, FILE_MODE)?;
        Ok(())
    }

    fn ensure_config_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir)?;
        #[cfg(unix)]
        restrict_permissions(&self.config_dir, DIR_MODE)?;
        Ok(())
    }
}

/// Checks the key is non-empty and carries the OpenAI prefix.
pub fn validate_api_key(api_key: &str) -> Result<(), ConfigError> {
    if api_key.trim().is_empty() {
        return Err(ConfigError::EmptyKey);
    }
    if !api_key.starts_with(API_KEY_PREFIX) {
        return Err(ConfigError::InvalidFormat(API_KEY_PREFIX));
    }
    Ok(())
}

pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() > 11 {
        let head: String = chars[..7].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

/// Opens `path` for writing, creating it owner-only from the start.
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    options.open(path)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}
