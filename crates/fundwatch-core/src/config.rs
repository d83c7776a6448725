//! Application configuration management.
//!
//! Configuration is a flat JSON object of string settings, normally
//! `config.json` next to the binary's working directory:
//!
//! ```json
//! { "PORTAL_SERVER": "https://portal.example.com/", "CACHE_DIR": "/var/cache/fundwatch",
//!   "API_USERNAME": "bot", "API_PASSWORD": "..." }
//! ```
//!
//! Environment variables with the same names override file values. The
//! struct is built once at startup and passed by reference to whatever
//! needs it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::login::{LoginCredentials, PASSWORD_PLACEHOLDER, USERNAME_PLACEHOLDER};

/// Application name used for cache directory paths
pub const APP_NAME: &str = "fundwatch";

/// Config file name
pub const CONFIG_FILE: &str = "config.json";

pub const PORTAL_SERVER: &str = "PORTAL_SERVER";
pub const CACHE_DIR: &str = "CACHE_DIR";
pub const API_USERNAME: &str = "API_USERNAME";
pub const API_PASSWORD: &str = "API_PASSWORD";

/// Keys that may be overridden from the environment
const ENV_KEYS: [&str; 4] = [PORTAL_SERVER, CACHE_DIR, API_USERNAME, API_PASSWORD];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config {
    values: BTreeMap<String, Value>,
}

impl Config {
    /// Load from `path`; a missing file yields an empty config
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Self = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            debug!(path = %path.display(), keys = config.values.len(), "Loaded config");
            Ok(config)
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from `path`, then apply environment overrides
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_overrides(ENV_KEYS.iter().filter_map(|key| {
            std::env::var(key).ok().map(|value| (key.to_string(), value))
        }));
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in overrides {
            self.set(key, value);
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), Value::String(value.into()));
    }

    /// Look up a setting. Non-string scalars are returned in their JSON form.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.values.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn portal_server(&self) -> Result<String> {
        self.get(PORTAL_SERVER)
            .ok_or_else(|| anyhow::anyhow!("{} is not configured", PORTAL_SERVER))
    }

    /// Configured cache directory, or the platform default
    pub fn cache_dir(&self) -> PathBuf {
        self.get(CACHE_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_dir)
    }

    pub fn login_credentials(&self) -> LoginCredentials {
        LoginCredentials::new(
            self.get_or(API_USERNAME, USERNAME_PLACEHOLDER),
            self.get_or(API_PASSWORD, PASSWORD_PLACEHOLDER),
        )
    }
}

/// Platform cache directory for the app, falling back to the temp dir
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.portal_server().is_err());
    }

    #[test]
    fn test_load_and_get() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"{"PORTAL_SERVER": "https://portal.example.com/", "CACHE_DIR": "/tmp/fw", "RETRIES": 3, "EMPTY": null}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.portal_server().unwrap(), "https://portal.example.com/");
        assert_eq!(config.cache_dir(), PathBuf::from("/tmp/fw"));
        assert_eq!(config.get("RETRIES").as_deref(), Some("3"));
        assert_eq!(config.get("EMPTY"), None);
        assert_eq!(config.get_or("MISSING", "fallback"), "fallback");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_credentials_fall_back_to_placeholders() {
        let mut config = Config::default();
        let credentials = config.login_credentials();
        assert_eq!(credentials.username, "USERNAME_NEEDED");
        assert_eq!(credentials.password, "PASSWORD_NEEDED");
        assert!(credentials.is_placeholder());

        config.apply_overrides([
            (API_USERNAME.to_string(), "bot".to_string()),
            (API_PASSWORD.to_string(), "pw".to_string()),
        ]);
        let credentials = config.login_credentials();
        assert_eq!(credentials, LoginCredentials::new("bot", "pw"));
    }

    #[test]
    fn test_default_cache_dir() {
        let config = Config::default();
        assert!(config.cache_dir().ends_with(APP_NAME));
    }
}
