use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "THERAPIST_MODEL";
pub const BASE_URL_VAR: &str = "THERAPIST_BASE_URL";
pub const BIND_VAR: &str = "THERAPIST_BIND";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

/// Optional on-disk settings (`<config_dir>/therapist/config.json`).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Request timeout; `0` disables it.
    pub timeout_secs: Option<u64>,
    pub include_history: bool,
    pub bind: Option<String>,
}

impl Settings {
    /// Load from the platform config directory. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("no platform config directory, using default settings");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadSettings {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&content).map_err(|source| {
            ConfigError::InvalidSettings {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Listen address for the browser frontend; `THERAPIST_BIND` wins over the file.
    pub fn bind_address(&self) -> String {
        env_var(BIND_VAR)
            .or_else(|| self.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("therapist").join("config.json"))
    }
}

/// Fully resolved, read-only startup configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// `None` when the settings file disables the timeout.
    pub timeout: Option<Duration>,
    pub include_history: bool,
}

impl Config {
    /// Read the settings file and the process environment. Call
    /// [`load_env_file`] first so `.env` values are visible.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Settings::load()?;
        Self::resolve(settings, env_var)
    }

    /// Combine settings with an environment lookup. Environment values win.
    pub fn resolve(
        settings: Settings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let api_key = env(API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey { var: API_KEY_VAR })?;

        let model = env(MODEL_VAR)
            .or(settings.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = env(BASE_URL_VAR)
            .or(settings.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = match settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            api_key: api_key.trim().to_string(),
            model,
            base_url,
            timeout,
            include_history: settings.include_history,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("include_history", &self.include_history)
            .finish()
    }
}

/// Load `.env` from the working directory, if there is one, and return its path.
///
/// Runs before any subscriber exists so that `RUST_LOG` may come from the file;
/// callers log the returned path once logging is up. Variables already set in
/// the process environment are kept.
pub fn load_env_file() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

/// Like [`load_env_file`], for an explicit file.
pub fn load_env_file_from(path: &Path) -> Option<PathBuf> {
    dotenv::from_path(path).ok().map(|()| path.to_path_buf())
}

/// Non-blank process environment variable.
pub fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}
