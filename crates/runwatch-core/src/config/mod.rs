use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::events::Framing;
use crate::session::{StepRegistry, StepRegistryError, StepSpec};
use crate::session::steps::builtin_steps;
use crate::source::DEFAULT_REPLAY_CHUNK_SIZE;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 1000;
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid step configuration: {0}")]
    Registry(#[from] StepRegistryError),
}

/// User settings, stored as TOML in the platform config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub framing: Framing,
    pub grace_period_ms: u64,
    pub replay_chunk_size: usize,
    pub steps: Vec<StepSpec>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            framing: Framing::default(),
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            replay_chunk_size: DEFAULT_REPLAY_CHUNK_SIZE,
            steps: builtin_steps(),
        }
    }
}

impl Settings {
    /// Get the path to the settings file
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("runwatch").join(SETTINGS_FILE))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        match toml::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!(
                    target: "runwatch::config",
                    path = %path.display(),
                    error = %e,
                    "Failed to parse settings file. Using defaults."
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Command-line and environment values take precedence over the file.
    pub fn with_overrides(mut self, api_url: Option<String>, api_key: Option<String>) -> Self {
        if let Some(api_url) = api_url {
            self.api_url = api_url;
        }
        if api_key.is_some() {
            self.api_key = api_key;
        }
        self
    }

    pub fn step_registry(&self) -> Result<StepRegistry, ConfigError> {
        Ok(StepRegistry::new(self.steps.clone())?)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}
