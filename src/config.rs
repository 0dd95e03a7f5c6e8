//! Application configuration.

use crate::consts::polling::{
    DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::environment::{Environment, EnvironmentType};
use crate::task_client::PollOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use std::{fs, path::Path};

/// Get the path to the config file: `./wagon.config` when it exists, otherwise `~/.wagon/config.json`.
pub fn get_config_path() -> Result<PathBuf, std::io::Error> {
    let local_config_path = std::env::current_dir()?.join("wagon.config");
    if local_config_path.exists() {
        return Ok(local_config_path);
    }

    let home_path = home::home_dir().ok_or(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        "Home directory not found",
    ))?;
    Ok(home_path.join(".wagon").join("config.json"))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Environment name (`local`, `staging`, `production`). Empty means the default.
    #[serde(default)]
    pub environment: String,

    /// Explicit backend URL; takes precedence over the environment's URL.
    #[serde(default)]
    pub base_url: String,

    /// Bearer token sent with every request. Empty when the backend is open.
    #[serde(default)]
    pub auth_token: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Give up on a task after this many seconds; 0 waits forever.
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_wait_secs() -> u64 {
    DEFAULT_MAX_WAIT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            environment: String::new(),
            base_url: String::new(),
            auth_token: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from a JSON file at the given path.
    ///
    /// # Errors
    /// Returns an `std::io::Error` if reading from file fails or JSON is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self, std::io::Error> {
        let buf = fs::read(path)?;
        let config: Config = serde_json::from_slice(&buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Loads the file if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, std::io::Error> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves the configuration to a JSON file at the given path.
    ///
    /// Directories will be created if they don't exist. This method overwrites existing files.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Remove the config file. A missing file is not an error.
    pub fn clear(path: &Path) -> std::io::Result<()> {
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(path)
    }

    /// Resolve the environment, with `override_env` (CLI or env var) taking precedence.
    pub fn environment(&self, override_env: Option<EnvironmentType>) -> Environment {
        let env_type = override_env
            .or_else(|| self.environment.parse::<EnvironmentType>().ok())
            .unwrap_or_default();
        let env = Environment::new(env_type);
        if self.base_url.trim().is_empty() {
            env
        } else {
            env.with_base_url(self.base_url.clone())
        }
    }

    pub fn auth_token(&self) -> Option<String> {
        let token = self.auth_token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn poll_options(&self) -> PollOptions {
        let options = PollOptions::new(Duration::from_millis(self.poll_interval_ms));
        if self.max_wait_secs == 0 {
            options
        } else {
            options.with_max_wait(Duration::from_secs(self.max_wait_secs))
        }
    }
}
