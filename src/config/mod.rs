//! Configuration loading
//!
//! The config file is JSON5. Its location is `$IVR_CONFIG_PATH` when set,
//! otherwise `<config dir>/ivr-read/config.json5`. Every section is optional.

use crate::logging::LoggingConfig;
use crate::voice::{ReaderConfig, SimulatorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable overriding the config path
pub const CONFIG_PATH_ENV: &str = "IVR_CONFIG_PATH";

const CONFIG_FILE_NAME: &str = "config.json5";
const APP_DIR: &str = "ivr-read";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IvrConfig {
    pub reader: ReaderConfig,
    pub logging: LoggingConfig,
    pub simulator: SimulatorConfig,
}

impl IvrConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reader.validate().map_err(ConfigError::Invalid)
    }
}

/// Resolve the config file path
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE_NAME)
}

/// Load the configuration from the default location
pub fn load_config() -> Result<IvrConfig, ConfigError> {
    load_config_from(&config_path())
}

/// Load the configuration from `path`; a missing file yields the defaults
pub fn load_config_from(path: &Path) -> Result<IvrConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(IvrConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config = parse_config(&raw).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    config.validate()?;
    Ok(config)
}

/// Parse JSON5 config text
pub fn parse_config(raw: &str) -> Result<IvrConfig, String> {
    if raw.trim().is_empty() {
        return Ok(IvrConfig::default());
    }
    json5::from_str(raw).map_err(|e| e.to_string())
}
