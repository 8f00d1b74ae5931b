use std::fs;
use std::io::ErrorKind;
use tracing::{debug, error, info};

use crate::types::client_config::{AppConfig, ConfigError};

/// Load the client configuration from a TOML file.
///
/// A missing file is not an error — an end-user client must start with zero
/// setup, so it falls back to built-in defaults.  A file that exists but
/// fails to parse or validate is rejected.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No config file at {}, using defaults", path);
            return Ok(AppConfig::default());
        }
        Err(e) => return Err(e.into()),
    };

    debug!("Processing file: {}", path);

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config: AppConfig = toml::from_str(&contents)?;

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    // Surfaces a bad base_url at startup rather than at the first request.
    config.service.authority()?;

    if config.service.request_timeout_secs == 0 {
        return Err(ConfigError::InvalidConfig(
            "request_timeout_secs must be greater than 0".into(),
        ));
    }

    if config.storage.token_file.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "token_file cannot be empty".into(),
        ));
    }

    if config.edit.max_open_edits == 0 {
        return Err(ConfigError::InvalidConfig(
            "max_open_edits must be greater than 0".into(),
        ));
    }

    Ok(())
}
