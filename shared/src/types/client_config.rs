use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Root URL of the news service, e.g. `"http://127.0.0.1:8000"`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Path of the single file holding the raw access token.
    /// Absence of the file means unauthenticated.
    #[serde(default = "default_token_file")]
    pub token_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EditConfig {
    /// How many inline edit boxes may be open at once across a list.
    ///
    /// 1 keeps the classic behavior where starting an edit closes any other
    /// open one.  Raising it is a policy choice, not a correctness change.
    #[serde(default = "default_max_open_edits")]
    pub max_open_edits: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub edit: EditConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServiceConfig {
    /// Host and port parsed out of `base_url`.
    pub fn authority(&self) -> Result<(String, u16), ConfigError> {
        let uri: http::Uri = self
            .base_url
            .parse()
            .map_err(|_| ConfigError::InvalidConfig(format!("bad base_url: {}", self.base_url)))?;

        let host = uri
            .host()
            .ok_or_else(|| {
                ConfigError::InvalidConfig(format!("base_url has no host: {}", self.base_url))
            })?
            .to_string();

        Ok((host, uri.port_u16().unwrap_or(80)))
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
        }
    }
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            max_open_edits: default_max_open_edits(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            storage: StorageConfig::default(),
            edit: EditConfig::default(),
        }
    }
}

pub fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

pub fn default_request_timeout() -> u64 {
    10
}

pub fn default_token_file() -> String {
    ".news-token".to_string()
}

pub fn default_max_open_edits() -> usize {
    1
}
