use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use crate::page::{
    MacProtector, NoProtection, PageOptions, StatePersister, StateProtector,
    DEFAULT_MAX_STATE_LENGTH,
};
use crate::tree::DEFAULT_ID_SEPARATOR;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// State persistence settings
    pub persistence: PersistenceConfig,
    /// Demo web server settings
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProtectionMode {
    #[default]
    None,
    Mac,
}

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Master switch for state persistence
    pub enabled: bool,
    /// Replay validation of posted interactions
    pub event_validation: bool,
    /// Largest inbound state accepted, in characters across all chunks
    pub max_state_length: usize,
    /// Split outbound state into hidden fields of this many characters; 0 disables
    pub max_field_length: usize,
    pub protection: ProtectionMode,
    /// Key for `protection = "mac"`
    pub mac_key: Option<String>,
    /// Separator between naming-container segments of unique ids
    pub id_separator: char,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            event_validation: true,
            max_state_length: DEFAULT_MAX_STATE_LENGTH,
            max_field_length: 0,
            protection: ProtectionMode::None,
            mac_key: None,
            id_separator: DEFAULT_ID_SEPARATOR,
        }
    }
}

impl PersistenceConfig {
    pub fn protector(&self) -> Arc<dyn StateProtector> {
        match (self.protection, self.mac_key.as_deref()) {
            (ProtectionMode::Mac, Some(key)) => Arc::new(MacProtector::new(key.as_bytes())),
            (ProtectionMode::Mac, None) => {
                tracing::warn!("MAC protection requested without a key; state is unprotected");
                Arc::new(NoProtection)
            }
            (ProtectionMode::None, _) => Arc::new(NoProtection),
        }
    }

    pub fn persister(&self) -> StatePersister {
        StatePersister::default()
            .with_protector(self.protector())
            .with_max_state_length(self.max_state_length)
            .with_max_field_length(self.max_field_length)
    }

    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            state_enabled: self.enabled,
            event_validation: self.event_validation,
        }
    }
}

/// Server configuration options.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TomlStateConfig {
    pub enabled: Option<bool>,
    pub event_validation: Option<bool>,
    pub max_state_length: Option<usize>,
    pub max_field_length: Option<usize>,
    pub protection: Option<ProtectionMode>,
    pub mac_key: Option<String>,
    pub id_separator: Option<char>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// State persistence configuration
    pub state: Option<TomlStateConfig>,
    /// Web server configuration
    pub server: Option<TomlServerConfig>,
}

/// Default config file location (~/.postback/config.toml)
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".postback"))
        .unwrap_or_else(|| PathBuf::from(".postback"))
        .join("config.toml")
}

impl Config {
    /// Parse a config file, layering its values over the defaults
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(contents).context("invalid config file")?;
        let mut config = Config::default();

        if let Some(state) = toml_config.state {
            let persistence = &mut config.persistence;
            if let Some(enabled) = state.enabled {
                persistence.enabled = enabled;
            }
            if let Some(event_validation) = state.event_validation {
                persistence.event_validation = event_validation;
            }
            if let Some(max_state_length) = state.max_state_length {
                persistence.max_state_length = max_state_length;
            }
            if let Some(max_field_length) = state.max_field_length {
                persistence.max_field_length = max_field_length;
            }
            if let Some(protection) = state.protection {
                persistence.protection = protection;
            }
            if let Some(id_separator) = state.id_separator {
                persistence.id_separator = id_separator;
            }
            persistence.mac_key = state.mac_key.filter(|key| !key.is_empty());
        }

        if let Some(server) = toml_config.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
        }

        if config.persistence.protection == ProtectionMode::Mac
            && config.persistence.mac_key.is_none()
        {
            anyhow::bail!("protection = \"mac\" requires a non-empty mac-key");
        }

        Ok(config)
    }

    /// Load configuration from `path` (or the default location), falling
    /// back to defaults when the file is missing or invalid
    pub fn load(path: Option<&Path>) -> Self {
        let config_file = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

        if !config_file.exists() {
            tracing::debug!(path = %config_file.display(), "No config file; using defaults");
            return Config::default();
        }

        let contents = match fs::read_to_string(&config_file) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %config_file.display(), error = %e, "Failed to read config file");
                return Config::default();
            }
        };

        match Self::from_toml_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %config_file.display(), error = %format!("{e:#}"), "Ignoring config file");
                Config::default()
            }
        }
    }
}
