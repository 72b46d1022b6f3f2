use crate::error::ConfigError;
use crate::proxy::BindRequest;
use crate::{ENGINE_BINARY, ENGINE_HOSTNAME, SYNC_SERVICE_CLASS, SYNC_SERVICE_PACKAGE};

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "sync_client.json";
const CONFIG_DIR_NAME: &str = "odk-sync";
const CONFIG_VERSION: u32 = 1;
const MAX_CONNECT_TIMEOUT_SECS: u64 = 300;

// ============================================
// CONFIG STRUCTS
// ============================================

/// Identity of the engine service a proxy binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_package")]
    pub package: String,
    #[serde(default = "default_class_name")]
    pub class_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            package: default_package(),
            class_name: default_class_name(),
        }
    }
}

/// Where the engine listens and how to start it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of an already running engine. When unset the engine is launched.
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default = "default_auto_create")]
    pub auto_create: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl EngineConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: None,
            auth_token: None,
            executable: default_executable(),
            auto_create: default_auto_create(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncClientConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

impl Default for SyncClientConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            service: ServiceConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_package() -> String {
    SYNC_SERVICE_PACKAGE.to_string()
}
fn default_class_name() -> String {
    SYNC_SERVICE_CLASS.to_string()
}
fn default_host() -> String {
    ENGINE_HOSTNAME.to_string()
}
fn default_executable() -> String {
    ENGINE_BINARY.to_string()
}
fn default_auto_create() -> bool {
    true
}
fn default_connect_timeout_secs() -> u64 {
    20
}

// ============================================
// IMPLEMENTATION
// ============================================

impl SyncClientConfig {
    /// Platform config directory for the sync client, e.g. `~/.config/odk-sync`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DirectoryNotFound`] if the platform has no config directory.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or_else(|| ConfigError::DirectoryNotFound {
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Path of the config file inside `config_dir`.
    pub fn file_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILE_NAME)
    }

    /// Load config from {config_dir}/sync_client.json.
    ///
    /// Returns defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read, parsed or validated.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = Self::file_path(config_dir);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {e}");
            ConfigError::Read {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config: SyncClientConfig = serde_json::from_str(&contents).map_err(|e| {
            warn!("Failed to parse config JSON: {e}");
            ConfigError::Parse {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    /// Save config to {config_dir}/sync_client.json via temp file + rename.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if validation, directory creation, serialization,
    /// write or rename fails.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, json).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::Write {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(validation_error(format!(
                "Invalid version: {} (expected 1-{CONFIG_VERSION})",
                self.version
            )));
        }

        if self.service.package.trim().is_empty() {
            return Err(validation_error("service.package cannot be empty"));
        }

        if self.service.class_name.trim().is_empty() {
            return Err(validation_error("service.class_name cannot be empty"));
        }

        if self.engine.host.trim().is_empty() {
            return Err(validation_error("engine.host cannot be empty"));
        }

        if self.engine.port == Some(0) {
            return Err(validation_error("engine.port cannot be 0"));
        }

        if self.engine.auth_token.as_deref() == Some("") {
            return Err(validation_error("engine.auth_token cannot be empty string"));
        }

        if self.engine.executable.trim().is_empty() {
            return Err(validation_error("engine.executable cannot be empty"));
        }

        if self.engine.connect_timeout_secs == 0
            || self.engine.connect_timeout_secs > MAX_CONNECT_TIMEOUT_SECS
        {
            return Err(validation_error(format!(
                "Invalid connect_timeout_secs: {} (must be 1-{MAX_CONNECT_TIMEOUT_SECS})",
                self.engine.connect_timeout_secs
            )));
        }

        Ok(())
    }

    /// Bind request for the configured service.
    pub fn bind_request(&self) -> BindRequest {
        BindRequest {
            package: self.service.package.clone(),
            class_name: self.service.class_name.clone(),
            auto_create: self.engine.auto_create,
        }
    }
}

#[track_caller]
fn validation_error(reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        location: ErrorLocation::from(Location::caller()),
        reason: reason.into(),
    }
}
