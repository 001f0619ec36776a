//! YAML configuration (strict parsing, every field optional).

use crate::errors::{AppError, AppResult};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "health_metrics.yaml";
pub const DEFAULT_DATA_FILE: &str = "health_metrics.csv";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8501";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    pub data_file: PathBuf,
    pub log: LogConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LogConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            log: LogConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.data_file.as_os_str().is_empty() {
            return Err(AppError::Internal("config: data_file must not be empty".to_string()));
        }
        if self.log.level.trim().is_empty() {
            return Err(AppError::Internal("config: log.level must not be empty".to_string()));
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> AppResult<SocketAddr> {
        self.server.listen.parse().map_err(|_| {
            AppError::Internal(format!(
                "config: server.listen '{}' is not a socket address",
                self.server.listen
            ))
        })
    }
}

pub fn load_from_file(path: &Path) -> AppResult<AppConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|error| AppError::Io(format!("read config {} failed: {}", path.display(), error)))?;
    load_from_str(&raw)
}

pub fn load_from_str(raw: &str) -> AppResult<AppConfig> {
    // An empty document deserializes to unit, not to a defaulted struct.
    if raw.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    let config: AppConfig = serde_yaml::from_str(raw)
        .map_err(|error| AppError::Internal(format!("invalid config yaml: {}", error)))?;
    config.validate()?;
    Ok(config)
}

/// Loads `explicit` when given, else the default file if present, else defaults.
pub fn resolve(explicit: Option<&Path>) -> AppResult<AppConfig> {
    if let Some(path) = explicit {
        return load_from_file(path);
    }
    let fallback = Path::new(DEFAULT_CONFIG_FILE);
    if fallback.exists() {
        return load_from_file(fallback);
    }
    Ok(AppConfig::default())
}
