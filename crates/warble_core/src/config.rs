//! Configuration system for warble
//!
//! This module provides configuration structures and utilities for persisting
//! warble settings across sessions.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreError, Result};

/// Environment variable overriding the configured backend base URL.
pub const BASE_URL_ENV: &str = "WARBLE_BASE_URL";

/// Top-level warble configuration, serialized as `warble.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarbleConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the warble backend.
    pub base_url: String,
}

impl ServerConfig {
    /// Effective base URL, honoring the `WARBLE_BASE_URL` override.
    pub fn effective_base_url(&self) -> String {
        std::env::var(BASE_URL_ENV).unwrap_or_else(|_| self.base_url.clone())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

/// Database configuration for SQLite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the database directory.
    pub path: PathBuf,
}

impl DatabaseConfig {
    /// Path to the auth database file.
    pub fn auth_db(&self) -> PathBuf {
        self.path.join("auth.db")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("warble"),
        }
    }
}

/// Candidate config file locations, in precedence order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // Project-specific config
    paths.push(PathBuf::from("warble.toml"));

    // User config directory
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("warble").join("warble.toml"));
    }

    // Home directory fallback
    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".warble").join("config.toml"));
    }

    paths
}

/// Load configuration from a TOML file
pub async fn load_config(path: &Path) -> Result<WarbleConfig> {
    let content =
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CoreError::ConfigurationError {
                config_path: path.display().to_string(),
                field: "file".to_string(),
                expected: "readable TOML file".to_string(),
                cause: ConfigError::Io(e.to_string()),
            })?;

    let config: WarbleConfig =
        toml::from_str(&content).map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "content".to_string(),
            expected: "valid TOML configuration".to_string(),
            cause: ConfigError::TomlParse(e.to_string()),
        })?;

    Ok(config)
}

/// Save configuration to a TOML file
pub async fn save_config(config: &WarbleConfig, path: &Path) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CoreError::ConfigurationError {
                config_path: parent.display().to_string(),
                field: "directory".to_string(),
                expected: "writable directory".to_string(),
                cause: ConfigError::Io(e.to_string()),
            })?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "serialization".to_string(),
            expected: "serializable config structure".to_string(),
            cause: ConfigError::TomlSerialize(e.to_string()),
        })?;

    tokio::fs::write(path, content)
        .await
        .map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "writable file location".to_string(),
            cause: ConfigError::Io(e.to_string()),
        })?;

    Ok(())
}

/// Load configuration from standard locations
pub async fn load_config_from_standard_locations() -> Result<WarbleConfig> {
    for path in config_paths() {
        if path.exists() {
            return load_config(&path).await;
        }
    }

    // No config found, return default
    Ok(WarbleConfig::default())
}

impl WarbleConfig {
    /// Load configuration from standard locations
    pub async fn load() -> Result<Self> {
        load_config_from_standard_locations().await
    }

    /// Load configuration from a specific file
    pub async fn load_from(path: &Path) -> Result<Self> {
        load_config(path).await
    }

    /// Save configuration to a specific file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        save_config(self, path).await
    }

    /// Save configuration to standard location
    pub async fn save(&self) -> Result<()> {
        let config_path = config_paths()
            .into_iter()
            .find(|p| p.parent().map_or(false, |parent| parent.exists()))
            .unwrap_or_else(|| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("warble")
                    .join("warble.toml")
            });

        self.save_to(&config_path).await
    }
}
