// Configuration file loading

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::config_path;

/// Appforge configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Stream decoder settings
    #[serde(default)]
    pub decoder: DecoderConfig,
    /// Generation session settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Stream decoder configuration.
///
/// These are expectations, not limits: crossing them only logs a warning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Buffer size a single response is expected to stay under
    #[serde(
        rename = "bufferSoftLimitBytes",
        alias = "buffer_soft_limit_bytes",
        default = "default_buffer_soft_limit"
    )]
    pub buffer_soft_limit_bytes: usize,
    /// Number of files a single response is expected to stay under
    #[serde(
        rename = "trackedFilesSoftLimit",
        alias = "tracked_files_soft_limit",
        default = "default_tracked_files_soft_limit"
    )]
    pub tracked_files_soft_limit: usize,
}

fn default_buffer_soft_limit() -> usize {
    1024 * 1024
}
fn default_tracked_files_soft_limit() -> usize {
    64
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            buffer_soft_limit_bytes: default_buffer_soft_limit(),
            tracked_files_soft_limit: default_tracked_files_soft_limit(),
        }
    }
}

/// Generation session configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Seconds to wait for the next chunk before giving up (0 disables)
    #[serde(
        rename = "chunkTimeoutSecs",
        alias = "chunk_timeout_secs",
        default = "default_chunk_timeout_secs"
    )]
    pub chunk_timeout_secs: u64,
}

fn default_chunk_timeout_secs() -> u64 {
    120
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_timeout_secs: default_chunk_timeout_secs(),
        }
    }
}

/// Configuration loader
pub struct ConfigLoader {
    /// Global config path
    global_path: Option<PathBuf>,
    /// Project config path
    project_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self {
            global_path: Self::get_global_config_path(),
            project_path: None,
        }
    }

    /// Set the project path
    pub fn with_project_path(mut self, path: &Path) -> Self {
        self.project_path = Some(config_path(path));
        self
    }

    /// Override the global config location
    pub fn with_global_path(mut self, path: Option<PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    fn get_global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| config_path(&home))
    }

    pub fn load_global(&self) -> Result<Option<AppConfig>> {
        match self.global_path {
            Some(ref path) => self.load_from_path(path),
            None => Ok(None),
        }
    }

    pub fn load_project(&self) -> Result<Option<AppConfig>> {
        match self.project_path {
            Some(ref path) => self.load_from_path(path),
            None => Ok(None),
        }
    }

    /// Load config from a specific path. A missing file is not an error.
    pub fn load_from_path(&self, path: &Path) -> Result<Option<AppConfig>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: AppConfig = toml::from_str(&contents)
            .map_err(|e| anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;

        validate_config(&config)?;

        log::debug!("Loaded config from: {}", path.display());
        Ok(Some(config))
    }

    pub fn global_config_path(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    pub fn project_config_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    /// Save config to a specific path
    pub fn save_to_path(&self, path: &Path, config: &AppConfig) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    anyhow!(
                        "Failed to create config directory '{}': {}",
                        parent.display(),
                        e
                    )
                })?;
            }
        }

        validate_config(config)?;

        let contents = toml::to_string_pretty(config)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path, contents)
            .map_err(|e| anyhow!("Failed to write config file '{}': {}", path.display(), e))?;

        log::info!("Saved config to: {}", path.display());
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate config values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.decoder.buffer_soft_limit_bytes == 0 {
        return Err(anyhow!("bufferSoftLimitBytes must be greater than 0"));
    }

    if config.decoder.tracked_files_soft_limit == 0 {
        return Err(anyhow!("trackedFilesSoftLimit must be greater than 0"));
    }

    Ok(())
}
