// Configuration merging with priority

use super::loader::{AppConfig, DecoderConfig, SessionConfig};
use serde::{Deserialize, Serialize};

/// Partial configuration for merging
/// Uses Option<T> for all fields to support partial overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialConfig {
    #[serde(default)]
    pub decoder: Option<PartialDecoderConfig>,
    #[serde(default)]
    pub session: Option<PartialSessionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialDecoderConfig {
    pub buffer_soft_limit_bytes: Option<usize>,
    pub tracked_files_soft_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PartialSessionConfig {
    pub chunk_timeout_secs: Option<u64>,
}

/// Configuration merger
/// Priority order: CLI -> Project -> Global -> Defaults
pub struct ConfigMerger {
    defaults: AppConfig,
    global: Option<AppConfig>,
    project: Option<AppConfig>,
    cli: Option<PartialConfig>,
}

impl ConfigMerger {
    pub fn new() -> Self {
        Self {
            defaults: AppConfig::default(),
            global: None,
            project: None,
            cli: None,
        }
    }

    pub fn with_global(mut self, config: Option<AppConfig>) -> Self {
        self.global = config;
        self
    }

    pub fn with_project(mut self, config: Option<AppConfig>) -> Self {
        self.project = config;
        self
    }

    pub fn with_cli(mut self, config: Option<PartialConfig>) -> Self {
        self.cli = config;
        self
    }

    /// Merge all configs with priority
    pub fn merge(&self) -> AppConfig {
        let mut result = self.defaults.clone();

        if let Some(ref global) = self.global {
            result = global.clone();
        }

        // Project config overrides global
        if let Some(ref project) = self.project {
            result = project.clone();
        }

        // CLI overrides have the highest priority
        if let Some(ref cli) = self.cli {
            result = self.merge_partial(&result, cli);
        }

        result
    }

    fn merge_partial(&self, base: &AppConfig, partial: &PartialConfig) -> AppConfig {
        AppConfig {
            decoder: partial
                .decoder
                .as_ref()
                .map(|p| merge_partial_decoder(&base.decoder, p))
                .unwrap_or(base.decoder),
            session: partial
                .session
                .as_ref()
                .map(|p| merge_partial_session(&base.session, p))
                .unwrap_or(base.session),
        }
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_partial_decoder(base: &DecoderConfig, partial: &PartialDecoderConfig) -> DecoderConfig {
    DecoderConfig {
        buffer_soft_limit_bytes: partial
            .buffer_soft_limit_bytes
            .unwrap_or(base.buffer_soft_limit_bytes),
        tracked_files_soft_limit: partial
            .tracked_files_soft_limit
            .unwrap_or(base.tracked_files_soft_limit),
    }
}

fn merge_partial_session(base: &SessionConfig, partial: &PartialSessionConfig) -> SessionConfig {
    SessionConfig {
        chunk_timeout_secs: partial.chunk_timeout_secs.unwrap_or(base.chunk_timeout_secs),
    }
}
