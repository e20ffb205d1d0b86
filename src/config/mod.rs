// Layered configuration system

pub mod loader;
pub mod merger;

pub use loader::{AppConfig, ConfigLoader, DecoderConfig, SessionConfig};
pub use merger::{
    ConfigMerger, PartialConfig, PartialDecoderConfig, PartialSessionConfig,
};

use anyhow::Result;

/// Load and merge configuration from the loader's global and project files
/// Priority: CLI -> Project -> Global -> Defaults
pub fn load_with_loader(
    loader: &ConfigLoader,
    cli_overrides: Option<PartialConfig>,
) -> Result<AppConfig> {
    let global = loader.load_global()?;
    let project = loader.load_project()?;

    Ok(ConfigMerger::new()
        .with_global(global)
        .with_project(project)
        .with_cli(cli_overrides)
        .merge())
}
