//! Subcommand implementations.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use rcpt_core::{AzureOpenAiClient, AzureSettings, RcptConfig};
use tracing::debug;

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rcpt")
        .join("config.json")
}

/// Load the config from `--config`, else the default path, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RcptConfig> {
    if let Some(path) = config_path {
        return Ok(RcptConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using config file {}", default_path.display());
        Ok(RcptConfig::from_file(&default_path)?)
    } else {
        Ok(RcptConfig::default())
    }
}

/// Resolve credentials and build the extraction client.
pub fn build_client(config: &RcptConfig) -> anyhow::Result<AzureOpenAiClient> {
    let settings = AzureSettings::from_env(&config.service)?;
    debug!("Resolved service settings: {:?}", settings);
    Ok(AzureOpenAiClient::from_config(settings, config)?)
}
