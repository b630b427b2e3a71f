//! Node configuration loading and tracing setup.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use robomarket_core::AgentConfig;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ROBOMARKET_CONFIG";

/// Config file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "robomarket.toml";

/// Path of the config file to load.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        info!(path = %path.display(), "No config file, using defaults");
        let config = AgentConfig::default();
        config.validate()?;
        return Ok(config);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("invalid config in {}", path.display()))
}

pub fn parse_config(raw: &str) -> Result<AgentConfig> {
    let config: AgentConfig = toml::from_str(raw).context("failed to parse TOML")?;
    config.validate()?;
    Ok(config)
}

/// Initialize tracing.
///
/// Reads `RUST_LOG`; defaults to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
