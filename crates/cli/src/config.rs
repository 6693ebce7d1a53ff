use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use usched_hook::SimConfig;

/// The parts of the config file owned by the binary. Scheduler settings
/// at the top level are read by `SchedConfig::load`; this only picks up
/// the `[sim]` table.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    sim: SimConfig,
}

/// Return the default config directory path: ~/.config/usched/
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("usched"))
}

/// Resolve the config file to read. An explicit path is always used; the
/// default path only when it exists.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    let path = default_config_dir()?.join("config.toml");
    if path.exists() {
        debug!(?path, "using default config file");
        Some(path)
    } else {
        None
    }
}

/// Parse the `[sim]` table of a config file.
pub fn sim_from_toml(content: &str) -> Result<SimConfig> {
    let file: FileConfig = toml::from_str(content).context("failed to parse [sim] table")?;
    Ok(file.sim)
}

/// Load simulation settings, falling back to defaults without a file.
pub fn load_sim(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    sim_from_toml(&content).with_context(|| format!("in {}", path.display()))
}
