use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::UschedError;
use crate::task::{BASE_WEIGHT, DEFAULT_MAX_TASKS};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Stats output format ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for StatsFormat {
    type Err = UschedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(StatsFormat::Table),
            "json" => Ok(StatsFormat::Json),
            other => Err(UschedError::Config(format!(
                "unknown stats format '{}' (expected table or json)",
                other
            ))),
        }
    }
}

// ── Scheduler config ──────────────────────────────────────────

/// Scheduler configuration, typically parsed from TOML.
///
/// Resolution order: file (or defaults), then `USCHED_*` environment
/// variables, then command-line flags applied by the binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedConfig {
    /// Maximum number of tasks dispatched per loop cycle.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Registry capacity. Identifiers at or above this are rejected.
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
    /// Weight treated as neutral priority.
    #[serde(default = "default_base_weight")]
    pub base_weight: u64,
    /// Only route tasks already on the ext policy to user space.
    #[serde(default)]
    pub partial: bool,
    /// Diagnostics sampling interval in milliseconds.
    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,
    #[serde(default)]
    pub stats_format: StatsFormat,
}

fn default_batch_size() -> u32 { 8 }
fn default_max_tasks() -> usize { DEFAULT_MAX_TASKS }
fn default_base_weight() -> u64 { BASE_WEIGHT }
fn default_stats_interval_ms() -> u64 { 1000 }

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_tasks: default_max_tasks(),
            base_weight: default_base_weight(),
            partial: false,
            stats_interval_ms: default_stats_interval_ms(),
            stats_format: StatsFormat::default(),
        }
    }
}

impl SchedConfig {
    /// Parse config from a TOML string. Does not apply env overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, UschedError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path. Does not apply env overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, UschedError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Load from `path` when given (defaults otherwise), then apply
    /// `USCHED_*` environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, UschedError> {
        let mut config = match path {
            Some(p) => {
                tracing::debug!(path = %p.display(), "loading scheduler config");
                Self::from_file(p)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_opt);
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("USCHED_BATCH_SIZE") {
            match v.parse() {
                Ok(n) => self.batch_size = n,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid USCHED_BATCH_SIZE"),
            }
        }
        if let Some(v) = lookup("USCHED_MAX_TASKS") {
            match v.parse() {
                Ok(n) => self.max_tasks = n,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid USCHED_MAX_TASKS"),
            }
        }
        if let Some(v) = lookup("USCHED_BASE_WEIGHT") {
            match v.parse() {
                Ok(n) => self.base_weight = n,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid USCHED_BASE_WEIGHT"),
            }
        }
        if let Some(v) = lookup("USCHED_PARTIAL") {
            self.partial = matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = lookup("USCHED_STATS_INTERVAL_MS") {
            match v.parse() {
                Ok(n) => self.stats_interval_ms = n,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid USCHED_STATS_INTERVAL_MS"),
            }
        }
        if let Some(v) = lookup("USCHED_STATS_FORMAT") {
            match v.parse() {
                Ok(f) => self.stats_format = f,
                Err(e) => tracing::warn!(error = %e, "ignoring USCHED_STATS_FORMAT"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), UschedError> {
        if self.batch_size == 0 {
            return Err(UschedError::Config("batch_size must be at least 1".into()));
        }
        if self.max_tasks == 0 {
            return Err(UschedError::Config("max_tasks must be at least 1".into()));
        }
        if self.max_tasks > i32::MAX as usize {
            return Err(UschedError::Config(format!(
                "max_tasks {} exceeds the task id range",
                self.max_tasks
            )));
        }
        if self.base_weight == 0 {
            return Err(UschedError::Config("base_weight must be non-zero".into()));
        }
        if self.stats_interval_ms == 0 {
            return Err(UschedError::Config("stats_interval_ms must be non-zero".into()));
        }
        Ok(())
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Scheduler config:");
        tracing::info!("  batch_size:     {}", self.batch_size);
        tracing::info!("  max_tasks:      {}", self.max_tasks);
        tracing::info!("  base_weight:    {}", self.base_weight);
        tracing::info!("  partial:        {}", self.partial);
        tracing::info!("  stats:          every {}ms as {:?}", self.stats_interval_ms, self.stats_format);
    }
}
