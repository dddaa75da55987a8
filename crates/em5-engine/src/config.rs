//! Engine configuration.
//!
//! Every section has defaults, so a config file only names what it changes:
//!
//! ```json
//! { "tick": { "fixed_dt": 0.05 }, "stuck": { "stage_switch_delay_secs": 3.0 } }
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use em5_ai::system::StuckResolvingConfig;

use crate::tick::TickConfig;

/// Filter used when neither `RUST_LOG` nor the config names one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tick: TickConfig,
    pub stuck: StuckResolvingConfig,
    /// `tracing` filter directives, e.g. `"em5_ai=debug,warn"`.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig::default(),
            stuck: StuckResolvingConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("malformed engine config")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read engine config {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("invalid engine config {}", path.display()))?;
        tracing::info!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.tick.is_valid() {
            anyhow::bail!(
                "tick.fixed_dt must be a positive duration, got {}",
                self.tick.fixed_dt
            );
        }
        let stuck = &self.stuck;
        for (name, secs) in [
            ("stage_switch_delay_secs", stuck.stage_switch_delay_secs),
            ("stuck_after_secs", stuck.stuck_after_secs),
        ] {
            if !(secs >= 0.0 && Duration::try_from_secs_f32(secs).is_ok()) {
                anyhow::bail!("stuck.{name} must be a non-negative duration, got {secs}");
            }
        }
        if stuck.max_cycle_length < 2 {
            anyhow::bail!(
                "stuck.max_cycle_length must be at least 2, got {}",
                stuck.max_cycle_length
            );
        }
        Ok(())
    }
}
