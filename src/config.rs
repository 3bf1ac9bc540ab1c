// =============================================================================
// Engine Configuration - persisted tunables with atomic save
// =============================================================================
//
// Every tunable parameter of the engine lives here so that research runs can
// be reconfigured without touching code. Persistence uses an atomic
// tmp + rename pattern to prevent corruption on crash. All fields carry
// `#[serde(default)]` so that adding new fields never breaks loading an
// older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_risk_free_rate() -> f64 {
    0.165
}

fn default_update_throttle_secs() -> f64 {
    1.0
}

/// 0 disables pruning - the store keeps full history.
fn default_max_stored_bars() -> usize {
    0
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Engine-wide tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Risk-free rate used by the Sharpe ratio (annualized, as a fraction).
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,

    /// Delay inserted between sequential per-instrument / per-interval
    /// fetches, in seconds, to stay under upstream rate limits.
    #[serde(default = "default_update_throttle_secs")]
    pub update_throttle_secs: f64,

    /// Maximum bars retained per series in the store after a fetch;
    /// 0 means unlimited.
    #[serde(default = "default_max_stored_bars")]
    pub max_stored_bars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            update_throttle_secs: default_update_throttle_secs(),
            max_stored_bars: default_max_stored_bars(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file, falling back to defaults for any
    /// missing field.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        info!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Load the config if the file exists, otherwise return defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "config not loaded - using defaults");
                Self::default()
            }
        }
    }

    /// Persist the configuration atomically (write to `<path>.tmp`, then
    /// rename over the target).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");

        let json =
            serde_json::to_string_pretty(self).context("failed to serialize engine config")?;
        std::fs::write(&tmp, json)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| {
            format!("failed to rename {} over {}", tmp.display(), path.display())
        })?;

        info!(path = %path.display(), "engine config saved");
        Ok(())
    }

    /// The inter-fetch throttle as a [`std::time::Duration`].
    pub fn update_throttle(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.update_throttle_secs.max(0.0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert!((config.risk_free_rate - 0.165).abs() < 1e-10);
        assert!((config.update_throttle_secs - 1.0).abs() < 1e-10);
        assert_eq!(config.max_stored_bars, 0);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");

        let mut config = EngineConfig::default();
        config.risk_free_rate = 0.05;
        config.max_stored_bars = 1000;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert!((loaded.risk_free_rate - 0.05).abs() < 1e-10);
        assert_eq!(loaded.max_stored_bars, 1000);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert!((config.risk_free_rate - 0.165).abs() < 1e-10);
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let config = EngineConfig::load_or_default("/nonexistent/engine.json");
        assert_eq!(config.max_stored_bars, 0);
    }

    #[test]
    fn negative_throttle_clamps_to_zero() {
        let mut config = EngineConfig::default();
        config.update_throttle_secs = -1.0;
        assert_eq!(config.update_throttle(), std::time::Duration::ZERO);
    }
}
