//! Runner launch configuration (optional TOML file).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::state::RunnerSettings;
use crate::io::http_station::StationTimeouts;

/// Launcher configuration.
///
/// Missing fields default to the values the game was tuned with. Command
/// line flags override whatever the file provides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Pause at the start of each arrival cycle, in milliseconds.
    pub restraint_ms: i64,

    /// Delay between discovery queries that found no stations.
    pub retry_ms: i64,

    /// Upper bound on stations returned per discovery query.
    pub max_results: i64,

    /// Emit the runner's diagnostic trace at `info` level.
    pub debug: bool,

    /// Base URL of the discovery registry.
    pub registry_url: String,

    /// Timeout for liveness probes and property lookups.
    pub probe_timeout_ms: u64,

    /// Timeout for every other station call, including the handoff.
    pub call_timeout_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            restraint_ms: 5_000,
            retry_ms: 20_000,
            max_results: 8,
            debug: false,
            registry_url: "http://127.0.0.1:4000".to_string(),
            probe_timeout_ms: 2_000,
            call_timeout_ms: 10_000,
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.probe_timeout_ms == 0 {
            return Err(anyhow!("probe_timeout_ms must be > 0"));
        }
        if self.call_timeout_ms == 0 {
            return Err(anyhow!("call_timeout_ms must be > 0"));
        }
        if self.registry_url.trim().is_empty() {
            return Err(anyhow!("registry_url must not be empty"));
        }
        Ok(())
    }

    /// Runner tunables, clamped through the settings setters.
    pub fn settings(&self) -> RunnerSettings {
        let mut settings = RunnerSettings::default();
        settings.set_restraint_ms(self.restraint_ms);
        settings.set_retry_ms(self.retry_ms);
        settings.set_max_results(self.max_results);
        settings.set_debug(self.debug);
        settings
    }

    pub fn timeouts(&self) -> StationTimeouts {
        StationTimeouts {
            probe: Duration::from_millis(self.probe_timeout_ms),
            call: Duration::from_millis(self.call_timeout_ms),
        }
    }
}

/// Load config from a TOML file. The file must exist.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunnerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(path: &Path, cfg: &RunnerConfig) {
        let buf = toml::to_string_pretty(cfg).expect("serialize config");
        fs::write(path, buf).expect("write config");
    }

    #[test]
    fn load_missing_file_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(load_config(&temp.path().join("missing.toml")).is_err());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("runner.toml");
        let cfg = RunnerConfig {
            restraint_ms: 250,
            debug: true,
            ..RunnerConfig::default()
        };
        write_config(&path, &cfg);
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("runner.toml");
        fs::write(&path, "max_results = 3\n").expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_results, 3);
        assert_eq!(cfg.retry_ms, RunnerConfig::default().retry_ms);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = RunnerConfig {
            call_timeout_ms: 0,
            ..RunnerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_values_clamp_to_zero_in_settings() {
        let cfg = RunnerConfig {
            restraint_ms: -5,
            ..RunnerConfig::default()
        };
        assert_eq!(cfg.settings().restraint(), Duration::ZERO);
    }
}
