//! Agent configuration stored under `.agent/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Agent configuration (TOML).
///
/// Optional and human-edited. Missing fields fall back to the conventional
/// values the pipeline was designed around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Base reference for the three-dot diff (CLI `--base` wins).
    pub base_ref: String,

    /// Container engine executable.
    pub engine: String,

    /// Interpreter used to launch end-to-end scripts.
    pub python: String,

    /// Tag given to the built image.
    pub image_tag: String,

    /// Name of the detached container started for web-style plans.
    pub container_name: String,

    /// Entry-point candidates relative to the repository root, first match wins.
    pub entry_points: Vec<String>,

    pub build_timeout_secs: u64,

    /// Foreground run, detached start and end-to-end script timeout.
    pub run_timeout_secs: u64,

    pub stop_timeout_secs: u64,

    /// Per-stream bound on captured subprocess output held in memory.
    pub output_limit_bytes: usize,

    /// Characters of stdout/stderr kept in the report's Critical Logs.
    pub report_log_chars: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_ref: "main".to_string(),
            engine: "docker".to_string(),
            python: "python".to_string(),
            image_tag: "test-target".to_string(),
            container_name: "test-runner-container".to_string(),
            entry_points: vec!["app.py".to_string(), "entry.py".to_string()],
            build_timeout_secs: 30 * 60,
            run_timeout_secs: 10 * 60,
            stop_timeout_secs: 60,
            output_limit_bytes: 1_000_000,
            report_log_chars: 2000,
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("base_ref", &self.base_ref),
            ("engine", &self.engine),
            ("python", &self.python),
            ("image_tag", &self.image_tag),
            ("container_name", &self.container_name),
        ] {
            if value.trim().is_empty() {
                return Err(anyhow!("{name} must be non-empty"));
            }
        }
        if self.entry_points.iter().any(|e| e.trim().is_empty()) {
            return Err(anyhow!("entry_points must not contain empty entries"));
        }
        if self.build_timeout_secs == 0
            || self.run_timeout_secs == 0
            || self.stop_timeout_secs == 0
        {
            return Err(anyhow!("timeouts must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.report_log_chars == 0 {
            return Err(anyhow!("report_log_chars must be > 0"));
        }
        Ok(())
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
