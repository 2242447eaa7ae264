//! Opaque end-to-end scripts supplied under `.agent/tests/`.
//!
//! A script's exit code and standard streams are the only contract. What it
//! checks, and how it reaches the container, is entirely up to the script.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{info, instrument};

use crate::core::types::StepOutput;
use crate::io::config::AgentConfig;
use crate::io::process::capture;

pub trait ScriptRunner {
    fn run_script(&self, script: &Path) -> StepOutput;
}

/// Launches scripts as `<python> <script>` from the repository root.
#[derive(Debug, Clone)]
pub struct PythonScriptRunner {
    interpreter: String,
    workdir: PathBuf,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl PythonScriptRunner {
    pub fn from_config(cfg: &AgentConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: cfg.python.clone(),
            workdir: workdir.into(),
            timeout: cfg.run_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }
}

impl ScriptRunner for PythonScriptRunner {
    #[instrument(skip_all, fields(script = %script.display()))]
    fn run_script(&self, script: &Path) -> StepOutput {
        info!(interpreter = %self.interpreter, "running end-to-end script");
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script).current_dir(&self.workdir);
        capture("e2e", cmd, self.timeout, self.output_limit_bytes)
    }
}

/// The script at `path`, if one has been provided.
pub fn find_script(path: &Path) -> Option<&Path> {
    path.is_file().then_some(path)
}
