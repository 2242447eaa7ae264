//! Test-only helpers: throwaway repositories and scripted engine/script fakes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::types::StepOutput;
use crate::io::e2e::ScriptRunner;
use crate::io::engine::{BuildRequest, ContainerEngine, DetachedRun, ForegroundRun};
use crate::io::paths::AgentPaths;

/// Repository rooted in a temp dir nested one level deep, so the build
/// context (the parent) is also private to the test.
pub struct TestRepo {
    _temp: TempDir,
    paths: AgentPaths,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp dir")?;
        let root = temp.path().join("repo");
        fs::create_dir(&root).with_context(|| format!("create {}", root.display()))?;
        Ok(Self {
            _temp: temp,
            paths: AgentPaths::new(root),
        })
    }

    pub fn path(&self) -> &Path {
        &self.paths.root
    }

    pub fn paths(&self) -> &AgentPaths {
        &self.paths
    }

    /// Write `contents` to `rel_path`, creating parent directories.
    pub fn write(&self, rel_path: &str, contents: &str) -> Result<PathBuf> {
        let path = self.paths.root.join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

/// Successful step with the given stdout.
pub fn ok(stdout: &str) -> StepOutput {
    StepOutput {
        exit_code: Some(0),
        stdout: stdout.to_string(),
        ..StepOutput::default()
    }
}

/// Failed step with the given exit code and stderr.
pub fn failed(code: i32, stderr: &str) -> StepOutput {
    StepOutput {
        exit_code: Some(code),
        stderr: stderr.to_string(),
        ..StepOutput::default()
    }
}

/// One recorded engine verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Build(BuildRequest),
    RunForeground(ForegroundRun),
    RunDetached(DetachedRun),
    Stop(String),
}

/// Engine fake returning a fixed output per verb. Every verb succeeds with
/// empty output unless overridden.
pub struct ScriptedEngine {
    build: StepOutput,
    foreground: StepOutput,
    detached: StepOutput,
    stop: StepOutput,
    calls: RefCell<Vec<EngineCall>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            build: ok(""),
            foreground: ok(""),
            detached: ok(""),
            stop: ok(""),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_build(mut self, output: StepOutput) -> Self {
        self.build = output;
        self
    }

    pub fn with_foreground(mut self, output: StepOutput) -> Self {
        self.foreground = output;
        self
    }

    pub fn with_detached(mut self, output: StepOutput) -> Self {
        self.detached = output;
        self
    }

    pub fn with_stop(mut self, output: StepOutput) -> Self {
        self.stop = output;
        self
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, EngineCall::Stop(_)))
            .count()
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerEngine for ScriptedEngine {
    fn build(&self, request: &BuildRequest) -> StepOutput {
        self.calls.borrow_mut().push(EngineCall::Build(request.clone()));
        self.build.clone()
    }

    fn run_foreground(&self, request: &ForegroundRun) -> StepOutput {
        self.calls
            .borrow_mut()
            .push(EngineCall::RunForeground(request.clone()));
        self.foreground.clone()
    }

    fn run_detached(&self, request: &DetachedRun) -> StepOutput {
        self.calls
            .borrow_mut()
            .push(EngineCall::RunDetached(request.clone()));
        self.detached.clone()
    }

    fn stop(&self, name: &str) -> StepOutput {
        self.calls.borrow_mut().push(EngineCall::Stop(name.to_string()));
        self.stop.clone()
    }
}

/// Script runner fake that replays queued outputs in order.
pub struct ScriptedScripts {
    outputs: RefCell<VecDeque<StepOutput>>,
    calls: RefCell<Vec<PathBuf>>,
}

impl ScriptedScripts {
    pub fn new(outputs: Vec<StepOutput>) -> Self {
        Self {
            outputs: RefCell::new(outputs.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.borrow().clone()
    }
}

impl ScriptRunner for ScriptedScripts {
    fn run_script(&self, script: &Path) -> StepOutput {
        self.calls.borrow_mut().push(script.to_path_buf());
        self.outputs
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| StepOutput::not_started("no scripted output left"))
    }
}
