//! Shared deterministic types for the observe/plan/act/reflect pipeline.
//!
//! Each value is produced once by the stage that owns it and handed to the
//! next stage read-only. None of these types perform I/O.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Application kind inferred from repository signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppType {
    PythonCli,
    PythonWeb,
    Unknown,
}

impl AppType {
    pub fn as_str(self) -> &'static str {
        match self {
            AppType::PythonCli => "python-cli",
            AppType::PythonWeb => "python-web",
            AppType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a repository.
///
/// `entry_point` is `Some` exactly when `app_type != Unknown`; use the
/// constructors to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub app_type: AppType,
    pub entry_point: Option<String>,
    /// Repository-relative paths in diff-tool output order.
    pub changed_files: Vec<String>,
}

impl Observation {
    pub fn unknown(changed_files: Vec<String>) -> Self {
        Self {
            app_type: AppType::Unknown,
            entry_point: None,
            changed_files,
        }
    }

    /// Observation for a recognized entry point. `Unknown` is coerced to a
    /// no-entry observation so the invariant cannot be broken.
    pub fn with_entry_point(
        app_type: AppType,
        entry_point: impl Into<String>,
        changed_files: Vec<String>,
    ) -> Self {
        if app_type == AppType::Unknown {
            return Self::unknown(changed_files);
        }
        Self {
            app_type,
            entry_point: Some(entry_point.into()),
            changed_files,
        }
    }
}

/// Image, command line and port mapping for the target application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerPlan {
    pub base_image: String,
    /// Exec-form argv for the container's final command line.
    pub cmd: Vec<String>,
    /// Ports published host:container 1:1. Empty for CLI-style plans.
    pub ports: BTreeSet<u16>,
}

/// Verification strategy selected by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    Cli,
    WebPython,
    Unknown,
}

impl TestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Cli => "cli",
            TestKind::WebPython => "web-python",
            TestKind::Unknown => "unknown",
        }
    }

    pub fn is_web(self) -> bool {
        matches!(self, TestKind::WebPython)
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable statement of one verification intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFlow {
    pub description: String,
}

impl TestFlow {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Strategy kind plus ordered, non-empty flow descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPlan {
    pub kind: TestKind,
    pub flows: Vec<TestFlow>,
}

/// One subprocess invocation during the Act phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActStep {
    Build,
    CliScript,
    ForegroundRun,
    DetachedStart,
    WebScript,
    Teardown,
}

impl ActStep {
    pub fn as_str(self) -> &'static str {
        match self {
            ActStep::Build => "build",
            ActStep::CliScript => "cli_script",
            ActStep::ForegroundRun => "foreground_run",
            ActStep::DetachedStart => "detached_start",
            ActStep::WebScript => "web_script",
            ActStep::Teardown => "teardown",
        }
    }
}

impl fmt::Display for ActStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Captured outcome of a single subprocess, already decoded to text.
///
/// `exit_code` is `None` when the process could not be spawned or was killed
/// by a signal (including timeout kills).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl StepOutput {
    /// A step that never produced a process (spawn error, missing engine).
    pub fn not_started(message: impl Into<String>) -> Self {
        let mut stderr = message.into();
        if !stderr.ends_with('\n') {
            stderr.push('\n');
        }
        Self {
            exit_code: None,
            stdout: String::new(),
            stderr,
            timed_out: false,
        }
    }

    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Per-step entry kept alongside the accumulated streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: ActStep,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Accumulated result of the Act phase.
///
/// Streams are append-only in chronological order. `success` is decided once
/// by the lifecycle runner when the phase finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub steps: Vec<StepRecord>,
}

impl ExecutionResult {
    /// Append a step's streams and record it.
    pub fn record(&mut self, step: ActStep, output: &StepOutput) {
        self.stdout.push_str(&output.stdout);
        self.stderr.push_str(&output.stderr);
        self.note(step, output);
    }

    /// Record a step without adopting its streams.
    pub fn note(&mut self, step: ActStep, output: &StepOutput) {
        self.steps.push(StepRecord {
            step,
            exit_code: output.exit_code,
            timed_out: output.timed_out,
        });
    }

    pub fn push_stderr_line(&mut self, line: &str) {
        self.stderr.push_str(line);
        self.stderr.push('\n');
    }

    pub fn finish(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn ran(&self, step: ActStep) -> usize {
        self.steps.iter().filter(|record| record.step == step).count()
    }
}
