//! Container engine abstraction.
//!
//! The [`ContainerEngine`] trait decouples the lifecycle runner from the actual
//! engine CLI. Every verb returns a [`StepOutput`]; engine failures are data,
//! not errors.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::{info, instrument};

use crate::core::types::StepOutput;
use crate::io::config::AgentConfig;
use crate::io::process::capture;

/// Parameters for the build verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub dockerfile: PathBuf,
    pub context_dir: PathBuf,
    pub tag: String,
}

/// Parameters for a foreground run. The container is named so a run that
/// outlives its timeout can still be stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundRun {
    pub image: String,
    pub name: String,
}

/// Parameters for a detached, named run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedRun {
    pub image: String,
    pub name: String,
    /// Each port is published host:container 1:1.
    pub ports: BTreeSet<u16>,
}

pub trait ContainerEngine {
    fn build(&self, request: &BuildRequest) -> StepOutput;
    /// Run the image in the foreground and remove it on exit.
    fn run_foreground(&self, request: &ForegroundRun) -> StepOutput;
    fn run_detached(&self, request: &DetachedRun) -> StepOutput;
    fn stop(&self, name: &str) -> StepOutput;
}

/// Engine that shells out to a docker-compatible CLI.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    program: String,
    workdir: PathBuf,
    build_timeout: Duration,
    run_timeout: Duration,
    stop_timeout: Duration,
    output_limit_bytes: usize,
}

impl DockerEngine {
    pub fn from_config(cfg: &AgentConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: cfg.engine.clone(),
            workdir: workdir.into(),
            build_timeout: cfg.build_timeout(),
            run_timeout: cfg.run_timeout(),
            stop_timeout: cfg.stop_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }

    fn invoke(&self, label: &str, args: Vec<String>, timeout: Duration) -> StepOutput {
        info!(program = %self.program, args = %args.join(" "), "invoking container engine");
        let mut cmd = Command::new(&self.program);
        cmd.args(&args).current_dir(&self.workdir);
        capture(label, cmd, timeout, self.output_limit_bytes)
    }
}

impl ContainerEngine for DockerEngine {
    #[instrument(skip_all, fields(tag = %request.tag))]
    fn build(&self, request: &BuildRequest) -> StepOutput {
        self.invoke("build", build_args(request), self.build_timeout)
    }

    #[instrument(skip_all, fields(image = %request.image, name = %request.name))]
    fn run_foreground(&self, request: &ForegroundRun) -> StepOutput {
        self.invoke("run", foreground_args(request), self.run_timeout)
    }

    #[instrument(skip_all, fields(name = %request.name))]
    fn run_detached(&self, request: &DetachedRun) -> StepOutput {
        self.invoke("start", detached_args(request), self.run_timeout)
    }

    #[instrument(skip_all, fields(name = %name))]
    fn stop(&self, name: &str) -> StepOutput {
        self.invoke("stop", stop_args(name), self.stop_timeout)
    }
}

pub fn build_args(request: &BuildRequest) -> Vec<String> {
    vec![
        "build".to_string(),
        "-t".to_string(),
        request.tag.clone(),
        "-f".to_string(),
        request.dockerfile.to_string_lossy().into_owned(),
        request.context_dir.to_string_lossy().into_owned(),
    ]
}

pub fn foreground_args(request: &ForegroundRun) -> Vec<String> {
    vec![
        "run".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        request.name.clone(),
        request.image.clone(),
    ]
}

pub fn detached_args(request: &DetachedRun) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        request.name.clone(),
    ];
    for port in &request.ports {
        args.push("-p".to_string());
        args.push(format!("{port}:{port}"));
    }
    args.push(request.image.clone());
    args
}

pub fn stop_args(name: &str) -> Vec<String> {
    vec!["stop".to_string(), name.to_string()]
}
