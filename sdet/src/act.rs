//! Lifecycle runner for the Act phase: build, dispatch, teardown.
//!
//! Every subprocess outcome is folded into the [`ExecutionResult`]; only
//! failures to persist the container definition or build log are errors.

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{ActStep, ContainerPlan, ExecutionResult, TestKind, TestPlan};
use crate::io::config::AgentConfig;
use crate::io::e2e::{ScriptRunner, find_script};
use crate::io::engine::{ContainerEngine, DetachedRun, ForegroundRun};
use crate::io::image::{build_image, ensure_dockerfile};
use crate::io::paths::AgentPaths;

/// Fixed diagnostic recorded ahead of the engine's output when the build fails.
pub const BUILD_FAILED: &str = "docker build failed or docker daemon unavailable";

/// Inputs for one Act phase.
#[derive(Debug, Clone, Copy)]
pub struct ActContext<'a> {
    pub paths: &'a AgentPaths,
    pub config: &'a AgentConfig,
    pub container: &'a ContainerPlan,
    pub tests: &'a TestPlan,
}

/// Branch taken after a successful build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Cli,
    Web,
    Fallback,
}

impl Dispatch {
    pub fn select(container: &ContainerPlan, tests: &TestPlan) -> Self {
        if tests.kind == TestKind::Cli && container.ports.is_empty() {
            Dispatch::Cli
        } else if tests.kind.is_web() || !container.ports.is_empty() {
            Dispatch::Web
        } else {
            Dispatch::Fallback
        }
    }
}

/// Run the Act phase against `engine`, delegating opaque tests to `scripts`.
#[instrument(skip_all, fields(kind = %ctx.tests.kind))]
pub fn run_act<E, S>(ctx: &ActContext<'_>, engine: &E, scripts: &S) -> Result<ExecutionResult>
where
    E: ContainerEngine + ?Sized,
    S: ScriptRunner + ?Sized,
{
    let mut result = ExecutionResult::default();

    ensure_dockerfile(ctx.paths, ctx.container)?;
    let build = build_image(engine, ctx.paths, ctx.config)?;
    if !build.success() {
        result.push_stderr_line(BUILD_FAILED);
        result.record(ActStep::Build, &build);
        return Ok(result.finish(false));
    }
    result.note(ActStep::Build, &build);

    let dispatch = Dispatch::select(ctx.container, ctx.tests);
    info!(dispatch = ?dispatch, "image ready");
    let success = match dispatch {
        Dispatch::Cli => run_cli(ctx, engine, scripts, &mut result),
        Dispatch::Web => run_web(ctx, engine, scripts, &mut result),
        Dispatch::Fallback => run_foreground(ctx, engine, &mut result),
    };
    Ok(result.finish(success))
}

fn run_cli<E, S>(
    ctx: &ActContext<'_>,
    engine: &E,
    scripts: &S,
    result: &mut ExecutionResult,
) -> bool
where
    E: ContainerEngine + ?Sized,
    S: ScriptRunner + ?Sized,
{
    match find_script(&ctx.paths.e2e_cli_script) {
        Some(script) => {
            let out = scripts.run_script(script);
            result.record(ActStep::CliScript, &out);
            out.success()
        }
        None => {
            debug!("no CLI script, running container in the foreground");
            run_foreground(ctx, engine, result)
        }
    }
}

fn run_foreground<E>(ctx: &ActContext<'_>, engine: &E, result: &mut ExecutionResult) -> bool
where
    E: ContainerEngine + ?Sized,
{
    let request = ForegroundRun {
        image: ctx.config.image_tag.clone(),
        name: ctx.config.container_name.clone(),
    };
    let out = engine.run_foreground(&request);
    result.record(ActStep::ForegroundRun, &out);
    // Killing the engine client does not stop the container it started.
    if out.timed_out {
        warn!("foreground run timed out");
        teardown(ctx, engine, result);
    }
    out.success()
}

fn run_web<E, S>(
    ctx: &ActContext<'_>,
    engine: &E,
    scripts: &S,
    result: &mut ExecutionResult,
) -> bool
where
    E: ContainerEngine + ?Sized,
    S: ScriptRunner + ?Sized,
{
    let request = DetachedRun {
        image: ctx.config.image_tag.clone(),
        name: ctx.config.container_name.clone(),
        ports: ctx.container.ports.clone(),
    };
    let start = engine.run_detached(&request);
    result.record(ActStep::DetachedStart, &start);
    if !start.success() {
        warn!(exit_code = ?start.exit_code, timed_out = start.timed_out, "container start failed");
        // A start that timed out may still have left a container behind.
        if start.timed_out {
            teardown(ctx, engine, result);
        }
        return false;
    }

    let success = match find_script(&ctx.paths.e2e_web_script) {
        Some(script) => {
            let out = scripts.run_script(script);
            result.record(ActStep::WebScript, &out);
            out.success()
        }
        None => {
            debug!("no web script, treating successful start as success");
            true
        }
    };
    teardown(ctx, engine, result);
    success
}

fn teardown<E>(ctx: &ActContext<'_>, engine: &E, result: &mut ExecutionResult)
where
    E: ContainerEngine + ?Sized,
{
    let out = engine.stop(&ctx.config.container_name);
    debug!(
        exit_code = ?out.exit_code,
        stdout = %out.stdout,
        stderr = %out.stderr,
        "container stopped"
    );
    result.note(ActStep::Teardown, &out);
}
