//! Orchestration for `sdet observe`, `sdet plan` and `sdet run`.
//!
//! Stages run strictly in sequence; each consumes the previous stage's
//! values and nothing else.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, instrument};

use crate::act::{ActContext, run_act};
use crate::core::classifier::classify;
use crate::core::planner::create_plans;
use crate::core::types::{ContainerPlan, ExecutionResult, Observation, TestPlan};
use crate::io::config::AgentConfig;
use crate::io::e2e::ScriptRunner;
use crate::io::engine::ContainerEngine;
use crate::io::git::Git;
use crate::io::paths::AgentPaths;
use crate::io::repo::FsRepo;
use crate::io::report::{ReportInput, write_report};

/// Observation plus the plans derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Planned {
    pub observation: Observation,
    pub container: ContainerPlan,
    pub tests: TestPlan,
}

/// Result of a completed `run`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report_path: PathBuf,
    pub result: ExecutionResult,
}

/// Observe: collect changed files and classify the repository.
#[instrument(skip_all, fields(root = %paths.root.display(), base_ref = %base_ref))]
pub fn observe(paths: &AgentPaths, cfg: &AgentConfig, base_ref: &str) -> Observation {
    let changed_files = Git::new(&paths.root).changed_files(base_ref);
    let repo = FsRepo::new(&paths.root);
    let observation = classify(&repo, &cfg.entry_points, changed_files);
    info!(
        app_type = %observation.app_type,
        entry_point = ?observation.entry_point,
        changed = observation.changed_files.len(),
        "observed repository"
    );
    observation
}

/// Observe then plan. No container activity.
pub fn plan(paths: &AgentPaths, cfg: &AgentConfig, base_ref: &str) -> Planned {
    let observation = observe(paths, cfg, base_ref);
    let (container, tests) = create_plans(&observation);
    Planned {
        observation,
        container,
        tests,
    }
}

/// Full Observe, Plan, Act, Reflect cycle.
///
/// A failing application is a normal outcome recorded in the report; only
/// persistence failures are returned as errors.
pub fn run_pipeline<E, S>(
    paths: &AgentPaths,
    cfg: &AgentConfig,
    base_ref: &str,
    engine: &E,
    scripts: &S,
) -> Result<RunOutcome>
where
    E: ContainerEngine + ?Sized,
    S: ScriptRunner + ?Sized,
{
    let start = Instant::now();
    let planned = plan(paths, cfg, base_ref);
    let ctx = ActContext {
        paths,
        config: cfg,
        container: &planned.container,
        tests: &planned.tests,
    };
    let result = run_act(&ctx, engine, scripts)?;

    let input = ReportInput {
        observation: &planned.observation,
        container: &planned.container,
        tests: &planned.tests,
        result: &result,
        duration: start.elapsed(),
    };
    let report_path = write_report(paths, &input, cfg.report_log_chars)?;
    info!(success = result.success, "run complete");
    Ok(RunOutcome {
        report_path,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AppType, TestKind};
    use crate::test_support::{ScriptedEngine, ScriptedScripts, TestRepo};

    #[test]
    fn plan_without_git_degrades_to_empty_changes() {
        let repo = TestRepo::new().expect("repo");
        repo.write("app.py", "print('hello')\n").expect("write");

        let planned = plan(repo.paths(), &AgentConfig::default(), "main");
        assert_eq!(planned.observation.app_type, AppType::PythonCli);
        assert_eq!(planned.observation.entry_point.as_deref(), Some("app.py"));
        assert!(planned.observation.changed_files.is_empty());
        assert_eq!(planned.tests.kind, TestKind::Cli);
        assert!(!repo.paths().agent_dir.exists());
    }

    #[test]
    fn default_config_plans_a_lone_entry_py_as_cli() {
        let repo = TestRepo::new().expect("repo");
        repo.write("entry.py", "print(\"hello\")\n").expect("write");

        let planned = plan(repo.paths(), &AgentConfig::default(), "main");
        assert_eq!(planned.observation.app_type, AppType::PythonCli);
        assert_eq!(planned.observation.entry_point.as_deref(), Some("entry.py"));
        assert!(planned.observation.changed_files.is_empty());
        assert_eq!(planned.container.cmd, vec!["python", "entry.py"]);
        assert!(planned.container.ports.is_empty());
        assert_eq!(planned.tests.kind, TestKind::Cli);
    }

    #[test]
    fn app_py_wins_over_entry_py_by_default() {
        let repo = TestRepo::new().expect("repo");
        repo.write("entry.py", "print(\"a\")\n").expect("write");
        repo.write("app.py", "print(\"b\")\n").expect("write");

        let planned = plan(repo.paths(), &AgentConfig::default(), "main");
        assert_eq!(planned.observation.entry_point.as_deref(), Some("app.py"));
    }

    #[test]
    fn configured_entry_points_are_honoured() {
        let repo = TestRepo::new().expect("repo");
        repo.write("main.py", "print(\"hello\")\n").expect("write");
        let cfg = AgentConfig {
            entry_points: vec!["main.py".to_string()],
            ..AgentConfig::default()
        };

        let planned = plan(repo.paths(), &cfg, "main");
        assert_eq!(planned.observation.entry_point.as_deref(), Some("main.py"));
        assert_eq!(planned.container.cmd, vec!["python", "main.py"]);
    }

    #[test]
    fn run_writes_report_and_definition() {
        let repo = TestRepo::new().expect("repo");
        let engine = ScriptedEngine::new();
        let scripts = ScriptedScripts::new(Vec::new());

        let outcome = run_pipeline(
            repo.paths(),
            &AgentConfig::default(),
            "main",
            &engine,
            &scripts,
        )
        .expect("run");
        assert!(outcome.result.success);
        assert_eq!(outcome.report_path, repo.paths().report_path);
        assert!(repo.paths().dockerfile_path.is_file());
        assert!(repo.paths().report_meta_path.is_file());
        assert!(repo.paths().build_log_path.is_file());
    }
}
