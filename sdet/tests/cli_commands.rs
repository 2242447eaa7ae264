//! CLI tests for the `sdet` binary.
//!
//! Spawns the binary inside throwaway repositories and checks exit codes,
//! stdout and the artifacts left behind.

use std::fs;
use std::process::{Command, Output};

use sdet::exit_codes;
use sdet::test_support::TestRepo;

fn sdet(repo: &TestRepo, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sdet"))
        .current_dir(repo.path())
        .args(args)
        .output()
        .expect("spawn sdet")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn observe_prints_classification() {
    let repo = TestRepo::new().expect("repo");
    repo.write("app.py", "from fastapi import FastAPI\napp = FastAPI()\n")
        .expect("write app");

    let output = sdet(&repo, &["observe"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        stdout(&output),
        "Observed app_type=python-web, entry_point=app.py\n"
    );
}

#[test]
fn observe_finds_entry_py_without_config() {
    let repo = TestRepo::new().expect("repo");
    repo.write("entry.py", "print(\"hello\")\n")
        .expect("write entry");

    let output = sdet(&repo, &["observe"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        stdout(&output),
        "Observed app_type=python-cli, entry_point=entry.py\n"
    );
}

#[test]
fn plan_json_is_machine_readable() {
    let repo = TestRepo::new().expect("repo");
    repo.write("app.py", "print('hello')\n").expect("write app");

    let output = sdet(&repo, &["plan", "--json"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let planned: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(planned["observation"]["app_type"], "python-cli");
    assert_eq!(
        planned["container"]["cmd"],
        serde_json::json!(["python", "app.py"])
    );
    assert_eq!(planned["tests"]["kind"], "cli");
}

#[test]
fn dry_run_plans_without_touching_agent_dir() {
    let repo = TestRepo::new().expect("repo");

    let output = sdet(&repo, &["run", "--dry-run"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let text = stdout(&output);
    assert!(text.starts_with("Autonomous SDET planning complete.\n"));
    assert!(text.contains("  CMD: [\"python\", \"-m\", \"sdet_agent\"]\n"));
    assert!(text.contains("  Flows: No concrete flows inferred\n"));
    assert!(!repo.paths().agent_dir.exists());
}

#[test]
fn unknown_verb_prints_usage_and_succeeds() {
    let repo = TestRepo::new().expect("repo");

    let output = sdet(&repo, &["frobnicate"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn version_flag_prints_crate_version() {
    let repo = TestRepo::new().expect("repo");

    let output = sdet(&repo, &["--version"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

/// Missing engine: the run still exits 0 and the report records the failure.
#[test]
fn run_with_unavailable_engine_reports_failure() {
    let repo = TestRepo::new().expect("repo");
    repo.write("app.py", "print('hello')\n").expect("write app");
    repo.write(
        ".agent/config.toml",
        "engine = \"sdet-missing-engine-4d1e\"\n",
    )
    .expect("write config");

    let output = sdet(&repo, &["run"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        stdout(&output),
        "Autonomous SDET run complete. Report written to .agent/reports/latest.md\n"
    );

    let report = fs::read_to_string(&repo.paths().report_path).expect("read report");
    assert!(report.contains("- App type: python-cli"));
    assert!(report.contains("- Success: False"));
    assert!(report.contains("docker build failed or docker daemon unavailable"));
    assert!(repo.paths().dockerfile_path.is_file());
}

#[test]
fn invalid_config_exits_with_error() {
    let repo = TestRepo::new().expect("repo");
    repo.write(".agent/config.toml", "run_timeout_secs = 0\n")
        .expect("write config");

    let output = sdet(&repo, &["observe"]);
    assert_eq!(output.status.code(), Some(exit_codes::ERROR));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"));
}
