//! Autonomous SDET command line.
//!
//! Observes the repository in the current directory, plans a container and a
//! verification strategy, runs it, and writes `.agent/reports/latest.md`.

use std::ffi::OsString;
use std::io::Write;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;

use sdet::core::types::{ContainerPlan, Observation, TestPlan};
use sdet::exit_codes;
use sdet::io::config::{AgentConfig, load_config};
use sdet::io::e2e::PythonScriptRunner;
use sdet::io::engine::DockerEngine;
use sdet::io::paths::AgentPaths;
use sdet::logging;
use sdet::pipeline::{Planned, observe, plan, run_pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "sdet",
    version,
    about = "Observe, plan, containerize and end-to-end test the current repository"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Base reference for the changed-file diff (defaults to `base_ref` in
    /// `.agent/config.toml`, then `main`).
    #[arg(long, global = true, value_name = "REF")]
    base: Option<String>,

    /// Make `run` stop after planning.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print `observe`/`plan` results as JSON.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Observe, plan, build, test and write the report (default).
    Run,
    /// Observe and plan only; no container activity.
    Plan,
    /// Classify the repository and print the result.
    Observe,
    #[command(external_subcommand)]
    Other(Vec<OsString>),
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::ERROR);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run);
    if matches!(command, Command::Other(_)) {
        return print_usage();
    }

    let root = std::env::current_dir().context("resolve current directory")?;
    let paths = AgentPaths::new(root);
    let cfg = load_config(&paths.config_path)?;
    let base_ref = cli.base.as_deref().unwrap_or(&cfg.base_ref);

    match command {
        Command::Observe => cmd_observe(&paths, &cfg, base_ref, cli.json),
        Command::Plan => cmd_plan(&paths, &cfg, base_ref, cli.json),
        Command::Run if cli.dry_run => cmd_plan(&paths, &cfg, base_ref, cli.json),
        Command::Run => cmd_run(&paths, &cfg, base_ref),
        Command::Other(_) => print_usage(),
    }
}

/// Unknown verbs are not an error: print usage and exit 0.
fn print_usage() -> Result<()> {
    Cli::command().print_help().context("print usage")?;
    println!();
    Ok(())
}

fn cmd_observe(paths: &AgentPaths, cfg: &AgentConfig, base_ref: &str, json: bool) -> Result<()> {
    let observation = observe(paths, cfg, base_ref);
    if json {
        return print_json(&observation);
    }
    println!("{}", observation_line(&observation));
    Ok(())
}

fn cmd_plan(paths: &AgentPaths, cfg: &AgentConfig, base_ref: &str, json: bool) -> Result<()> {
    let planned = plan(paths, cfg, base_ref);
    if json {
        return print_json(&planned);
    }
    print!("{}", plan_summary(&planned));
    Ok(())
}

fn cmd_run(paths: &AgentPaths, cfg: &AgentConfig, base_ref: &str) -> Result<()> {
    let engine = DockerEngine::from_config(cfg, &paths.root);
    let scripts = PythonScriptRunner::from_config(cfg, &paths.root);
    let outcome = run_pipeline(paths, cfg, base_ref, &engine, &scripts)?;
    println!(
        "Autonomous SDET run complete. Report written to {}",
        paths.display_relative(&outcome.report_path).display()
    );
    Ok(())
}

/// Serialize `value` to pretty-printed JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{payload}").context("write stdout")?;
    Ok(())
}

fn observation_line(observation: &Observation) -> String {
    format!(
        "Observed app_type={}, entry_point={}",
        observation.app_type,
        observation.entry_point.as_deref().unwrap_or("None")
    )
}

fn plan_summary(planned: &Planned) -> String {
    let Planned {
        container, tests, ..
    } = planned;
    let mut out = String::from("Autonomous SDET planning complete.\n");
    out.push_str(&format!("  Base image: {}\n", container.base_image));
    out.push_str(&format!("  CMD: {}\n", cmd_display(container)));
    out.push_str(&format!("  Ports: {}\n", ports_display(container)));
    out.push_str(&format!("  Test kind: {}\n", tests.kind));
    out.push_str(&format!("  Flows: {}\n", flows_display(tests)));
    out
}

fn cmd_display(container: &ContainerPlan) -> String {
    let args: Vec<String> = container.cmd.iter().map(|arg| format!("{arg:?}")).collect();
    format!("[{}]", args.join(", "))
}

fn ports_display(container: &ContainerPlan) -> String {
    if container.ports.is_empty() {
        return "none".to_string();
    }
    let ports: Vec<String> = container.ports.iter().map(u16::to_string).collect();
    ports.join(", ")
}

fn flows_display(tests: &TestPlan) -> String {
    let flows: Vec<&str> = tests
        .flows
        .iter()
        .map(|flow| flow.description.as_str())
        .collect();
    flows.join("; ")
}
