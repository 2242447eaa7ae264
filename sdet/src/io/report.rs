//! Reflect stage: the Markdown report and its JSON metadata.
//!
//! Both documents live at fixed paths and are replaced on every run; no
//! history is kept.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::{info, instrument};

use crate::core::types::{
    AppType, ContainerPlan, ExecutionResult, Observation, StepRecord, TestPlan,
};
use crate::io::atomic::write_atomic;
use crate::io::paths::AgentPaths;

const REPORT_TEMPLATE: &str = include_str!("templates/report.md.j2");

/// Everything the reporter consumes from earlier stages.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub observation: &'a Observation,
    pub container: &'a ContainerPlan,
    pub tests: &'a TestPlan,
    pub result: &'a ExecutionResult,
    pub duration: Duration,
}

/// Machine-readable companion to the Markdown report.
#[derive(Debug, Serialize)]
pub struct RunMeta<'a> {
    pub app_type: AppType,
    pub entry_point: Option<&'a str>,
    pub changed_files: &'a [String],
    pub container: &'a ContainerPlan,
    pub tests: &'a TestPlan,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: &'a [StepRecord],
}

impl<'a> RunMeta<'a> {
    pub fn from_input(input: &ReportInput<'a>) -> Self {
        Self {
            app_type: input.observation.app_type,
            entry_point: input.observation.entry_point.as_deref(),
            changed_files: &input.observation.changed_files,
            container: input.container,
            tests: input.tests,
            success: input.result.success,
            duration_ms: u64::try_from(input.duration.as_millis()).unwrap_or(u64::MAX),
            steps: &input.result.steps,
        }
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn python_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Render the five-section Markdown report.
pub fn render_report(input: &ReportInput<'_>, log_chars: usize) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("report.md", REPORT_TEMPLATE)
        .context("load report template")?;
    let template = env.get_template("report.md")?;

    let obs = input.observation;
    let changed_files = if obs.changed_files.is_empty() {
        "None".to_string()
    } else {
        obs.changed_files.join(", ")
    };
    let flows: Vec<&str> = input
        .tests
        .flows
        .iter()
        .map(|flow| flow.description.as_str())
        .collect();
    let stdout = truncate_chars(&input.result.stdout, log_chars);
    let stderr = truncate_chars(&input.result.stderr, log_chars);

    let rendered = template
        .render(context! {
            app_type => obs.app_type.as_str(),
            entry_point => obs.entry_point.as_deref().unwrap_or("None"),
            changed_files => changed_files,
            kind => input.tests.kind.as_str(),
            flows => flows,
            success => python_bool(input.result.success),
            stdout => stdout.trim_end_matches('\n'),
            stderr => stderr.trim_end_matches('\n'),
            stdout_truncated => stdout.len() < input.result.stdout.len(),
            stderr_truncated => stderr.len() < input.result.stderr.len(),
            log_chars => log_chars,
        })
        .context("render report")?;
    Ok(rendered)
}

/// Persist the report and its metadata, replacing any previous run's.
///
/// Returns the Markdown report path.
#[instrument(skip_all, fields(success = input.result.success))]
pub fn write_report(
    paths: &AgentPaths,
    input: &ReportInput<'_>,
    log_chars: usize,
) -> Result<PathBuf> {
    let mut report = render_report(input, log_chars)?;
    if !report.ends_with('\n') {
        report.push('\n');
    }
    write_atomic(&paths.report_path, &report)?;

    let mut meta = serde_json::to_string_pretty(&RunMeta::from_input(input))
        .context("serialize run metadata")?;
    meta.push('\n');
    write_atomic(&paths.report_meta_path, &meta)?;

    info!(path = %paths.report_path.display(), "report written");
    Ok(paths.report_path.clone())
}
