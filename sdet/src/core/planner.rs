//! Maps an [`Observation`] to a container plan and a test plan.
//!
//! Pure and deterministic: the same observation always yields the same pair.
//! Unknown repositories get a plan that is safe to attempt but not expected
//! to demonstrate real behavior.

use std::collections::BTreeSet;

use crate::core::types::{AppType, ContainerPlan, Observation, TestFlow, TestKind, TestPlan};

/// Pinned interpreter base shared by every plan.
pub const BASE_IMAGE: &str = "python:3.11-slim-bookworm";

/// Port published for web-style applications.
pub const WEB_PORT: u16 = 8000;

/// Command used when no entry point was inferred.
pub const FALLBACK_CMD: &[&str] = &["python", "-m", "sdet_agent"];

pub const NO_FLOWS_INFERRED: &str = "No concrete flows inferred";

pub fn create_plans(observation: &Observation) -> (ContainerPlan, TestPlan) {
    match (observation.app_type, observation.entry_point.as_deref()) {
        (AppType::PythonCli, Some(entry)) => cli_plans(entry),
        (AppType::PythonWeb, Some(entry)) => web_plans(entry),
        _ => fallback_plans(),
    }
}

fn cli_plans(entry: &str) -> (ContainerPlan, TestPlan) {
    let container = ContainerPlan {
        base_image: BASE_IMAGE.to_string(),
        cmd: python_cmd(entry),
        ports: BTreeSet::new(),
    };
    let tests = TestPlan {
        kind: TestKind::Cli,
        flows: vec![TestFlow::new(format!("Run {entry} and assert success"))],
    };
    (container, tests)
}

fn web_plans(entry: &str) -> (ContainerPlan, TestPlan) {
    let container = ContainerPlan {
        base_image: BASE_IMAGE.to_string(),
        cmd: python_cmd(entry),
        ports: BTreeSet::from([WEB_PORT]),
    };
    let tests = TestPlan {
        kind: TestKind::WebPython,
        flows: vec![TestFlow::new(format!(
            "Start container on port {WEB_PORT} and exercise key HTTP flows via http://localhost:{WEB_PORT}/"
        ))],
    };
    (container, tests)
}

fn fallback_plans() -> (ContainerPlan, TestPlan) {
    let container = ContainerPlan {
        base_image: BASE_IMAGE.to_string(),
        cmd: FALLBACK_CMD.iter().map(|s| s.to_string()).collect(),
        ports: BTreeSet::new(),
    };
    let tests = TestPlan {
        kind: TestKind::Unknown,
        flows: vec![TestFlow::new(NO_FLOWS_INFERRED)],
    };
    (container, tests)
}

fn python_cmd(entry: &str) -> Vec<String> {
    vec!["python".to_string(), entry.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_observation_runs_entry_point_without_ports() {
        let obs = Observation::with_entry_point(
            AppType::PythonCli,
            "app.py",
            vec!["app.py".to_string()],
        );
        let (container, tests) = create_plans(&obs);
        assert!(container.base_image.starts_with("python:3.11"));
        assert_eq!(container.cmd, vec!["python", "app.py"]);
        assert!(container.ports.is_empty());
        assert_eq!(tests.kind, TestKind::Cli);
        assert_eq!(tests.flows.len(), 1);
        assert!(tests.flows[0].description.contains("app.py"));
    }

    #[test]
    fn web_observation_maps_port_8000() {
        let obs = Observation::with_entry_point(AppType::PythonWeb, "app.py", Vec::new());
        let (container, tests) = create_plans(&obs);
        assert_eq!(container.cmd[0], "python");
        assert!(container.ports.contains(&8000));
        assert_eq!(container.ports.len(), 1);
        assert!(tests.kind.as_str().contains("web"));
        assert!(
            tests
                .flows
                .iter()
                .any(|flow| flow.description.contains("http://localhost"))
        );
    }

    #[test]
    fn unknown_observation_gets_conservative_plan() {
        let obs = Observation::unknown(vec!["README.md".to_string()]);
        let (container, tests) = create_plans(&obs);
        assert_eq!(container.cmd, vec!["python", "-m", "sdet_agent"]);
        assert!(container.ports.is_empty());
        assert_eq!(tests.kind, TestKind::Unknown);
        assert_eq!(tests.flows, vec![TestFlow::new(NO_FLOWS_INFERRED)]);
    }

    #[test]
    fn base_image_is_fixed_across_branches() {
        let observations = [
            Observation::with_entry_point(AppType::PythonCli, "app.py", Vec::new()),
            Observation::with_entry_point(AppType::PythonWeb, "app.py", Vec::new()),
            Observation::unknown(Vec::new()),
        ];
        for obs in &observations {
            assert_eq!(create_plans(obs).0.base_image, BASE_IMAGE);
        }
    }

    #[test]
    fn planning_is_deterministic() {
        let obs = Observation::with_entry_point(
            AppType::PythonWeb,
            "app.py",
            vec!["app.py".to_string(), "requirements.txt".to_string()],
        );
        assert_eq!(create_plans(&obs), create_plans(&obs));
    }
}
