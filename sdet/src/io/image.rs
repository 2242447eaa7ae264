//! Renders the container definition and drives the build verb.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::{debug, info, instrument, warn};

use crate::core::types::{ContainerPlan, StepOutput};
use crate::io::atomic::write_atomic;
use crate::io::config::AgentConfig;
use crate::io::engine::{BuildRequest, ContainerEngine};
use crate::io::paths::AgentPaths;

const DOCKERFILE_TEMPLATE: &str = include_str!("templates/Dockerfile.j2");

fn environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.add_template("Dockerfile", DOCKERFILE_TEMPLATE)
        .context("load Dockerfile template")?;
    Ok(env)
}

/// Serialize argv as a Dockerfile exec-form array, e.g. `["python", "app.py"]`.
pub fn exec_form(cmd: &[String]) -> Result<String> {
    let args = cmd
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()
        .context("encode command argument")?;
    Ok(format!("[{}]", args.join(", ")))
}

/// Render the fixed template with the plan's command line as the only variable.
pub fn render_dockerfile(plan: &ContainerPlan) -> Result<String> {
    let env = environment()?;
    let template = env.get_template("Dockerfile")?;
    let rendered = template
        .render(context! { cmd => exec_form(&plan.cmd)? })
        .context("render Dockerfile")?;
    Ok(rendered)
}

/// Write the rendered definition to its fixed path and return that path.
#[instrument(skip_all, fields(path = %paths.dockerfile_path.display()))]
pub fn ensure_dockerfile(paths: &AgentPaths, plan: &ContainerPlan) -> Result<PathBuf> {
    let contents = render_dockerfile(plan)?;
    write_atomic(&paths.dockerfile_path, &contents)?;
    debug!("container definition written");
    Ok(paths.dockerfile_path.clone())
}

/// Build the image from the rendered definition.
///
/// The engine's output is kept in the returned step and mirrored to the build
/// log. Only a failure to write the log is an error.
#[instrument(skip_all, fields(tag = %cfg.image_tag))]
pub fn build_image<E: ContainerEngine + ?Sized>(
    engine: &E,
    paths: &AgentPaths,
    cfg: &AgentConfig,
) -> Result<StepOutput> {
    let request = BuildRequest {
        dockerfile: paths.dockerfile_path.clone(),
        context_dir: paths.build_context(),
        tag: cfg.image_tag.clone(),
    };
    let output = engine.build(&request);
    write_build_log(&paths.build_log_path, &output)?;
    if output.success() {
        info!("image built");
    } else {
        warn!(exit_code = ?output.exit_code, timed_out = output.timed_out, "image build failed");
    }
    Ok(output)
}

fn write_build_log(path: &Path, output: &StepOutput) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create build log dir {}", parent.display()))?;
    }
    let mut buf = String::new();
    buf.push_str(&format!("exit code: {:?}\n", output.exit_code));
    buf.push_str("=== stdout ===\n");
    buf.push_str(&output.stdout);
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(&output.stderr);
    fs::write(path, buf).with_context(|| format!("write build log {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::planner::BASE_IMAGE;
    use std::collections::BTreeSet;

    fn plan(cmd: &[&str]) -> ContainerPlan {
        ContainerPlan {
            base_image: BASE_IMAGE.to_string(),
            cmd: cmd.iter().map(|s| s.to_string()).collect(),
            ports: BTreeSet::new(),
        }
    }

    #[test]
    fn exec_form_quotes_each_argument() {
        let cmd = vec!["python".to_string(), "say \"hi\".py".to_string()];
        assert_eq!(
            exec_form(&cmd).expect("encode"),
            r#"["python", "say \"hi\".py"]"#
        );
    }

    #[test]
    fn rendered_definition_pins_base_and_installs_uv() {
        let rendered = render_dockerfile(&plan(&["python", "app.py"])).expect("render");
        assert!(rendered.contains(&format!("FROM {BASE_IMAGE}\n")));
        assert!(rendered.contains("/bin/uv"));
        assert!(rendered.contains("uv sync --frozen --system"));
        assert!(rendered.contains("uv pip install --system -r requirements.txt"));
        assert!(rendered.ends_with("CMD [\"python\", \"app.py\"]\n"));
    }

    #[test]
    fn command_line_is_the_only_difference_between_plans() {
        let a = render_dockerfile(&plan(&["python", "app.py"])).expect("render");
        let b = render_dockerfile(&plan(&["python", "-m", "sdet_agent"])).expect("render");
        let differing: Vec<_> = a
            .lines()
            .zip(b.lines())
            .filter(|(left, right)| left != right)
            .collect();
        assert_eq!(
            differing,
            vec![(
                "CMD [\"python\", \"app.py\"]",
                "CMD [\"python\", \"-m\", \"sdet_agent\"]"
            )]
        );
    }

    #[test]
    fn ensure_dockerfile_overwrites_previous_definition() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = AgentPaths::new(temp.path());
        fs::create_dir_all(&paths.agent_dir).expect("mkdir");
        fs::write(&paths.dockerfile_path, "stale").expect("write stale");

        let written = ensure_dockerfile(&paths, &plan(&["python", "app.py"])).expect("ensure");
        let contents = fs::read_to_string(written).expect("read");
        assert!(contents.starts_with("FROM "));
        assert!(contents.contains("CMD [\"python\", \"app.py\"]"));
    }
}
