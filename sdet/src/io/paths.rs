//! Well-known locations for generated artifacts under `<repo>/.agent/`.

use std::path::{Path, PathBuf};

pub const AGENT_DIR: &str = ".agent";

/// All canonical paths for a repository root.
///
/// Passed explicitly through every stage; nothing reads these from globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPaths {
    pub root: PathBuf,
    pub agent_dir: PathBuf,
    pub config_path: PathBuf,
    pub dockerfile_path: PathBuf,
    pub tests_dir: PathBuf,
    pub e2e_cli_script: PathBuf,
    pub e2e_web_script: PathBuf,
    pub reports_dir: PathBuf,
    pub report_path: PathBuf,
    pub report_meta_path: PathBuf,
    pub build_log_path: PathBuf,
}

impl AgentPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let agent_dir = root.join(AGENT_DIR);
        let tests_dir = agent_dir.join("tests");
        let reports_dir = agent_dir.join("reports");
        Self {
            root: root.clone(),
            agent_dir: agent_dir.clone(),
            config_path: agent_dir.join("config.toml"),
            dockerfile_path: agent_dir.join("Dockerfile"),
            tests_dir: tests_dir.clone(),
            e2e_cli_script: tests_dir.join("e2e_cli.py"),
            e2e_web_script: tests_dir.join("e2e_web.py"),
            reports_dir: reports_dir.clone(),
            report_path: reports_dir.join("latest.md"),
            report_meta_path: reports_dir.join("latest.json"),
            build_log_path: reports_dir.join("build.log"),
        }
    }

    /// Build context handed to the engine: the repository's parent directory.
    pub fn build_context(&self) -> PathBuf {
        self.root
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone())
    }

    /// `path` relative to the repository root when possible.
    pub fn display_relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_stable() {
        let paths = AgentPaths::new("/work/repo");
        assert_eq!(paths.dockerfile_path, Path::new("/work/repo/.agent/Dockerfile"));
        assert_eq!(
            paths.e2e_cli_script,
            Path::new("/work/repo/.agent/tests/e2e_cli.py")
        );
        assert_eq!(
            paths.e2e_web_script,
            Path::new("/work/repo/.agent/tests/e2e_web.py")
        );
        assert_eq!(
            paths.report_path,
            Path::new("/work/repo/.agent/reports/latest.md")
        );
        assert_eq!(paths.build_context(), Path::new("/work"));
    }

    #[test]
    fn report_path_displays_relative_to_root() {
        let paths = AgentPaths::new("/work/repo");
        assert_eq!(
            paths.display_relative(&paths.report_path),
            Path::new(".agent/reports/latest.md")
        );
    }
}
