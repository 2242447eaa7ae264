//! Git adapter used to collect changed files.
//!
//! Diff collection is a weak signal: every failure degrades to an empty list
//! instead of an error.

use std::path::PathBuf;
use std::process::{Command, Output};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Files changed on this branch relative to `base_ref`, in git output order.
    ///
    /// Tries `git diff --name-only <base>...HEAD`, then the unscoped working-tree
    /// diff, then gives up with an empty list.
    #[instrument(skip_all, fields(base_ref = %base_ref))]
    pub fn changed_files(&self, base_ref: &str) -> Vec<String> {
        let range = format!("{base_ref}...HEAD");
        match self.diff_name_only(&[&range]) {
            Ok(files) => {
                debug!(count = files.len(), "collected range diff");
                return files;
            }
            Err(err) => debug!(err = %format!("{err:#}"), "range diff failed, trying working tree"),
        }
        match self.diff_name_only(&[]) {
            Ok(files) => {
                debug!(count = files.len(), "collected working tree diff");
                files
            }
            Err(err) => {
                warn!(err = %format!("{err:#}"), "git diff unavailable, no changed files");
                Vec::new()
            }
        }
    }

    fn diff_name_only(&self, extra: &[&str]) -> Result<Vec<String>> {
        let mut args = vec!["diff", "--name-only"];
        args.extend_from_slice(extra);
        let out = self.run_capture(&args)?;
        Ok(parse_name_only(&out))
    }

    fn run_capture(&self, args: &[&str]) -> Result<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .with_context(|| format!("spawn git {}", args.join(" ")))
    }
}

fn parse_name_only(out: &str) -> Vec<String> {
    out.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn git(root: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .expect("spawn git")
            .status;
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_repo(root: &Path) {
        git(root, &["init", "-q"]);
        git(root, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(root, &["config", "user.name", "Sdet Test"]);
        git(root, &["config", "user.email", "sdet-test@local.invalid"]);
        git(root, &["config", "commit.gpgsign", "false"]);
    }

    fn commit_all(root: &Path, message: &str) {
        git(root, &["add", "-A"]);
        git(root, &["commit", "-q", "-m", message]);
    }

    #[test]
    fn parse_skips_blank_lines_and_keeps_order() {
        let files = parse_name_only("b.py\n\n  \na/c.py\n");
        assert_eq!(files, vec!["b.py", "a/c.py"]);
    }

    #[test]
    fn parse_keeps_spaces_that_belong_to_the_path() {
        let files = parse_name_only(" lead.py\ntrail.py \nmy app/main.py\n");
        assert_eq!(files, vec![" lead.py", "trail.py ", "my app/main.py"]);
    }

    #[test]
    fn not_a_repository_yields_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let files = Git::new(temp.path()).changed_files("main");
        assert!(files.is_empty());
    }

    #[test]
    fn range_diff_lists_branch_changes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        init_repo(root);
        fs::write(root.join("app.py"), "print('hello')\n").expect("write");
        commit_all(root, "base");

        git(root, &["checkout", "-q", "-b", "feature"]);
        fs::write(root.join("app.py"), "print('hello, world')\n").expect("write");
        fs::write(root.join("util.py"), "X = 1\n").expect("write");
        commit_all(root, "change");

        let files = Git::new(root).changed_files("main");
        assert_eq!(files, vec!["app.py", "util.py"]);
    }

    #[test]
    fn unknown_base_falls_back_to_working_tree() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        init_repo(root);
        fs::write(root.join("app.py"), "print('hello')\n").expect("write");
        commit_all(root, "base");
        fs::write(root.join("app.py"), "print('edited')\n").expect("write");

        let files = Git::new(root).changed_files("no-such-branch");
        assert_eq!(files, vec!["app.py"]);
    }
}
