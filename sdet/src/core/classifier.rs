//! Best-effort classification of a repository into an application profile.
//!
//! Classification is a short-circuit OR over independent signals checked in a
//! fixed order. Every predicate is total: a missing or unreadable file is
//! treated as empty text and simply does not fire.

use std::sync::LazyLock;

use regex::{RegexSet, RegexSetBuilder};

use crate::core::types::{AppType, Observation};

/// Read-only view of repository files, relative to the repository root.
pub trait RepoFiles {
    fn exists(&self, rel_path: &str) -> bool;
    /// File contents, or `None` when missing or unreadable.
    fn read_text(&self, rel_path: &str) -> Option<String>;
}

pub const DEPENDENCY_MANIFEST: &str = "requirements.txt";
pub const PROJECT_METADATA: &str = "pyproject.toml";

/// Web frameworks and servers looked for in manifests.
const WEB_PACKAGES: &[&str] = &["fastapi", "flask", "uvicorn", "gunicorn"];

/// Import/invocation patterns looked for in the entry point's own source.
const WEB_SOURCE_PATTERNS: &[&str] = &[
    "fastapi import fastapi",
    "from fastapi",
    "from flask",
    "flask(",
    "uvicorn.run",
    "gunicorn",
];

static WEB_PACKAGE_SET: LazyLock<RegexSet> = LazyLock::new(|| literal_set(WEB_PACKAGES));
static WEB_SOURCE_SET: LazyLock<RegexSet> = LazyLock::new(|| literal_set(WEB_SOURCE_PATTERNS));

fn literal_set(patterns: &[&str]) -> RegexSet {
    RegexSetBuilder::new(patterns.iter().map(|p| regex::escape(p)))
        .case_insensitive(true)
        .build()
        .expect("escaped literals are valid patterns")
}

/// Where a web signal is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    DependencyManifest,
    ProjectMetadata,
    EntryPointSource,
}

struct Signal {
    source: SignalSource,
    patterns: &'static RegexSet,
}

impl Signal {
    fn fires<R: RepoFiles + ?Sized>(&self, repo: &R, entry_point: &str) -> bool {
        let path = match self.source {
            SignalSource::DependencyManifest => DEPENDENCY_MANIFEST,
            SignalSource::ProjectMetadata => PROJECT_METADATA,
            SignalSource::EntryPointSource => entry_point,
        };
        text_matches(repo.read_text(path).as_deref(), self.patterns)
    }
}

/// Signals in declared evaluation order.
fn web_signals() -> [Signal; 3] {
    [
        Signal {
            source: SignalSource::DependencyManifest,
            patterns: &WEB_PACKAGE_SET,
        },
        Signal {
            source: SignalSource::ProjectMetadata,
            patterns: &WEB_PACKAGE_SET,
        },
        Signal {
            source: SignalSource::EntryPointSource,
            patterns: &WEB_SOURCE_SET,
        },
    ]
}

fn text_matches(text: Option<&str>, patterns: &RegexSet) -> bool {
    text.is_some_and(|t| patterns.is_match(t))
}

/// First candidate that exists in the repository.
pub fn find_entry_point<'a, R: RepoFiles + ?Sized>(
    repo: &R,
    candidates: &'a [String],
) -> Option<&'a str> {
    candidates
        .iter()
        .map(String::as_str)
        .find(|candidate| repo.exists(candidate))
}

/// First web signal that fires for `entry_point`, if any.
pub fn web_signal<R: RepoFiles + ?Sized>(repo: &R, entry_point: &str) -> Option<SignalSource> {
    web_signals()
        .into_iter()
        .find(|signal| signal.fires(repo, entry_point))
        .map(|signal| signal.source)
}

/// Classify the repository and attach the already-collected changed files.
pub fn classify<R: RepoFiles + ?Sized>(
    repo: &R,
    entry_candidates: &[String],
    changed_files: Vec<String>,
) -> Observation {
    let Some(entry_point) = find_entry_point(repo, entry_candidates) else {
        return Observation::unknown(changed_files);
    };
    let app_type = match web_signal(repo, entry_point) {
        Some(_) => AppType::PythonWeb,
        None => AppType::PythonCli,
    };
    Observation::with_entry_point(app_type, entry_point, changed_files)
}
