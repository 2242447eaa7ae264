//! Autonomous SDET: observe, plan, act and reflect on a repository.
//!
//! The pipeline classifies the repository, derives a container plan and a
//! verification strategy, builds and exercises the container, and writes a
//! Markdown report. The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (classification, planning, data
//!   model). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (filesystem, git, container engine,
//!   end-to-end scripts, report persistence). Traits at the engine and script
//!   seams enable fakes in tests.
//!
//! Orchestration modules ([`act`], [`pipeline`]) coordinate core logic with
//! I/O to implement CLI commands.

pub mod act;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
