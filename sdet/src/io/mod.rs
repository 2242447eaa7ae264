//! I/O adapters for the pipeline stages.

pub mod atomic;
pub mod config;
pub mod e2e;
pub mod engine;
pub mod git;
pub mod image;
pub mod paths;
pub mod process;
pub mod report;
pub mod repo;
