//! Stable exit codes for sdet CLI commands.

/// Command completed. A failing application under test still exits with this
/// code; the verdict lives in the report.
pub const OK: i32 = 0;
/// Unexpected error: invalid config, or an artifact could not be written.
pub const ERROR: i32 = 1;
