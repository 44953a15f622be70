//! Job working directory layout.
//!
//! Every job gets its own working directory under the configured jobs root.
//! The paths below are relative to that directory and are shared with the
//! health-checking and log-serving components, so they must not change
//! without coordinating with them.

/// Log directory, relative to the job working directory.
pub const LOGS_DIR: &str = "genie/logs";

/// Default name of the launcher script written into the job directory.
pub const DEFAULT_LAUNCHER_SCRIPT: &str = "run";

/// Default name of the combined stdout/stderr log of the launcher process.
pub const DEFAULT_LOG_FILE: &str = "genie.log";
