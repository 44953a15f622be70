//! Host-side entry point of the job execution pipeline.
//!
//! The binary reads one job submission, runs the standard pipeline against
//! it and prints the resulting launch report as JSON.

pub mod submission;

use serde::Serialize;

use genie_core::config::parse_bool;
use genie_core::error::CoreError;
use genie_core::execution::JobExecution;
use genie_pipeline::context::ContextError;
use genie_pipeline::launch::LaunchCommand;
use genie_pipeline::{keys, ExecutionContext};

/// Worker-only settings that are not part of the host configuration.
///
/// | Env Var               | Default |
/// |-----------------------|---------|
/// | `GENIE_WAIT_FOR_EXIT` | `false` |
/// | `LOG_FORMAT`          | text    |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Block until the job process exits and report its status.
    pub wait_for_exit: bool,
    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl WorkerOptions {
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let wait_for_exit = match lookup("GENIE_WAIT_FOR_EXIT") {
            Some(v) => parse_bool("GENIE_WAIT_FOR_EXIT", &v)?,
            None => false,
        };
        let json_logs = lookup("LOG_FORMAT")
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        Ok(Self {
            wait_for_exit,
            json_logs,
        })
    }
}

/// What the worker prints after a successful launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchReport {
    pub command: LaunchCommand,
    pub execution: JobExecution,
}

impl LaunchReport {
    /// Collect the report from a context the pipeline completed on.
    pub fn from_context(context: &ExecutionContext) -> Result<Self, ContextError> {
        Ok(Self {
            command: context.get(keys::LAUNCH_COMMAND)?.clone(),
            execution: context.get(keys::JOB_EXECUTION)?.clone(),
        })
    }
}

/// Kill and reap a job process left in the context by a failed run.
///
/// Kickoff keeps the child handle when the pid lookup fails. Without this
/// the process would keep running with nothing tracking it.
pub async fn stop_orphaned_process(
    context: &mut ExecutionContext,
) -> Option<std::process::ExitStatus> {
    let mut child = context.take(keys::JOB_PROCESS).ok()?;
    tracing::warn!(pid = ?child.id(), "Stopping job process left by failed run");
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "Failed to signal job process");
    }
    match child.wait().await {
        Ok(status) => Some(status),
        Err(e) => {
            tracing::error!(error = %e, "Failed to reap job process");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
