use genie_core::execution::{JobExecution, JobExecutionBuilder};
use genie_core::job::ExecutionEnvironment;
use genie_core::types::Timestamp;

/// Package a launched job into its execution record.
///
/// The check delay comes from the resolved command and the deadline is
/// `launched_at` plus the request's timeout.
pub fn build_job_execution(
    hostname: &str,
    env: &ExecutionEnvironment,
    process_id: u32,
    launched_at: Timestamp,
) -> JobExecution {
    JobExecutionBuilder::new(
        hostname,
        process_id,
        env.command.check_delay,
        env.job_request.timeout,
    )
    .with_id(env.job_id())
    .launched_at(launched_at)
    .build()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
