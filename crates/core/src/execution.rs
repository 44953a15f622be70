//! Execution record of a launched job.
//!
//! A [`JobExecution`] is produced exactly once per successful launch and is
//! never mutated afterwards. The health checker uses it to find the process
//! (host + pid), to pace its checks, and to kill the job once `timeout`
//! has passed.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{JobId, Timestamp};

/// Immutable record of a job process running on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobExecution {
    pub id: Option<JobId>,
    pub host_name: String,
    pub process_id: u32,
    /// Delay between health checks, in milliseconds.
    pub check_delay: u64,
    /// When the launcher process was started.
    pub started_at: Timestamp,
    /// Deadline after which the job is considered timed out.
    pub timeout: Timestamp,
}

/// Builder for [`JobExecution`].
///
/// The deadline is `launched_at + timeout_secs`. When no launch instant is
/// supplied, the current UTC time is read at [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct JobExecutionBuilder {
    host_name: String,
    process_id: u32,
    check_delay: u64,
    timeout_secs: u32,
    id: Option<JobId>,
    launched_at: Option<Timestamp>,
}

impl JobExecutionBuilder {
    pub fn new(
        host_name: impl Into<String>,
        process_id: u32,
        check_delay: u64,
        timeout_secs: u32,
    ) -> Self {
        Self {
            host_name: host_name.into(),
            process_id,
            check_delay,
            timeout_secs,
            id: None,
            launched_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn launched_at(mut self, instant: Timestamp) -> Self {
        self.launched_at = Some(instant);
        self
    }

    pub fn build(self) -> JobExecution {
        let started_at = self.launched_at.unwrap_or_else(Utc::now);
        let timeout = started_at + chrono::Duration::seconds(i64::from(self.timeout_secs));
        JobExecution {
            id: self.id,
            host_name: self.host_name,
            process_id: self.process_id,
            check_delay: self.check_delay,
            started_at,
            timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
