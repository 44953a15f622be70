//! Job submission files accepted by the worker binary.
//!
//! A submission is a JSON document holding the job request and the command
//! it resolved to:
//!
//! ```json
//! {
//!   "request": { "id": "job-1", "name": "nightly", "user": "alice", "group": "eng", "timeout": 3600 },
//!   "command": { "id": "spark", "name": "spark-submit", "executable": "/opt/spark/bin/spark-submit" }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use genie_core::config::ExecutionConfig;
use genie_core::error::CoreError;
use genie_core::job::{Command, ExecutionEnvironment, JobRequest};

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("cannot read submission {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed submission: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("cannot create job directory {path}: {source}")]
    JobDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub request: JobRequest,
    pub command: Command,
}

impl JobSubmission {
    /// Parse and validate a submission document.
    pub fn from_json(json: &str) -> Result<Self, SubmissionError> {
        let submission: Self = serde_json::from_str(json)?;
        submission.request.validate()?;
        if submission.command.executable.trim().is_empty() {
            return Err(CoreError::Validation(
                "Command executable must not be empty".to_string(),
            )
            .into());
        }
        Ok(submission)
    }

    pub async fn load(path: &Path) -> Result<Self, SubmissionError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SubmissionError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&json)
    }

    /// Create `<jobs_dir>/<job id>` and build the job's execution environment.
    pub async fn prepare(
        self,
        config: &ExecutionConfig,
    ) -> Result<ExecutionEnvironment, SubmissionError> {
        let job_dir = config.jobs_dir.join(&self.request.id);
        tokio::fs::create_dir_all(&job_dir)
            .await
            .map_err(|source| SubmissionError::JobDir {
                path: job_dir.clone(),
                source,
            })?;
        Ok(ExecutionEnvironment::new(self.request, self.command, job_dir))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
