use std::io;

use crate::context::ContextError;
use crate::exec::ExecError;
use crate::identity::IdentityError;
use crate::launch::LaunchCommand;
use crate::process_id::IdentifierError;

/// Coarse classification of a task failure, for callers that map failures
/// to job status without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskErrorKind {
    /// A required context entry was missing or had the wrong type.
    Context,
    /// The run script could not be written or closed.
    RunScript,
    /// User/group provisioning, ownership or permission change failed.
    Identity,
    /// The job process could not be started.
    Launch,
    /// The job process started but its pid could not be read.
    ProcessId,
    /// Any other filesystem error.
    Io,
}

/// Failure of a single workflow task. Every variant aborts the job.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("failed to write run script {path}: {source}")]
    RunScript {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: LaunchCommand,
        #[source]
        source: io::Error,
    },

    #[error("job process started but its id is unknown: {0}")]
    ProcessId(#[from] IdentifierError),

    #[error("{operation} failed for {path}: {source}")]
    Io {
        operation: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },
}

impl TaskError {
    pub fn kind(&self) -> TaskErrorKind {
        match self {
            Self::Context(_) => TaskErrorKind::Context,
            Self::RunScript { .. } => TaskErrorKind::RunScript,
            Self::Identity(_) => TaskErrorKind::Identity,
            Self::Launch { .. } => TaskErrorKind::Launch,
            Self::ProcessId(_) => TaskErrorKind::ProcessId,
            Self::Io { .. } => TaskErrorKind::Io,
        }
    }

    /// Whether re-running the whole pipeline might succeed.
    ///
    /// Only transient OS conditions qualify. Every operation the pipeline
    /// performs is idempotent, so a retry starts from the beginning.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Launch { source, .. } | Self::Io { source, .. } => is_transient(source.kind()),
            Self::Identity(err) => match identity_exec_error(err) {
                ExecError::Spawn { source, .. } => is_transient(source.kind()),
                ExecError::Failed { .. } => false,
            },
            Self::Context(_) | Self::RunScript { .. } | Self::ProcessId(_) => false,
        }
    }
}

fn identity_exec_error(err: &IdentityError) -> &ExecError {
    match err {
        IdentityError::UserCreation { source, .. }
        | IdentityError::Ownership { source, .. }
        | IdentityError::Permission { source, .. } => source,
    }
}

fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// A pipeline run stopped at the task at `position` (zero-based).
#[derive(Debug, thiserror::Error)]
#[error("task #{position} ({task}) failed: {source}")]
pub struct PipelineError {
    pub position: usize,
    pub task: &'static str,
    #[source]
    pub source: TaskError,
}

impl PipelineError {
    pub fn kind(&self) -> TaskErrorKind {
        self.source.kind()
    }

    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
