//! Command adaptation and process launch for the job body.

mod adapter;

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};

pub use adapter::{CommandAdapter, LaunchCommand};

/// Everything needed to start the job process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub command: LaunchCommand,
    /// Working directory of the child (the job directory).
    pub working_dir: PathBuf,
    /// File receiving both stdout and stderr, opened for append.
    pub log_path: PathBuf,
}

/// Starts the job process without waiting for it.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<Child>;
}

/// Spawns the launch command as a real child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<Child> {
        let program = spec.command.program().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "launch command is empty")
        })?;

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&spec.log_path)?;
        let log_err = log.try_clone()?;

        tracing::debug!(
            command = %spec.command,
            working_dir = %spec.working_dir.display(),
            log = %spec.log_path.display(),
            "Spawning job process",
        );

        Command::new(program)
            .args(spec.command.args())
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
