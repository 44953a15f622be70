//! Final task of the pipeline: provision the job's identity, launch the run
//! script and record the running process.
//!
//! Order of side effects:
//!
//! 1. Resolve the job directory and run script to absolute UTF-8 paths, then
//!    close the run script (flush). Nothing else runs if either fails.
//! 2. With user creation enabled, ensure the job user (and group) exist.
//! 3. With run-as-user enabled, `chown -R` the job directory to the user and
//!    make the logs directory group-writable.
//! 4. `chmod +x` the run script.
//! 5. Wrap the script with the run-as and isolation prefixes and spawn it.
//! 6. Read the pid and store the [`JobExecution`](genie_core::execution::JobExecution)
//!    record.
//!
//! The pipeline never waits for the job process. Its handle is left in the
//! context under `JOB_PROCESS`, including when the pid lookup fails, so the
//! caller decides whether to kill or reap it.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use genie_core::config::ExecutionConfig;

use crate::context::{keys, ExecutionContext};
use crate::error::TaskError;
use crate::exec::CommandExecutor;
use crate::identity::IdentityManager;
use crate::launch::{CommandAdapter, LaunchSpec, ProcessLauncher, SystemLauncher};
use crate::process_id::{NativeProcessIdentifier, ProcessIdentifier};
use crate::record::build_job_execution;
use crate::task::WorkflowTask;
use crate::tasks::setup::script_error;

pub struct JobKickoffTask {
    config: Arc<ExecutionConfig>,
    identity: IdentityManager,
    launcher: Arc<dyn ProcessLauncher>,
    identifier: Arc<dyn ProcessIdentifier>,
}

impl JobKickoffTask {
    pub fn new(config: Arc<ExecutionConfig>, executor: Arc<dyn CommandExecutor>) -> Self {
        let identity = IdentityManager::new(executor, config.elevation_prefix.clone());
        Self {
            config,
            identity,
            launcher: Arc::new(SystemLauncher),
            identifier: Arc::new(NativeProcessIdentifier),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_identifier(mut self, identifier: Arc<dyn ProcessIdentifier>) -> Self {
        self.identifier = identifier;
        self
    }
}

#[async_trait]
impl WorkflowTask for JobKickoffTask {
    fn name(&self) -> &'static str {
        "job_kickoff"
    }

    async fn execute_task(&self, context: &mut ExecutionContext) -> Result<(), TaskError> {
        let mut env = context.get(keys::JOB_EXECUTION_ENV)?.clone();
        env.job_working_dir = resolve("resolve job directory", env.working_dir())?;
        let job_id = env.job_id();
        let user = env.job_request.user.as_str();

        let script = context.get_mut(keys::RUN_SCRIPT)?;
        let script_path = resolve("resolve run script", script.path())?;
        script
            .close()
            .await
            .map_err(|source| script_error(&script_path, source))?;

        if self.config.user_creation_enabled {
            self.identity
                .ensure_user_exists(user, env.job_request.effective_group())
                .await?;
        }

        let adapter = CommandAdapter::select(&self.config, user);
        if adapter.runs_as_user() {
            self.identity
                .change_ownership(env.working_dir(), user)
                .await?;
            self.identity.make_group_writable(&env.logs_dir()).await?;
        }

        self.identity.make_executable(&script_path).await?;

        let command = adapter.wrap(&script_path);
        context.insert(keys::LAUNCH_COMMAND, command.clone());

        let spec = LaunchSpec {
            command,
            working_dir: env.working_dir().to_path_buf(),
            log_path: env.log_path(&self.config.log_file_name),
        };
        tracing::info!(job_id = %job_id, user, command = %spec.command, "Launching job");

        let launched_at = Utc::now();
        let child = self
            .launcher
            .launch(&spec)
            .map_err(|source| TaskError::Launch {
                command: spec.command.clone(),
                source,
            })?;

        let pid = self.identifier.process_id(&child);
        context.insert(keys::JOB_PROCESS, child);
        let pid = pid?;

        let record = build_job_execution(&self.config.hostname, &env, pid, launched_at);
        tracing::info!(
            job_id = %job_id,
            pid,
            host = %record.host_name,
            deadline = %record.timeout,
            "Job launched",
        );
        context.insert(keys::JOB_EXECUTION, record);
        Ok(())
    }
}

/// Absolute form of `path`, joined onto the current directory when relative.
///
/// The launcher changes into the job directory before exec, and every path
/// is handed to OS commands as text. Non-UTF-8 paths are rejected here,
/// before anything runs.
fn resolve(operation: &'static str, path: &Path) -> Result<PathBuf, TaskError> {
    let fail = |source| TaskError::Io {
        operation,
        path: path.display().to_string(),
        source,
    };
    if path.to_str().is_none() {
        return Err(fail(io::Error::new(
            io::ErrorKind::InvalidData,
            "path is not valid UTF-8",
        )));
    }
    std::path::absolute(path).map_err(fail)
}
