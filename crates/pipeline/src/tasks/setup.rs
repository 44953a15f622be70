use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use genie_core::config::ExecutionConfig;
use genie_core::job::ExecutionEnvironment;

use crate::context::{keys, ExecutionContext};
use crate::error::TaskError;
use crate::script::RunScript;
use crate::task::WorkflowTask;

/// Creates the job's log directory and opens the run script with its
/// preamble.
pub struct JobSetupTask {
    config: Arc<ExecutionConfig>,
}

impl JobSetupTask {
    pub fn new(config: Arc<ExecutionConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl WorkflowTask for JobSetupTask {
    fn name(&self) -> &'static str {
        "job_setup"
    }

    async fn execute_task(&self, context: &mut ExecutionContext) -> Result<(), TaskError> {
        let env = context.get(keys::JOB_EXECUTION_ENV)?;

        let logs_dir = env.logs_dir();
        tokio::fs::create_dir_all(&logs_dir)
            .await
            .map_err(|source| TaskError::Io {
                operation: "create logs directory",
                path: logs_dir.display().to_string(),
                source,
            })?;

        let script_path = env.run_script_path(&self.config.launcher_script_name);
        let mut script = RunScript::create(&script_path)
            .await
            .map_err(|source| script_error(&script_path, source))?;
        write_preamble(&mut script, env)
            .await
            .map_err(|source| script_error(&script_path, source))?;

        tracing::info!(
            job_id = %env.job_id(),
            script = %script_path.display(),
            "Job directory prepared",
        );
        context.insert(keys::RUN_SCRIPT, script);
        Ok(())
    }
}

async fn write_preamble(script: &mut RunScript, env: &ExecutionEnvironment) -> std::io::Result<()> {
    script.write_line("#!/usr/bin/env bash").await?;
    script.write_line("set -o nounset -o pipefail").await?;
    script.write_line("").await?;
    script.export("GENIE_JOB_ID", env.job_id()).await?;
    script.export("GENIE_JOB_NAME", &env.job_request.name).await?;
    script
        .export("GENIE_JOB_DIR", &env.working_dir().to_string_lossy())
        .await?;
    script.export("GENIE_COMMAND_ID", &env.command.id).await?;
    script.export("GENIE_COMMAND_NAME", &env.command.name).await?;
    script.write_line("").await
}

pub(crate) fn script_error(path: &Path, source: std::io::Error) -> TaskError {
    TaskError::RunScript {
        path: path.display().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
