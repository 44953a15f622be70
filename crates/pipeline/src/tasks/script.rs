use async_trait::async_trait;

use crate::context::{keys, ExecutionContext};
use crate::error::TaskError;
use crate::script::shell_quote;
use crate::task::WorkflowTask;
use crate::tasks::setup::script_error;

/// Appends the command invocation to the run script.
///
/// The executable is written verbatim; each request argument is quoted.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobScriptTask;

#[async_trait]
impl WorkflowTask for JobScriptTask {
    fn name(&self) -> &'static str {
        "job_script"
    }

    async fn execute_task(&self, context: &mut ExecutionContext) -> Result<(), TaskError> {
        let env = context.get(keys::JOB_EXECUTION_ENV)?;
        let line = invocation_line(&env.command.executable, &env.job_request.command_args);

        let script = context.get_mut(keys::RUN_SCRIPT)?;
        let path = script.path().to_path_buf();
        tracing::debug!(script = %path.display(), line = %line, "Writing job command");
        script
            .write_line(&line)
            .await
            .map_err(|source| script_error(&path, source))
    }
}

fn invocation_line(executable: &str, args: &[String]) -> String {
    let mut line = executable.trim().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&shell_quote(arg));
    }
    line
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
