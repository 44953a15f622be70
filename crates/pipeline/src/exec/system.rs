use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{CommandExecutor, CommandLine, CommandOutput, ExecError};

/// Executes commands as real child processes and waits for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

#[async_trait]
impl CommandExecutor for SystemExecutor {
    async fn execute(&self, command: &CommandLine) -> Result<CommandOutput, ExecError> {
        tracing::debug!(command = %command, "Executing command");

        let output = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ExecError::Spawn {
                command: command.to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            })
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(
                command = %command,
                exit_code = ?output.status.code(),
                stderr = %stderr,
                "Command failed",
            );
            Err(ExecError::Failed {
                command: command.to_string(),
                exit_code: output.status.code(),
                stderr,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
