use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use super::{CommandExecutor, CommandLine, CommandOutput, ExecError};

/// Scripted result of a command run through a [`RecordingExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Exit { code: i32, stderr: String },
    SpawnFailure(std::io::ErrorKind),
}

impl Outcome {
    fn into_result(self, command: &CommandLine) -> Result<CommandOutput, ExecError> {
        match self {
            Self::Success(stdout) => Ok(CommandOutput { stdout }),
            Self::Exit { code, stderr } => Err(ExecError::Failed {
                command: command.to_string(),
                exit_code: Some(code),
                stderr,
            }),
            Self::SpawnFailure(kind) => Err(ExecError::Spawn {
                command: command.to_string(),
                source: std::io::Error::from(kind),
            }),
        }
    }
}

/// Test-double executor that records every command and returns scripted
/// outcomes.
///
/// A rule matches when its pattern tokens appear as a contiguous run in the
/// command's tokens, so `["id", "-u", "alice"]` matches both `id -u alice`
/// and `sudo id -u alice`. The first matching rule wins. Commands no rule
/// matches are forwarded to the fallback executor if one is set, otherwise
/// they succeed with empty output.
#[derive(Default)]
pub struct RecordingExecutor {
    commands: Mutex<Vec<CommandLine>>,
    rules: Mutex<Vec<(Vec<String>, Outcome)>>,
    fallback: Option<Arc<dyn CommandExecutor>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forward unmatched commands to `inner` instead of succeeding blindly.
    pub fn delegating(inner: Arc<dyn CommandExecutor>) -> Self {
        Self {
            fallback: Some(inner),
            ..Self::default()
        }
    }

    /// Script `outcome` for commands containing `pattern`.
    pub fn respond(self, pattern: &[&str], outcome: Outcome) -> Self {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pattern.iter().map(|s| s.to_string()).collect(), outcome));
        self
    }

    /// Every command executed so far, in order.
    pub fn executed_commands(&self) -> Vec<CommandLine> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Executed commands rendered as space-joined strings.
    pub fn executed_lines(&self) -> Vec<String> {
        self.executed_commands()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Whether any executed command contains `pattern`.
    pub fn saw(&self, pattern: &[&str]) -> bool {
        self.executed_commands()
            .iter()
            .any(|cmd| contains_run(&cmd.tokens(), pattern))
    }

    fn scripted(&self, command: &CommandLine) -> Option<Outcome> {
        let tokens = command.tokens();
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(pattern, _)| contains_run(&tokens, pattern))
            .map(|(_, outcome)| outcome.clone())
    }
}

fn contains_run<S: AsRef<str>>(tokens: &[String], pattern: &[S]) -> bool {
    if pattern.is_empty() {
        return true;
    }
    tokens.windows(pattern.len()).any(|window| {
        window
            .iter()
            .zip(pattern)
            .all(|(token, expected)| token == expected.as_ref())
    })
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn execute(&self, command: &CommandLine) -> Result<CommandOutput, ExecError> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.clone());

        if let Some(outcome) = self.scripted(command) {
            return outcome.into_result(command);
        }
        match &self.fallback {
            Some(inner) => inner.execute(command).await,
            None => Ok(CommandOutput::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
