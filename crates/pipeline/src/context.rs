//! Per-run execution context shared by the workflow tasks.
//!
//! The context is a small registry of tagged values. Each entry is stored
//! under a [`Key<T>`] whose type parameter fixes what the entry holds, so a
//! task reading `keys::RUN_SCRIPT` gets a `&RunScript` back without casts.
//! The set of storable types is the closed [`Entry`] enum.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use genie_core::execution::JobExecution;
use genie_core::job::ExecutionEnvironment;
use tokio::process::Child;

use crate::launch::LaunchCommand;
use crate::script::RunScript;

/// Typed name of a context entry.
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.name)
    }
}

/// Well-known keys written and read by the standard tasks.
pub mod keys {
    use super::*;

    /// Written by the caller before the pipeline runs.
    pub const JOB_EXECUTION_ENV: Key<ExecutionEnvironment> = Key::new("job_execution_env");
    /// Open run script; written by the setup task, closed by kickoff.
    pub const RUN_SCRIPT: Key<RunScript> = Key::new("run_script");
    /// Final launch command tokens.
    pub const LAUNCH_COMMAND: Key<LaunchCommand> = Key::new("launch_command");
    /// Handle of the launched job process.
    pub const JOB_PROCESS: Key<Child> = Key::new("job_process");
    /// Execution record consumed by the health checker.
    pub const JOB_EXECUTION: Key<JobExecution> = Key::new("job_execution");
}

/// A stored context value.
#[derive(Debug)]
pub enum Entry {
    Environment(ExecutionEnvironment),
    RunScript(RunScript),
    LaunchCommand(LaunchCommand),
    Process(Child),
    Execution(JobExecution),
}

/// A type that can be stored in the context.
pub trait ContextValue: Sized {
    fn into_entry(self) -> Entry;
    fn from_entry(entry: &Entry) -> Option<&Self>;
    fn from_entry_mut(entry: &mut Entry) -> Option<&mut Self>;
    fn try_take(entry: Entry) -> Result<Self, Entry>;
}

macro_rules! context_value {
    ($ty:ty => $variant:ident) => {
        impl ContextValue for $ty {
            fn into_entry(self) -> Entry {
                Entry::$variant(self)
            }

            fn from_entry(entry: &Entry) -> Option<&Self> {
                match entry {
                    Entry::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_entry_mut(entry: &mut Entry) -> Option<&mut Self> {
                match entry {
                    Entry::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn try_take(entry: Entry) -> Result<Self, Entry> {
                match entry {
                    Entry::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }
        }
    };
}

context_value!(ExecutionEnvironment => Environment);
context_value!(RunScript => RunScript);
context_value!(LaunchCommand => LaunchCommand);
context_value!(Child => Process);
context_value!(JobExecution => Execution);

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("context entry '{0}' is missing")]
    Missing(&'static str),

    #[error("context entry '{0}' holds a value of another type")]
    WrongType(&'static str),
}

/// Mutable state of one pipeline run.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    entries: HashMap<&'static str, Entry>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context seeded with the job's execution environment.
    pub fn for_environment(env: ExecutionEnvironment) -> Self {
        let mut context = Self::new();
        context.insert(keys::JOB_EXECUTION_ENV, env);
        context
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn insert<T: ContextValue>(&mut self, key: Key<T>, value: T) {
        self.entries.insert(key.name, value.into_entry());
    }

    pub fn get<T: ContextValue>(&self, key: Key<T>) -> Result<&T, ContextError> {
        let entry = self
            .entries
            .get(key.name)
            .ok_or(ContextError::Missing(key.name))?;
        T::from_entry(entry).ok_or(ContextError::WrongType(key.name))
    }

    pub fn get_mut<T: ContextValue>(&mut self, key: Key<T>) -> Result<&mut T, ContextError> {
        let entry = self
            .entries
            .get_mut(key.name)
            .ok_or(ContextError::Missing(key.name))?;
        T::from_entry_mut(entry).ok_or(ContextError::WrongType(key.name))
    }

    /// Remove and return the entry. A type mismatch leaves the entry in place.
    pub fn take<T: ContextValue>(&mut self, key: Key<T>) -> Result<T, ContextError> {
        let entry = self
            .entries
            .remove(key.name)
            .ok_or(ContextError::Missing(key.name))?;
        T::try_take(entry).map_err(|entry| {
            self.entries.insert(key.name, entry);
            ContextError::WrongType(key.name)
        })
    }

    pub fn contains<T: ContextValue>(&self, key: Key<T>) -> bool {
        self.get(key).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const COMMAND: Key<LaunchCommand> = Key::new("command");
    const COMMAND_AS_RECORD: Key<JobExecution> = Key::new("command");

    fn command(tokens: &[&str]) -> LaunchCommand {
        LaunchCommand::new(tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn insert_then_get() {
        let mut ctx = ExecutionContext::new();
        assert!(ctx.is_empty());
        ctx.insert(COMMAND, command(&["/jobs/1/run"]));
        assert_eq!(ctx.get(COMMAND).expect("present"), &command(&["/jobs/1/run"]));
        assert!(ctx.contains(COMMAND));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let ctx = ExecutionContext::new();
        assert_matches!(ctx.get(keys::RUN_SCRIPT), Err(ContextError::Missing("run_script")));
    }

    #[test]
    fn type_mismatch_is_reported() {
        let mut ctx = ExecutionContext::new();
        ctx.insert(COMMAND, command(&["true"]));
        assert_matches!(ctx.get(COMMAND_AS_RECORD), Err(ContextError::WrongType("command")));
        assert!(!ctx.contains(COMMAND_AS_RECORD));
    }

    #[test]
    fn take_removes_entry() {
        let mut ctx = ExecutionContext::new();
        ctx.insert(COMMAND, command(&["once"]));
        assert_eq!(ctx.take(COMMAND).expect("take"), command(&["once"]));
        assert_matches!(ctx.take(COMMAND), Err(ContextError::Missing(_)));
    }

    #[test]
    fn take_with_wrong_type_keeps_entry() {
        let mut ctx = ExecutionContext::new();
        ctx.insert(COMMAND, command(&["kept"]));
        assert_matches!(ctx.take(COMMAND_AS_RECORD), Err(ContextError::WrongType(_)));
        assert_eq!(ctx.get(COMMAND).expect("still there"), &command(&["kept"]));
    }

    #[test]
    fn insert_replaces() {
        let mut ctx = ExecutionContext::new();
        ctx.insert(COMMAND, command(&["a"]));
        ctx.insert(COMMAND, command(&["b"]));
        assert_eq!(ctx.len(), 1);
        *ctx.get_mut(COMMAND).expect("present") = command(&["setsid", "b"]);
        assert_eq!(ctx.get(COMMAND).expect("present").to_string(), "setsid b");
    }
}
