use std::sync::Arc;
use std::time::Instant;

use genie_core::config::ExecutionConfig;

use crate::context::{keys, ExecutionContext};
use crate::error::PipelineError;
use crate::exec::CommandExecutor;
use crate::task::WorkflowTask;
use crate::tasks::{JobKickoffTask, JobScriptTask, JobSetupTask};

/// Ordered list of workflow tasks run against one context.
///
/// Tasks run strictly in order; the first failure stops the run and later
/// tasks are not executed.
#[derive(Default)]
pub struct Pipeline {
    tasks: Vec<Box<dyn WorkflowTask>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task(mut self, task: impl WorkflowTask + 'static) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    /// Setup, script, then kickoff, all driven by `executor` for OS commands.
    pub fn standard(config: Arc<ExecutionConfig>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self::new()
            .with_task(JobSetupTask::new(config.clone()))
            .with_task(JobScriptTask)
            .with_task(JobKickoffTask::new(config, executor))
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    pub async fn run(&self, context: &mut ExecutionContext) -> Result<(), PipelineError> {
        let job_id = context
            .get(keys::JOB_EXECUTION_ENV)
            .map(|env| env.job_id().to_string())
            .unwrap_or_default();

        for (position, task) in self.tasks.iter().enumerate() {
            let started = Instant::now();
            tracing::info!(job_id = %job_id, task = task.name(), position, "Running task");

            if let Err(source) = task.execute_task(context).await {
                tracing::error!(
                    job_id = %job_id,
                    task = task.name(),
                    position,
                    error = %source,
                    retryable = source.is_retryable(),
                    "Task failed",
                );
                return Err(PipelineError {
                    position,
                    task: task.name(),
                    source,
                });
            }

            tracing::debug!(
                job_id = %job_id,
                task = task.name(),
                duration_ms = started.elapsed().as_millis() as u64,
                "Task finished",
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::context::{ContextError, Key};
    use crate::error::TaskError;
    use crate::exec::RecordingExecutor;
    use crate::launch::LaunchCommand;

    const TRAIL: Key<LaunchCommand> = Key::new("trail");

    struct Mark(&'static str);

    #[async_trait]
    impl WorkflowTask for Mark {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn execute_task(&self, context: &mut ExecutionContext) -> Result<(), TaskError> {
            let mut trail = context
                .take(TRAIL)
                .map(|c| c.tokens().to_vec())
                .unwrap_or_default();
            trail.push(self.0.to_string());
            context.insert(TRAIL, LaunchCommand::new(trail));
            Ok(())
        }
    }

    struct Fail;

    #[async_trait]
    impl WorkflowTask for Fail {
        fn name(&self) -> &'static str {
            "fail"
        }

        async fn execute_task(&self, _context: &mut ExecutionContext) -> Result<(), TaskError> {
            Err(ContextError::Missing("anything").into())
        }
    }

    #[tokio::test]
    async fn tasks_run_in_order() {
        let pipeline = Pipeline::new()
            .with_task(Mark("a"))
            .with_task(Mark("b"))
            .with_task(Mark("c"));
        let mut ctx = ExecutionContext::new();

        pipeline.run(&mut ctx).await.expect("run");
        assert_eq!(ctx.get(TRAIL).expect("trail").to_string(), "a b c");
    }

    #[tokio::test]
    async fn first_failure_stops_the_run() {
        let pipeline = Pipeline::new()
            .with_task(Mark("a"))
            .with_task(Fail)
            .with_task(Mark("z"));
        let mut ctx = ExecutionContext::new();

        let err = pipeline.run(&mut ctx).await.unwrap_err();
        assert_eq!(err.position, 1);
        assert_eq!(err.task, "fail");
        assert_matches!(err.source, TaskError::Context(ContextError::Missing("anything")));
        assert_eq!(ctx.get(TRAIL).expect("trail").to_string(), "a");
    }

    #[test]
    fn standard_pipeline_shape() {
        let config = Arc::new(ExecutionConfig::new("host-a"));
        let pipeline = Pipeline::standard(config, Arc::new(RecordingExecutor::new()));
        assert_eq!(
            pipeline.task_names(),
            vec!["job_setup", "job_script", "job_kickoff"]
        );
    }

    #[tokio::test]
    async fn empty_pipeline_is_a_no_op() {
        let mut ctx = ExecutionContext::new();
        Pipeline::new().run(&mut ctx).await.expect("run");
        assert!(ctx.is_empty());
    }
}
