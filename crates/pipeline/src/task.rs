use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::TaskError;

/// One step of the job execution pipeline.
///
/// Tasks communicate only through the [`ExecutionContext`]; each reads the
/// entries earlier tasks wrote and adds its own.
#[async_trait]
pub trait WorkflowTask: Send + Sync {
    /// Stable snake_case name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn execute_task(&self, context: &mut ExecutionContext) -> Result<(), TaskError>;
}
