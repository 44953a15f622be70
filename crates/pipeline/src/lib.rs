//! Job execution pipeline: prepares a job directory, provisions the job's
//! OS identity, launches the run script and records the running process.

pub mod context;
pub mod error;
pub mod exec;
pub mod identity;
pub mod launch;
pub mod pipeline;
pub mod process_id;
pub mod record;
pub mod script;
pub mod task;
pub mod tasks;

pub use context::{keys, ExecutionContext};
pub use error::{PipelineError, TaskError, TaskErrorKind};
pub use pipeline::Pipeline;
pub use task::WorkflowTask;
