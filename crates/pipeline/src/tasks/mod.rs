//! Concrete workflow tasks of the standard job pipeline.

mod kickoff;
mod script;
mod setup;

pub use kickoff::JobKickoffTask;
pub use script::JobScriptTask;
pub use setup::JobSetupTask;

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use genie_core::job::{Command, ExecutionEnvironment, JobRequest};

    pub fn environment(job_dir: &Path) -> ExecutionEnvironment {
        ExecutionEnvironment::new(
            JobRequest {
                id: "job-1".to_string(),
                name: "nightly report".to_string(),
                user: "alice".to_string(),
                group: Some("eng".to_string()),
                timeout: 3600,
                command_args: vec!["hello".to_string(), "big world".to_string()],
                description: None,
                tags: vec![],
            },
            Command {
                id: "cmd-echo".to_string(),
                name: "echo".to_string(),
                executable: "echo".to_string(),
                check_delay: 5000,
            },
            job_dir.to_path_buf(),
        )
    }
}
