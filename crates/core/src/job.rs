//! Job request, resolved command, and per-job execution environment.
//!
//! These are the inputs of the execution pipeline. They are produced by the
//! API layer (request) and the command resolver (command), and are read-only
//! once a pipeline run starts.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::layout;
use crate::types::JobId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default job timeout when the request does not carry one (7 days).
pub const DEFAULT_JOB_TIMEOUT_SECS: u32 = 604_800;

/// Default delay between health checks of a running job, in milliseconds.
pub const DEFAULT_CHECK_DELAY_MS: u64 = 10_000;

/// Maximum length of an OS user or group name.
const MAX_IDENTITY_NAME_LEN: usize = 32;

// ---------------------------------------------------------------------------
// JobRequest
// ---------------------------------------------------------------------------

/// Immutable description of a job as accepted by the API layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub id: JobId,
    pub name: String,
    /// OS user the job body runs as when run-as-user is enabled.
    pub user: String,
    /// Primary group for the user. Blank or absent means "no group".
    #[serde(default)]
    pub group: Option<String>,
    /// Seconds after launch at which the job is considered timed out.
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    /// Arguments appended to the command executable in the run script.
    #[serde(default)]
    pub command_args: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_timeout() -> u32 {
    DEFAULT_JOB_TIMEOUT_SECS
}

impl JobRequest {
    /// The group to provision for the user, if a non-blank one was given.
    pub fn effective_group(&self) -> Option<&str> {
        self.group
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    /// Validate the fields that end up as OS command arguments.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.id.trim().is_empty() {
            return Err(CoreError::Validation(
                "Job id must not be empty".to_string(),
            ));
        }
        if self.id.contains('/') || self.id == "." || self.id == ".." {
            return Err(CoreError::Validation(format!(
                "Job id '{}' cannot be used as a directory name",
                self.id
            )));
        }
        validate_identity_name("user", &self.user)?;
        if let Some(group) = self.effective_group() {
            validate_identity_name("group", group)?;
        }
        Ok(())
    }
}

/// Validate a user or group name.
///
/// Rules:
/// - Must not be empty or exceed `MAX_IDENTITY_NAME_LEN` characters.
/// - Must not start with `-` (it would be parsed as an option).
/// - Must contain only alphanumeric, hyphen, underscore, or dot characters.
pub fn validate_identity_name(field: &str, name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if name.len() > MAX_IDENTITY_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "{field} must not exceed {MAX_IDENTITY_NAME_LEN} characters"
        )));
    }
    if name.starts_with('-') {
        return Err(CoreError::Validation(format!(
            "{field} '{name}' must not start with '-'"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(CoreError::Validation(format!(
            "{field} '{name}' may only contain alphanumeric, hyphen, underscore, or dot characters"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// The command a job request resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    pub name: String,
    /// Executable line written verbatim into the run script.
    pub executable: String,
    /// Delay between health checks of jobs running this command, in ms.
    #[serde(default = "default_check_delay")]
    pub check_delay: u64,
}

fn default_check_delay() -> u64 {
    DEFAULT_CHECK_DELAY_MS
}

// ---------------------------------------------------------------------------
// ExecutionEnvironment
// ---------------------------------------------------------------------------

/// Everything the pipeline needs to know about one job on this host.
///
/// Created once per job before the pipeline runs and owned by that run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    pub job_request: JobRequest,
    pub command: Command,
    pub job_working_dir: PathBuf,
}

impl ExecutionEnvironment {
    pub fn new(job_request: JobRequest, command: Command, job_working_dir: PathBuf) -> Self {
        Self {
            job_request,
            command,
            job_working_dir,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_request.id
    }

    /// `<jobDir>/genie/logs`
    pub fn logs_dir(&self) -> PathBuf {
        self.job_working_dir.join(layout::LOGS_DIR)
    }

    /// `<jobDir>/<script_name>`
    pub fn run_script_path(&self, script_name: &str) -> PathBuf {
        self.job_working_dir.join(script_name)
    }

    /// `<jobDir>/genie/logs/<log_name>`
    pub fn log_path(&self, log_name: &str) -> PathBuf {
        self.logs_dir().join(log_name)
    }

    pub fn working_dir(&self) -> &Path {
        &self.job_working_dir
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn request() -> JobRequest {
        JobRequest {
            id: "job-1".to_string(),
            name: "nightly".to_string(),
            user: "alice".to_string(),
            group: Some("eng".to_string()),
            timeout: 3600,
            command_args: vec![],
            description: None,
            tags: vec![],
        }
    }

    #[test]
    fn deserialize_applies_defaults() {
        let json = r#"{"id": "j", "name": "n", "user": "bob"}"#;
        let req: JobRequest = serde_json::from_str(json).expect("parse");
        assert_eq!(req.timeout, DEFAULT_JOB_TIMEOUT_SECS);
        assert!(req.group.is_none());
        assert!(req.command_args.is_empty());

        let json = r#"{"id": "c", "name": "spark", "executable": "/bin/spark"}"#;
        let cmd: Command = serde_json::from_str(json).expect("parse");
        assert_eq!(cmd.check_delay, DEFAULT_CHECK_DELAY_MS);
    }

    #[test]
    fn effective_group_ignores_blank() {
        let mut req = request();
        assert_eq!(req.effective_group(), Some("eng"));
        req.group = Some("   ".to_string());
        assert_eq!(req.effective_group(), None);
        req.group = None;
        assert_eq!(req.effective_group(), None);
    }

    #[test]
    fn valid_request_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn option_like_user_rejected() {
        let mut req = request();
        req.user = "-o".to_string();
        assert_matches!(req.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn unsafe_names_rejected() {
        assert!(validate_identity_name("user", "").is_err());
        assert!(validate_identity_name("user", "a b").is_err());
        assert!(validate_identity_name("user", "$(whoami)").is_err());
        assert!(validate_identity_name("user", &"a".repeat(33)).is_err());
        assert!(validate_identity_name("user", "svc_genie.1").is_ok());
    }

    #[test]
    fn job_id_must_be_a_single_path_component() {
        let mut req = request();
        req.id = "../etc".to_string();
        assert_matches!(req.validate(), Err(CoreError::Validation(_)));
        req.id = String::new();
        assert_matches!(req.validate(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn environment_paths() {
        let env = ExecutionEnvironment::new(
            request(),
            Command {
                id: "c".to_string(),
                name: "spark".to_string(),
                executable: "/bin/spark".to_string(),
                check_delay: 5000,
            },
            PathBuf::from("/mnt/jobs/job-1"),
        );
        assert_eq!(env.logs_dir(), PathBuf::from("/mnt/jobs/job-1/genie/logs"));
        assert_eq!(env.run_script_path("run"), PathBuf::from("/mnt/jobs/job-1/run"));
        assert_eq!(
            env.log_path("genie.log"),
            PathBuf::from("/mnt/jobs/job-1/genie/logs/genie.log")
        );
        assert_eq!(env.job_id(), "job-1");
    }
}
