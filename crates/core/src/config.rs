use std::path::PathBuf;

use crate::error::CoreError;
use crate::layout;

/// Host-level configuration of the job execution pipeline.
///
/// Built once at startup and shared read-only by every pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Run the job body as the requesting user instead of the service user.
    pub run_as_user_enabled: bool,
    /// Create the requesting user (and group) when it does not exist.
    pub user_creation_enabled: bool,
    /// Hostname recorded in every execution record.
    pub hostname: String,
    /// Prefix for privileged commands (`groupadd`, `chown`, `chmod`, ...).
    pub elevation_prefix: Vec<String>,
    /// Prefix that runs a command as another user; the user name follows it.
    pub run_as_prefix: Vec<String>,
    /// Launch jobs in their own session / process group.
    pub process_group_isolation: bool,
    /// Prefix that starts a command in a new session.
    pub isolation_prefix: Vec<String>,
    pub launcher_script_name: String,
    pub log_file_name: String,
    /// Root under which per-job working directories are created.
    pub jobs_dir: PathBuf,
}

impl ExecutionConfig {
    /// Configuration with run-as-user and user creation disabled and the
    /// platform defaults for everything else.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            run_as_user_enabled: false,
            user_creation_enabled: false,
            hostname: hostname.into(),
            elevation_prefix: vec!["sudo".to_string()],
            run_as_prefix: vec!["sudo".to_string(), "-u".to_string()],
            process_group_isolation: cfg!(target_os = "linux"),
            isolation_prefix: vec!["setsid".to_string()],
            launcher_script_name: layout::DEFAULT_LAUNCHER_SCRIPT.to_string(),
            log_file_name: layout::DEFAULT_LOG_FILE.to_string(),
            jobs_dir: PathBuf::from("/tmp/genie/jobs"),
        }
    }

    pub fn with_run_as_user(mut self, enabled: bool) -> Self {
        self.run_as_user_enabled = enabled;
        self
    }

    pub fn with_user_creation(mut self, enabled: bool) -> Self {
        self.user_creation_enabled = enabled;
        self
    }

    pub fn with_process_group_isolation(mut self, enabled: bool) -> Self {
        self.process_group_isolation = enabled;
        self
    }

    pub fn with_elevation_prefix(mut self, prefix: Vec<String>) -> Self {
        self.elevation_prefix = prefix;
        self
    }

    pub fn with_jobs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.jobs_dir = dir.into();
        self
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                          | Default                     |
    /// |----------------------------------|-----------------------------|
    /// | `GENIE_JOBS_RUN_AS_USER`         | `false`                     |
    /// | `GENIE_JOBS_CREATE_USER`         | `false`                     |
    /// | `GENIE_HOSTNAME`                 | system hostname             |
    /// | `GENIE_JOBS_DIR` (absolute)      | `/tmp/genie/jobs`           |
    /// | `GENIE_PROCESS_GROUP_ISOLATION`  | `true` on Linux             |
    /// | `GENIE_ELEVATION_PREFIX`         | `sudo`                      |
    /// | `GENIE_RUN_AS_PREFIX`            | `sudo -u`                   |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hostname = match lookup("GENIE_HOSTNAME").filter(|h| !h.trim().is_empty()) {
            Some(h) => h.trim().to_string(),
            None => local_hostname().ok_or_else(|| {
                CoreError::Config(
                    "GENIE_HOSTNAME is not set and the system hostname is unavailable"
                        .to_string(),
                )
            })?,
        };

        let mut config = Self::new(hostname);

        if let Some(v) = lookup("GENIE_JOBS_RUN_AS_USER") {
            config.run_as_user_enabled = parse_bool("GENIE_JOBS_RUN_AS_USER", &v)?;
        }
        if let Some(v) = lookup("GENIE_JOBS_CREATE_USER") {
            config.user_creation_enabled = parse_bool("GENIE_JOBS_CREATE_USER", &v)?;
        }
        if let Some(v) = lookup("GENIE_PROCESS_GROUP_ISOLATION") {
            config.process_group_isolation = parse_bool("GENIE_PROCESS_GROUP_ISOLATION", &v)?;
        }
        if let Some(v) = lookup("GENIE_JOBS_DIR") {
            let dir = PathBuf::from(v);
            // The launcher changes into the job directory before exec, so a
            // relative root would resolve twice.
            if !dir.is_absolute() {
                return Err(CoreError::Config(format!(
                    "GENIE_JOBS_DIR must be an absolute path, got {}",
                    dir.display()
                )));
            }
            config.jobs_dir = dir;
        }
        if let Some(v) = lookup("GENIE_ELEVATION_PREFIX") {
            config.elevation_prefix = split_prefix(&v);
        }
        if let Some(v) = lookup("GENIE_RUN_AS_PREFIX") {
            let prefix = split_prefix(&v);
            if prefix.is_empty() {
                return Err(CoreError::Config(
                    "GENIE_RUN_AS_PREFIX must not be empty".to_string(),
                ));
            }
            config.run_as_prefix = prefix;
        }

        Ok(config)
    }
}

/// Parse a boolean flag: `true`/`1`/`yes` or `false`/`0`/`no`, case-insensitive.
pub fn parse_bool(name: &str, value: &str) -> Result<bool, CoreError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(CoreError::Config(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

fn split_prefix(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Read the system hostname via `gethostname(2)`.
pub fn local_hostname() -> Option<String> {
    #[cfg(unix)]
    {
        let mut buf = [0u8; 256];
        // Safety: the buffer is valid for `buf.len()` bytes.
        let ret = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
        if ret != 0 {
            return None;
        }
        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        let name = String::from_utf8_lossy(&buf[..len]).trim().to_string();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
    #[cfg(not(unix))]
    {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
