use std::fmt;
use std::path::Path;

use genie_core::config::ExecutionConfig;
use serde::{Deserialize, Serialize};

/// Final token list used to start the job process. The first token is the
/// program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchCommand(Vec<String>);

impl LaunchCommand {
    pub fn new(tokens: Vec<String>) -> Self {
        Self(tokens)
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }
}

impl fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// How the run script is wrapped before launch.
///
/// | run-as-user | isolation | command                              |
/// |-------------|-----------|--------------------------------------|
/// | off         | off       | `<script>`                           |
/// | off         | on        | `setsid <script>`                    |
/// | on          | off       | `sudo -u <user> <script>`            |
/// | on          | on        | `sudo -u <user> setsid <script>`     |
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAdapter {
    Direct,
    Isolate {
        isolation_prefix: Vec<String>,
    },
    Elevate {
        run_as_prefix: Vec<String>,
        user: String,
    },
    ElevateIsolate {
        run_as_prefix: Vec<String>,
        user: String,
        isolation_prefix: Vec<String>,
    },
}

impl CommandAdapter {
    /// Pick the adapter for the host configuration and the job's user.
    pub fn select(config: &ExecutionConfig, user: &str) -> Self {
        match (config.run_as_user_enabled, config.process_group_isolation) {
            (false, false) => Self::Direct,
            (false, true) => Self::Isolate {
                isolation_prefix: config.isolation_prefix.clone(),
            },
            (true, false) => Self::Elevate {
                run_as_prefix: config.run_as_prefix.clone(),
                user: user.to_string(),
            },
            (true, true) => Self::ElevateIsolate {
                run_as_prefix: config.run_as_prefix.clone(),
                user: user.to_string(),
                isolation_prefix: config.isolation_prefix.clone(),
            },
        }
    }

    /// Whether the job body runs as a different user than the service.
    pub fn runs_as_user(&self) -> bool {
        matches!(self, Self::Elevate { .. } | Self::ElevateIsolate { .. })
    }

    pub fn isolates(&self) -> bool {
        matches!(self, Self::Isolate { .. } | Self::ElevateIsolate { .. })
    }

    /// Wrap the run script path into the final launch command.
    pub fn wrap(&self, script: &Path) -> LaunchCommand {
        let mut tokens = Vec::new();
        match self {
            Self::Direct => {}
            Self::Isolate { isolation_prefix } => {
                tokens.extend(isolation_prefix.iter().cloned());
            }
            Self::Elevate {
                run_as_prefix,
                user,
            } => {
                tokens.extend(run_as_prefix.iter().cloned());
                tokens.push(user.clone());
            }
            Self::ElevateIsolate {
                run_as_prefix,
                user,
                isolation_prefix,
            } => {
                tokens.extend(run_as_prefix.iter().cloned());
                tokens.push(user.clone());
                tokens.extend(isolation_prefix.iter().cloned());
            }
        }
        tokens.push(script.to_string_lossy().into_owned());
        LaunchCommand(tokens)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(run_as: bool, isolate: bool) -> ExecutionConfig {
        ExecutionConfig::new("host-a")
            .with_run_as_user(run_as)
            .with_process_group_isolation(isolate)
    }

    fn wrapped(run_as: bool, isolate: bool) -> Vec<String> {
        CommandAdapter::select(&config(run_as, isolate), "alice")
            .wrap(Path::new("/jobs/42/run"))
            .tokens()
            .to_vec()
    }

    #[test]
    fn all_four_shapes() {
        assert_eq!(wrapped(false, false), vec!["/jobs/42/run"]);
        assert_eq!(wrapped(false, true), vec!["setsid", "/jobs/42/run"]);
        assert_eq!(
            wrapped(true, false),
            vec!["sudo", "-u", "alice", "/jobs/42/run"]
        );
        assert_eq!(
            wrapped(true, true),
            vec!["sudo", "-u", "alice", "setsid", "/jobs/42/run"]
        );
    }

    #[test]
    fn selection_flags() {
        let adapter = CommandAdapter::select(&config(true, false), "bob");
        assert!(adapter.runs_as_user());
        assert!(!adapter.isolates());

        let adapter = CommandAdapter::select(&config(false, false), "bob");
        assert_eq!(adapter, CommandAdapter::Direct);
        assert!(!adapter.runs_as_user());
    }

    #[test]
    fn launch_command_accessors() {
        let cmd = CommandAdapter::select(&config(true, true), "alice")
            .wrap(Path::new("/jobs/42/run"));
        assert_eq!(cmd.program(), Some("sudo"));
        assert_eq!(cmd.args(), ["-u", "alice", "setsid", "/jobs/42/run"]);
        assert_eq!(cmd.to_string(), "sudo -u alice setsid /jobs/42/run");

        let empty = LaunchCommand::new(Vec::new());
        assert_eq!(empty.program(), None);
        assert!(empty.args().is_empty());
    }

    #[test]
    fn serializes_as_token_array() {
        let cmd = LaunchCommand::new(vec!["setsid".into(), "/jobs/1/run".into()]);
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert_eq!(json, r#"["setsid","/jobs/1/run"]"#);
    }
}
