//! OS identity provisioning and ownership changes for job directories.
//!
//! All commands here are global-state changes on the host (users, groups,
//! file ownership). They are issued through the shared [`CommandExecutor`]
//! with the configured elevation prefix and are idempotent: re-running them
//! after a partial failure converges to the same state.
//!
//! No locks are taken. Two jobs provisioning the same user concurrently is
//! tolerated because "already exists" from `groupadd`/`useradd` is treated
//! as success.

use std::path::Path;
use std::sync::Arc;

use crate::exec::{CommandExecutor, CommandLine, ExecError};

/// Exit status `groupadd` and `useradd` use for a name that is already taken.
const EXIT_NAME_IN_USE: i32 = 9;

/// Result of a create-if-missing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
}

/// Errors from identity and permission operations. All of them are fatal
/// for the job.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("could not create user {user}: {source}")]
    UserCreation {
        user: String,
        #[source]
        source: ExecError,
    },

    #[error("could not change ownership of {path} to {user}: {source}")]
    Ownership {
        path: String,
        user: String,
        #[source]
        source: ExecError,
    },

    #[error("could not change permissions ({mode}) of {path}: {source}")]
    Permission {
        path: String,
        mode: &'static str,
        #[source]
        source: ExecError,
    },
}

/// Classify the result of a `groupadd`/`useradd` call.
///
/// Only an exit status of 9 or an "already exists" message on stderr counts
/// as pre-existence; everything else is passed back as a failure.
pub fn classify_provisioning(
    result: Result<(), ExecError>,
) -> Result<ProvisionOutcome, ExecError> {
    match result {
        Ok(()) => Ok(ProvisionOutcome::Created),
        Err(err) if is_already_exists(&err) => Ok(ProvisionOutcome::AlreadyExists),
        Err(err) => Err(err),
    }
}

fn is_already_exists(err: &ExecError) -> bool {
    match err {
        ExecError::Spawn { .. } => false,
        ExecError::Failed { exit_code, stderr, .. } => {
            *exit_code == Some(EXIT_NAME_IN_USE) || stderr.contains("already exists")
        }
    }
}

/// Ensures job identities exist and job directories are owned by them.
#[derive(Clone)]
pub struct IdentityManager {
    executor: Arc<dyn CommandExecutor>,
    elevation_prefix: Vec<String>,
}

impl IdentityManager {
    pub fn new(executor: Arc<dyn CommandExecutor>, elevation_prefix: Vec<String>) -> Self {
        Self {
            executor,
            elevation_prefix,
        }
    }

    fn elevated(&self, command: CommandLine) -> CommandLine {
        command.wrapped_in(&self.elevation_prefix)
    }

    /// Whether `id -u <user>` succeeds. Any failure counts as "not found".
    pub async fn user_exists(&self, user: &str) -> bool {
        let lookup = CommandLine::new("id").args(["-u", user]);
        match self.executor.execute(&lookup).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(user, error = %e, "User lookup failed; treating as missing");
                false
            }
        }
    }

    /// Create `user` (and `group`, if given) unless the user already exists.
    ///
    /// The group is created first; a group that already exists is fine, and
    /// any other group failure is logged and left for `useradd` to surface.
    /// The user is created without a home directory.
    pub async fn ensure_user_exists(
        &self,
        user: &str,
        group: Option<&str>,
    ) -> Result<ProvisionOutcome, IdentityError> {
        if self.user_exists(user).await {
            tracing::debug!(user, "User already exists");
            return Ok(ProvisionOutcome::AlreadyExists);
        }

        tracing::info!(user, group = ?group, "User does not exist, creating it");

        if let Some(group) = group {
            self.create_group(group).await;
        }

        let mut useradd = CommandLine::new("useradd").arg(user);
        if let Some(group) = group {
            useradd = useradd.args(["-G", group]);
        }
        let useradd = self.elevated(useradd.arg("-M"));

        let result = self.executor.execute(&useradd).await.map(|_| ());
        match classify_provisioning(result) {
            Ok(ProvisionOutcome::Created) => {
                tracing::info!(user, "User created");
                Ok(ProvisionOutcome::Created)
            }
            Ok(ProvisionOutcome::AlreadyExists) => {
                tracing::debug!(user, "User was created concurrently");
                Ok(ProvisionOutcome::AlreadyExists)
            }
            Err(source) => {
                tracing::error!(user, error = %source, "User creation failed");
                Err(IdentityError::UserCreation {
                    user: user.to_string(),
                    source,
                })
            }
        }
    }

    async fn create_group(&self, group: &str) {
        let groupadd = self.elevated(CommandLine::new("groupadd").arg(group));
        let result = self.executor.execute(&groupadd).await.map(|_| ());
        match classify_provisioning(result) {
            Ok(outcome) => tracing::debug!(group, ?outcome, "Group provisioned"),
            Err(e) => tracing::warn!(
                group,
                error = %e,
                "Group creation failed, continuing with user creation",
            ),
        }
    }

    /// `chown -R <user> <path>`
    pub async fn change_ownership(&self, path: &Path, user: &str) -> Result<(), IdentityError> {
        let path_str = path.to_string_lossy().into_owned();
        let chown =
            self.elevated(CommandLine::new("chown").args(["-R", user, path_str.as_str()]));
        self.executor
            .execute(&chown)
            .await
            .map(|_| ())
            .map_err(|source| IdentityError::Ownership {
                path: path_str,
                user: user.to_string(),
                source,
            })
    }

    /// `chmod g+w <path>`
    pub async fn make_group_writable(&self, path: &Path) -> Result<(), IdentityError> {
        self.chmod(path, "g+w").await
    }

    /// `chmod +x <path>`
    pub async fn make_executable(&self, path: &Path) -> Result<(), IdentityError> {
        self.chmod(path, "+x").await
    }

    async fn chmod(&self, path: &Path, mode: &'static str) -> Result<(), IdentityError> {
        let path_str = path.to_string_lossy().into_owned();
        tracing::debug!(path = %path_str, mode, "Changing permissions");
        let chmod = self.elevated(CommandLine::new("chmod").args([mode, path_str.as_str()]));
        self.executor
            .execute(&chmod)
            .await
            .map(|_| ())
            .map_err(|source| IdentityError::Permission {
                path: path_str,
                mode,
                source,
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
