#![allow(dead_code)]

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;
use tokio::process::{Child, Command};

use genie_core::config::ExecutionConfig;
use genie_core::job::{Command as JobCommand, ExecutionEnvironment, JobRequest};
use genie_pipeline::exec::{Outcome, RecordingExecutor};
use genie_pipeline::launch::{LaunchSpec, ProcessLauncher};
use genie_pipeline::process_id::{IdentifierError, ProcessIdentifier};
use genie_pipeline::script::RunScript;
use genie_pipeline::{keys, ExecutionContext};

/// Host configuration with every optional behavior set explicitly.
pub fn config(run_as_user: bool, create_user: bool, isolation: bool) -> ExecutionConfig {
    ExecutionConfig::new("test-host")
        .with_run_as_user(run_as_user)
        .with_user_creation(create_user)
        .with_process_group_isolation(isolation)
}

/// Job environment for `user`/`group` rooted at `job_dir`, running `echo`.
pub fn environment(
    job_dir: &Path,
    user: &str,
    group: Option<&str>,
    timeout: u32,
) -> ExecutionEnvironment {
    ExecutionEnvironment::new(
        JobRequest {
            id: "job-42".to_string(),
            name: "integration".to_string(),
            user: user.to_string(),
            group: group.map(str::to_string),
            timeout,
            command_args: vec!["hello".to_string(), "world".to_string()],
            description: None,
            tags: vec!["test".to_string()],
        },
        JobCommand {
            id: "cmd-echo".to_string(),
            name: "echo".to_string(),
            executable: "echo".to_string(),
            check_delay: 5000,
        },
        job_dir.to_path_buf(),
    )
}

/// Context holding `env` and an open run script at `<jobDir>/run`, as the
/// setup and script tasks would leave it.
pub async fn prepared_context(env: ExecutionEnvironment) -> ExecutionContext {
    let path = env.run_script_path("run");
    let mut script = RunScript::create(&path).await.expect("create run script");
    script.write_line("#!/bin/sh").await.expect("write");
    script.write_line("true").await.expect("write");

    let mut ctx = ExecutionContext::for_environment(env);
    ctx.insert(keys::RUN_SCRIPT, script);
    ctx
}

/// Executor on which `id -u <user>` fails, i.e. the user does not exist.
pub fn missing_user(user: &str) -> RecordingExecutor {
    RecordingExecutor::new().respond(
        &["id", "-u", user],
        Outcome::Exit {
            code: 1,
            stderr: format!("id: '{user}': no such user"),
        },
    )
}

// ---------------------------------------------------------------------------
// Launch doubles
// ---------------------------------------------------------------------------

/// Records every launch and spawns a harmless `true` in place of the job.
///
/// When observing an executor, the commands it had executed at the moment
/// of each launch are captured as well.
#[derive(Default)]
pub struct CapturingLauncher {
    observed: Option<Arc<RecordingExecutor>>,
    launches: Mutex<Vec<(LaunchSpec, Vec<String>)>>,
}

impl CapturingLauncher {
    pub fn observing(executor: Arc<RecordingExecutor>) -> Self {
        Self {
            observed: Some(executor),
            launches: Mutex::default(),
        }
    }

    pub fn specs(&self) -> Vec<LaunchSpec> {
        self.launches
            .lock()
            .expect("lock")
            .iter()
            .map(|(spec, _)| spec.clone())
            .collect()
    }

    /// Executor command lines seen before the first launch.
    pub fn commands_before_launch(&self) -> Vec<String> {
        self.launches
            .lock()
            .expect("lock")
            .first()
            .map(|(_, lines)| lines.clone())
            .unwrap_or_default()
    }
}

impl ProcessLauncher for CapturingLauncher {
    fn launch(&self, spec: &LaunchSpec) -> io::Result<Child> {
        let seen = self
            .observed
            .as_ref()
            .map(|exec| exec.executed_lines())
            .unwrap_or_default();
        self.launches
            .lock()
            .expect("lock")
            .push((spec.clone(), seen));

        Command::new("true")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }
}

/// Launcher whose spawn always fails with `kind`.
pub struct FailingLauncher(pub io::ErrorKind);

impl ProcessLauncher for FailingLauncher {
    fn launch(&self, _spec: &LaunchSpec) -> io::Result<Child> {
        Err(io::Error::from(self.0))
    }
}

/// Identifier that never yields a pid.
pub struct FailingIdentifier;

impl ProcessIdentifier for FailingIdentifier {
    fn process_id(&self, _child: &Child) -> Result<u32, IdentifierError> {
        Err(IdentifierError::Other("pid not exposed".to_string()))
    }
}

/// Writer that accepts data but fails to flush, like a full disk.
pub struct FailingWriter;

impl AsyncWrite for FailingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::other("no space left on device")))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::other("no space left on device")))
    }
}
