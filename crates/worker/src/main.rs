use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genie_core::config::ExecutionConfig;
use genie_pipeline::exec::SystemExecutor;
use genie_pipeline::{keys, ExecutionContext, Pipeline};
use genie_worker::submission::JobSubmission;
use genie_worker::{stop_orphaned_process, LaunchReport, WorkerOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let options = WorkerOptions::from_env()?;
    init_tracing(options.json_logs);

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: genie-worker <submission.json>")?;

    let config = Arc::new(ExecutionConfig::from_env()?);
    tracing::info!(
        host = %config.hostname,
        run_as_user = config.run_as_user_enabled,
        create_user = config.user_creation_enabled,
        isolation = config.process_group_isolation,
        jobs_dir = %config.jobs_dir.display(),
        "Worker starting",
    );

    let submission = JobSubmission::load(&path)
        .await
        .with_context(|| format!("loading {}", path.display()))?;
    let env = submission.prepare(&config).await?;
    let job_id = env.job_id().to_string();

    let pipeline = Pipeline::standard(config, Arc::new(SystemExecutor));
    let mut context = ExecutionContext::for_environment(env);
    if let Err(e) = pipeline.run(&mut context).await {
        if let Some(status) = stop_orphaned_process(&mut context).await {
            tracing::warn!(job_id = %job_id, status = %status, "Job process stopped");
        }
        return Err(anyhow::Error::new(e).context(format!("job {job_id} failed to start")));
    }

    let report = LaunchReport::from_context(&context)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if options.wait_for_exit {
        let mut child = context.take(keys::JOB_PROCESS)?;
        let status = child.wait().await.context("waiting for job process")?;
        tracing::info!(job_id = %job_id, status = %status, "Job process exited");
        if !status.success() {
            anyhow::bail!("job {job_id} exited with {status}");
        }
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "genie_worker=info,genie_pipeline=info".into());

    // stdout carries the launch report.
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer).init();
    }
}
