//! End-to-end QuantForce workflow.
//!
//! Authenticates, finds or creates a project, uploads a CSV dataset, marks
//! the target column, computes binning for every column, downloads the
//! generated transformation code, then lets the service transform the
//! dataset and downloads the result.
//!
//! Credentials come from `--user`/`--password` or the `QFUser`/`QFPassword`
//! environment variables (a `.env` file is honoured). Ctrl-C abandons the
//! job currently being waited on.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use quantforce_client::{
    ALL_COLUMNS, AUTO_BINNING, AuthRequest, CancellationToken, ClientConfig, DEFAULT_ENDPOINT,
    ExportFormat, JobHandle, JobOutcome, ProjectClient, QuantForceClient, UTF8_CODEPAGE,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Run the QuantForce demo workflow")]
struct Args {
    /// Account e-mail.
    #[arg(short, long, env = "QFUser")]
    user: String,
    #[arg(short, long, env = "QFPassword", hide_env_values = true)]
    password: String,
    #[arg(long, env = "QFEndpoint", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    #[arg(long, default_value = "demo01")]
    project: String,
    /// CSV file to analyse.
    #[arg(long, default_value = "Telco_customer_churn_v1.csv")]
    data: PathBuf,
    /// Column to use as the binning target.
    #[arg(long, default_value = "Churn_Value")]
    target: String,
    #[arg(long, default_value_t = 20)]
    max_bins: u32,
    /// Where downloaded artifacts are written.
    #[arg(long, default_value = "output")]
    output: PathBuf,
    /// Accept invalid TLS certificates.
    #[arg(long)]
    insecure: bool,
}

/// Wait for `job`, logging progress, and fail unless it succeeded.
async fn finish(
    project: &ProjectClient<'_>,
    step: &str,
    job: JobHandle,
    cancel: &CancellationToken,
) -> anyhow::Result<JobHandle> {
    let job = project
        .orchestrator()
        .with_cancellation(cancel.clone())
        .await_completion(
            job,
            |id| project.task_url(id),
            |h| info!(step, status = %h.status, percent = h.progress(), "task status"),
        )
        .await?;

    match job.outcome() {
        JobOutcome::Succeeded => Ok(job),
        JobOutcome::Failed(failure) => {
            if let Some(stack) = &failure.stack {
                warn!(step, %stack, "server stack");
            }
            bail!("{step} failed: {failure}")
        }
        JobOutcome::Stopped
        | JobOutcome::Killed
        | JobOutcome::Unrecognized(_)
        | JobOutcome::InProgress => {
            bail!("{step} ended with status {}", job.status)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, abandoning current wait");
            on_ctrl_c.cancel();
        }
    });

    let config = ClientConfig::new(args.endpoint.as_str()).accept_invalid_certs(args.insecure);
    let mut client = QuantForceClient::new(config)?;
    client
        .authenticate(&AuthRequest::md5(args.user.as_str(), &args.password))
        .await
        .context("authentication failed")?;

    let project = client.find_or_create_project(&args.project).await?;
    info!(id = %project.id, name = %project.name, uri = ?project.uri, "project ready");
    let scoped = client.project(&project)?;

    // Upload the dataset and wait for ingestion.
    let data = tokio::fs::read(&args.data)
        .await
        .with_context(|| format!("cannot read {}", args.data.display()))?;
    let job = scoped.upload_dataset(data.clone(), UTF8_CODEPAGE).await?;
    finish(&scoped, "dataset", job, &cancel).await?;

    // Requalify columns around the target.
    let mut dataset = scoped.dataset().await?;
    if !dataset.set_target(&args.target) {
        bail!("dataset has no column named {}", args.target);
    }
    for column in &dataset.columns {
        info!(column = %column.name, kind = %column.column_type, "column");
    }
    scoped.update_dataset(&dataset).await?;

    // Binning for every column.
    let job = scoped.create_binning(ALL_COLUMNS, args.max_bins).await?;
    finish(&scoped, "binning", job, &cancel).await?;
    let binning = scoped.binning(ALL_COLUMNS, AUTO_BINNING).await?;
    for view in &binning.all {
        info!(column = %view.column_name, bins = view.bins.len(), "binning");
    }

    // Generated transformation code.
    tokio::fs::create_dir_all(&args.output).await?;
    scoped
        .export(&ExportFormat::Python, &args.output.join("transform.py"))
        .await?;
    scoped
        .export(&ExportFormat::Excel, &args.output.join("transform.xlsx"))
        .await?;

    // Server-side transformation of the same data.
    let job = scoped.deploy_dataset(data, UTF8_CODEPAGE).await?;
    finish(&scoped, "deploy", job, &cancel).await?;
    let target = args.output.join("data_t.csv");
    scoped.export(&ExportFormat::Transform, &target).await?;
    info!(path = %target.display(), "transformed data downloaded");

    Ok(())
}
