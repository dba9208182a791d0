mod cli;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};
use tokio::sync::broadcast::{Receiver, error::RecvError};

use cli::{Cli, Command};
use jobflow::{
    Job, JobError, JobEvent, JobFilter, JobId, JobStatus, JobflowConfig, LifecycleEngine,
    Priority, SubmitRequest, telemetry,
};
use ui::JobProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose, cli.json_logs);

    let mut config = match &cli.config {
        Some(path) => JobflowConfig::load_from(path)?,
        None => JobflowConfig::load()?,
    };
    config = config.with_webhook_override(cli.webhook_url.clone());
    if let Some(delay_ms) = cli.delay_ms {
        config.execution_delay_ms = delay_ms;
    }

    let engine = LifecycleEngine::from_config(&config)?;

    match cli.command {
        Command::Run {
            task,
            priority,
            payload,
        } => run_one(&engine, task, priority.into(), payload).await,
        Command::Demo => demo(&engine).await,
    }
}

async fn run_one(
    engine: &LifecycleEngine,
    task: String,
    priority: Priority,
    payload: Option<String>,
) -> Result<()> {
    let payload = payload
        .map(|raw| serde_json::from_str::<Value>(&raw))
        .transpose()
        .context("--payload must be valid JSON")?;

    let mut events = engine.subscribe();
    let job = engine.submit(SubmitRequest {
        task_name: task,
        priority: priority.to_string(),
        payload,
    })?;

    let progress = JobProgress::start(&job.task_name);
    let ack = engine.trigger(job.id).await?;
    tracing::debug!(job_id = %ack.job_id, message = %ack.message, "trigger acknowledged");

    let settled = watch(engine, &mut events, job.id, Some(&progress)).await?;
    progress.finish(&settled);
    ui::print_job(&settled);
    Ok(())
}

async fn demo(engine: &LifecycleEngine) -> Result<()> {
    let jobs = [
        ("Send Email", "High", json!({"to": "a@b.com"})),
        ("Generate Report", "Medium", json!({"month": "2024-05"})),
        ("Resize Image", "Low", json!({"width": 640})),
    ];
    let mut submitted = Vec::new();
    for (task, priority, payload) in jobs {
        let job = engine.submit(SubmitRequest::new(task, priority, payload))?;
        println!("submitted job {} ({}, {})", job.id, job.task_name, job.priority);
        submitted.push(job);
    }

    let mut events = engine.subscribe();
    let mut second_events = engine.subscribe();
    let first = submitted[0].id;
    let second = submitted[1].id;

    let ack = engine.trigger(first).await?;
    println!("{}: {}", ack.message, ack.job_id);

    match engine.trigger(first).await {
        Err(err @ JobError::InvalidState { .. }) => println!("second trigger rejected: {err}"),
        other => anyhow::bail!("duplicate trigger was not rejected: {other:?}"),
    }

    let ack = engine.trigger(second).await?;
    println!("{}: {}", ack.message, ack.job_id);
    println!(
        "job {first} is {} right after the trigger",
        engine.get(first)?.status
    );

    let progress = JobProgress::start("demo jobs");
    watch(engine, &mut events, first, Some(&progress)).await?;
    watch(engine, &mut second_events, second, None).await?;
    progress.finish(&engine.get(first)?);

    println!();
    ui::print_table(&engine.list(&JobFilter::all())?);
    println!();
    println!("completed only:");
    ui::print_table(&engine.list(&JobFilter::all().with_status(JobStatus::Completed))?);
    Ok(())
}

/// Follows `id` on the event stream until it has failed, or completed and
/// had its notification attempted. Returns the stored record.
async fn watch(
    engine: &LifecycleEngine,
    events: &mut Receiver<JobEvent>,
    id: JobId,
    progress: Option<&JobProgress>,
) -> Result<Job> {
    loop {
        match events.recv().await {
            Ok(event) if event.job_id() == id => match event {
                JobEvent::Transitioned { transition, .. } => {
                    if let Some(progress) = progress {
                        progress.transition(&transition);
                    }
                    if transition.to == JobStatus::Failed {
                        break;
                    }
                }
                JobEvent::Notified { outcome, .. } => {
                    if let Some(progress) = progress {
                        progress.notified(&outcome);
                    }
                    break;
                }
            },
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event stream lagged");
                if engine.get(id)?.status.is_terminal() {
                    break;
                }
            }
            Err(RecvError::Closed) => break,
        }
    }
    Ok(engine.get(id)?)
}
