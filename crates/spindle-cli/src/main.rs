use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use serde::Serialize;
use spindle_core::{BoxError, QueueBuilder, QueueStatus, RetryPolicy, Task, TaskHandle};
use tokio::time::sleep;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "spindle")]
#[command(about = "Run a batch of simulated jobs through a Spindle queue")]
#[command(version)]
struct Cli {
    /// Maximum simultaneous jobs (overrides SPINDLE_CONCURRENCY)
    #[arg(long, short)]
    concurrency: Option<usize>,

    /// Number of jobs to submit
    #[arg(long, short = 'n', default_value_t = 8)]
    tasks: usize,

    /// Simulated work per attempt, in milliseconds
    #[arg(long, default_value_t = 20)]
    work_ms: u64,

    /// Every Nth job fails its first attempt (0 disables)
    #[arg(long, default_value_t = 0)]
    fail_every: usize,

    /// Retries for failing jobs
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Submit everything while paused, then start (shows priority order)
    #[arg(long)]
    paused: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, thiserror::Error)]
enum JobError {
    #[error("job {index} failed on attempt {attempt} (simulated)")]
    Simulated { index: usize, attempt: u32 },
}

#[derive(Debug, Serialize)]
struct JobReceipt {
    index: usize,
    attempts: u32,
    finished_order: usize,
}

/// A job that sleeps, then succeeds or fails its first attempt.
#[derive(Clone)]
struct SimulatedJob {
    index: usize,
    work: Duration,
    flaky: bool,
    attempts: Arc<AtomicU32>,
    finished: Arc<AtomicUsize>,
}

impl SimulatedJob {
    async fn attempt(self) -> Result<JobReceipt, JobError> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        sleep(self.work).await;

        if self.flaky && attempt == 1 {
            return Err(JobError::Simulated {
                index: self.index,
                attempt,
            });
        }

        let finished_order = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(JobReceipt {
            index: self.index,
            attempts: attempt,
            finished_order,
        })
    }
}

#[async_trait]
impl Task for SimulatedJob {
    type Output = JobReceipt;

    async fn run(self) -> Result<JobReceipt, BoxError> {
        self.attempt().await.map_err(Into::into)
    }
}

#[derive(Debug, Serialize)]
struct JobRow {
    index: usize,
    priority: i32,
    task_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<JobReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct Report {
    jobs: Vec<JobRow>,
    status: QueueStatus,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spindle=info,spindle_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // (A) Queue を用意（環境変数 → CLI フラグの順で上書き）
    let mut builder = QueueBuilder::from_env()?;
    if let Some(concurrency) = cli.concurrency {
        builder = builder.concurrency(concurrency);
    }
    if cli.paused {
        builder = builder.auto_start(false);
    }
    let queue = builder.build()?;
    queue.on_idle(|| tracing::info!("queue drained"));
    tracing::info!(
        concurrency = queue.concurrency(),
        paused = queue.is_paused(),
        "queue ready"
    );

    // (B) ジョブ投入（priority は 0, 5, 10 の繰り返し）
    let finished = Arc::new(AtomicUsize::new(0));
    let policy = RetryPolicy::new(cli.retries, Duration::from_millis(cli.work_ms));
    let mut submitted: Vec<(usize, i32, TaskHandle<JobReceipt>)> = Vec::with_capacity(cli.tasks);

    for index in 0..cli.tasks {
        let priority = (index % 3) as i32 * 5;
        let job = SimulatedJob {
            index,
            work: Duration::from_millis(cli.work_ms),
            flaky: cli.fail_every > 0 && (index + 1) % cli.fail_every == 0,
            attempts: Arc::new(AtomicU32::new(0)),
            finished: Arc::clone(&finished),
        };

        let handle = if cli.retries > 0 {
            queue.submit_with_priority(policy.wrap(move || job.clone().attempt()), priority)
        } else {
            queue.submit_with_priority(job, priority)
        };
        submitted.push((index, priority, handle));
    }

    if queue.is_paused() {
        tracing::info!(pending = queue.pending_count(), "starting paused queue");
        queue.start();
    }

    // (C) 結果を待つ
    let mut rows = Vec::with_capacity(submitted.len());
    for (index, priority, handle) in submitted {
        let task_id = handle.id().to_string();
        let row = match handle.await {
            Ok(receipt) => JobRow {
                index,
                priority,
                task_id,
                receipt: Some(receipt),
                error: None,
            },
            Err(e) => JobRow {
                index,
                priority,
                task_id,
                receipt: None,
                error: Some(e.to_string()),
            },
        };
        rows.push(row);
    }
    queue.wait_idle().await;

    // (D) レポート出力
    let report = Report {
        jobs: rows,
        status: queue.status(),
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }

    Ok(())
}

fn print_text(report: &Report) {
    println!("{:>5} {:>8} {:>8} {:>8}  result", "job", "priority", "finished", "attempts");
    for row in &report.jobs {
        match (&row.receipt, &row.error) {
            (Some(receipt), _) => println!(
                "{:>5} {:>8} {:>8} {:>8}  ok",
                row.index, row.priority, receipt.finished_order, receipt.attempts
            ),
            (None, Some(error)) => println!(
                "{:>5} {:>8} {:>8} {:>8}  {error}",
                row.index, row.priority, "-", "-"
            ),
            (None, None) => println!("{:>5} {:>8} {:>8} {:>8}  ?", row.index, row.priority, "-", "-"),
        }
    }

    let status = &report.status;
    println!(
        "succeeded={} failed={} cancelled={} pending={} running={}",
        status.succeeded, status.failed, status.cancelled, status.pending, status.running
    );
}
