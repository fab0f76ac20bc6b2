use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{RunConfig, TargetPlan};
use crate::error::AppResult;
use crate::http::{TaskSpec, TransportSettings, build_transport};
use crate::metrics::SessionReport;
use crate::pool::{TaskFeeder, TaskSource};
use crate::session::{SessionController, SessionState};
use crate::shutdown::ShutdownSender;

use super::{export, progress, summary};

/// Queue slots per worker in queued mode.
const QUEUE_SLOTS_PER_WORKER: usize = 2;

pub struct RunOutcome {
    pub terminal: SessionState,
    pub report: SessionReport,
}

/// Runs one session against the configured target(s), prints the summary to
/// stderr, and writes the JSON export when one was requested.
///
/// # Errors
///
/// Returns an error when the transport cannot be built, the session fails to
/// start or join, or the export cannot be written.
pub async fn run_local(config: &RunConfig, shutdown_tx: &ShutdownSender) -> AppResult<RunOutcome> {
    let transport = build_transport(&TransportSettings::from(config))?;
    let (source, feeder) = build_task_source(config);

    let mut session = SessionController::from_config(config, transport, source, shutdown_tx);
    session.start()?;

    let feeder_handle = feeder.map(|feed| tokio::spawn(feed.run()));
    let progress_handle = session
        .stats()
        .map(|stats| progress::setup_progress_logger(stats, config.duration));

    let waited = session.wait().await;
    for handle in [progress_handle, feeder_handle].into_iter().flatten() {
        handle.abort();
    }
    let terminal = waited?;
    let report = session.report()?;

    let target = config.display_target();
    for line in summary::summary_lines(&report, &target, terminal) {
        eprintln!("{}", line);
    }

    if let Some(path) = config.export_json.as_deref() {
        export::export_json(path, &report, &target, terminal).await?;
        info!("Report written to {}", path);
    }

    Ok(RunOutcome { terminal, report })
}

/// Fills a task queue `passes` times, then closes it by dropping the feeder.
pub struct QueueFeed {
    feeder: TaskFeeder,
    tasks: Vec<Arc<TaskSpec>>,
    passes: usize,
}

impl QueueFeed {
    pub async fn run(self) {
        let mut pushed: u64 = 0;
        for pass in 0..self.passes {
            for task in &self.tasks {
                if !self.feeder.push(Arc::clone(task)).await {
                    debug!("Queue closed after {} task(s)", pushed);
                    return;
                }
                pushed = pushed.saturating_add(1);
            }
            debug!(
                "Queue pass {} of {} enqueued",
                pass.saturating_add(1),
                self.passes
            );
        }
        debug!("Queue fed with {} task(s); closing", pushed);
    }
}

/// Task source for the configured targets, plus the feed to spawn in queued
/// mode.
#[must_use]
pub fn build_task_source(config: &RunConfig) -> (TaskSource, Option<QueueFeed>) {
    match &config.targets {
        TargetPlan::Single(url) => (TaskSource::uniform(task_for(config, url.clone())), None),
        TargetPlan::Queue { urls, passes } => {
            let capacity = config.concurrency.saturating_mul(QUEUE_SLOTS_PER_WORKER);
            let (feeder, source) = TaskSource::queued(capacity);
            let tasks: Vec<Arc<TaskSpec>> = urls
                .iter()
                .map(|url| Arc::new(task_for(config, url.clone())))
                .collect();
            let feed = QueueFeed {
                feeder,
                tasks,
                passes: *passes,
            };
            (source, Some(feed))
        }
    }
}

fn task_for(config: &RunConfig, url: reqwest::Url) -> TaskSpec {
    TaskSpec::new(
        url,
        config.method,
        &config.headers,
        config.body.clone(),
        config.disable_cache,
    )
}
