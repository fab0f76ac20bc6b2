//! Fixed-size worker pool sharing one transport, one token, and one collector.
mod source;
mod worker;


use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::RunConfig;
use crate::error::{AppError, AppResult, MetricsError, ValidationError};
use crate::http::Transport;
use crate::metrics::{
    AggregateStats, LatencyHistogram, LatencyPercentiles, Outcome, StatsCollector,
    SuccessPredicate,
};

pub use source::{TaskFeeder, TaskQueue, TaskSource};
use worker::Worker;

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub interval: Duration,
    pub success: SuccessPredicate,
}

impl From<&RunConfig> for PoolConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            request_timeout: config.request_timeout,
            interval: config.interval,
            success: config.success,
        }
    }
}

pub struct WorkerPool {
    token: CancellationToken,
    stats: Arc<StatsCollector>,
    handles: Vec<JoinHandle<LatencyHistogram>>,
    drained_rx: mpsc::Receiver<()>,
    latency: Option<LatencyHistogram>,
    joined: bool,
}

impl WorkerPool {
    /// Spawns exactly `config.concurrency` workers. Must be called inside a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when concurrency is zero or a latency histogram
    /// cannot be created. Nothing is spawned in either case.
    pub fn start(
        config: &PoolConfig,
        source: TaskSource,
        transport: Arc<dyn Transport>,
    ) -> AppResult<Self> {
        if config.concurrency == 0 {
            return Err(AppError::validation(ValidationError::ZeroConcurrency));
        }
        let mut histograms = Vec::with_capacity(config.concurrency);
        for _ in 0..config.concurrency {
            histograms.push(LatencyHistogram::new()?);
        }

        let token = CancellationToken::new();
        let stats = Arc::new(StatsCollector::new());
        let (alive_tx, drained_rx) = mpsc::channel::<()>(1);

        let handles = histograms
            .into_iter()
            .enumerate()
            .map(|(id, latency)| {
                let worker = Worker {
                    id,
                    source: source.clone(),
                    transport: Arc::clone(&transport),
                    stats: Arc::clone(&stats),
                    token: token.clone(),
                    request_timeout: config.request_timeout,
                    interval: config.interval,
                    success: config.success,
                    latency,
                    alive: alive_tx.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        drop(alive_tx);
        info!("Started {} worker(s)", config.concurrency);

        Ok(Self {
            token,
            stats,
            handles,
            drained_rx,
            latency: None,
            joined: false,
        })
    }

    /// Live collector, for progress reads while the pool runs.
    #[must_use]
    pub const fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Resolves once every worker has returned on its own. In uniform mode
    /// that only happens after cancellation.
    pub async fn drained(&mut self) {
        while self.drained_rx.recv().await.is_some() {}
    }

    /// Cancels and joins every worker. A second call is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when worker latency histograms cannot be merged.
    pub async fn stop(&mut self) -> AppResult<()> {
        self.token.cancel();
        if self.joined {
            return Ok(());
        }

        let merged = LatencyHistogram::new()?;
        let handles = std::mem::take(&mut self.handles);
        let started = Instant::now();
        let joined = join_workers(handles, &self.stats, merged).await;
        debug!("Workers joined in {:?}", started.elapsed());
        self.joined = true;
        self.latency = Some(joined?);
        Ok(())
    }

    /// Frozen totals and merged percentiles.
    ///
    /// # Errors
    ///
    /// Returns an error when called before [`WorkerPool::stop`] has joined
    /// every worker.
    pub fn snapshot(&self) -> AppResult<(AggregateStats, LatencyPercentiles)> {
        match (self.joined, self.latency.as_ref()) {
            (true, Some(latency)) => Ok((self.stats.snapshot(), latency.percentiles())),
            (true, None) | (false, _) => Err(AppError::metrics(
                MetricsError::SnapshotWhileRunning {
                    running: self.handles.len(),
                },
            )),
        }
    }
}

/// Awaits every handle, even after a merge fails, so no worker outlives the
/// join. The first merge error is returned.
async fn join_workers(
    handles: Vec<JoinHandle<LatencyHistogram>>,
    stats: &StatsCollector,
    mut merged: LatencyHistogram,
) -> AppResult<LatencyHistogram> {
    let mut first_error = None;
    for handle in handles {
        match handle.await {
            Ok(latency) => {
                if let Err(err) = merged.merge(&latency) {
                    error!("Failed to merge worker latency: {}", err);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
            Err(err) => {
                error!("Worker task failed: {}", err);
                stats.record(&Outcome::transport_error(Duration::ZERO, Instant::now()));
            }
        }
    }
    first_error.map_or(Ok(merged), Err)
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
