use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::yield_now;
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::http::{TaskSpec, Transport};
use crate::metrics::{LatencyHistogram, Outcome, StatsCollector, SuccessPredicate};

use super::source::TaskSource;

pub(super) struct Worker {
    pub(super) id: usize,
    pub(super) source: TaskSource,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) stats: Arc<StatsCollector>,
    pub(super) token: CancellationToken,
    pub(super) request_timeout: Duration,
    pub(super) interval: Duration,
    pub(super) success: SuccessPredicate,
    pub(super) latency: LatencyHistogram,
    /// Dropped when the worker returns; the pool watches for all of them.
    pub(super) alive: mpsc::Sender<()>,
}

impl Worker {
    pub(super) async fn run(mut self) -> LatencyHistogram {
        let mut requests: u64 = 0;
        loop {
            if self.token.is_cancelled() {
                break;
            }
            let Some(task) = self.source.next_task(&self.token).await else {
                break;
            };

            let outcome = match AssertUnwindSafe(self.attempt(&task)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_panic) => {
                    error!("Worker {} recovered from a panic while issuing a request", self.id);
                    Outcome::transport_error(Duration::ZERO, Instant::now())
                }
            };
            self.stats.record(&outcome);
            if outcome.status_code.is_some()
                && let Err(err) = self.latency.record(outcome.latency)
            {
                debug!("Worker {} dropped a latency sample: {}", self.id, err);
            }
            requests = requests.saturating_add(1);

            if self.interval.is_zero() {
                // Transports may complete without suspending.
                yield_now().await;
            } else {
                tokio::select! {
                    () = self.token.cancelled() => break,
                    () = sleep(self.interval) => {}
                }
            }
        }
        debug!("Worker {} exiting after {} request(s)", self.id, requests);
        drop(self.alive);
        self.latency
    }

    async fn attempt(&self, task: &TaskSpec) -> Outcome {
        let request = task.build_request();
        let started = Instant::now();
        let result = timeout(self.request_timeout, self.transport.execute(request)).await;
        let latency = started.elapsed();
        match result {
            Ok(Ok(response)) => Outcome::response(
                self.success,
                response.status,
                task.request_size(),
                response.bytes_received,
                latency,
                started,
            ),
            Ok(Err(err)) => {
                debug!("Worker {} request failed: {}", self.id, err);
                Outcome::transport_error(latency, started)
            }
            Err(_elapsed) => {
                debug!(
                    "Worker {} request timed out after {:?}",
                    self.id, self.request_timeout
                );
                Outcome::transport_error(latency, started)
            }
        }
    }
}
