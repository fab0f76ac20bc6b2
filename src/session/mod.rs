//! Session lifecycle: `Idle -> Running -> {Completed, Cancelled} -> Reported`.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::{AppError, AppResult, SessionStateKind, ValidationError};
use crate::http::Transport;
use crate::metrics::{SessionReport, StatsCollector};
use crate::pool::{PoolConfig, TaskSource, WorkerPool};
use crate::shutdown::{ShutdownReceiver, ShutdownSender};

pub use crate::error::SessionStateKind as SessionState;

/// Deadline used when the configured duration overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Asks a running session to stop early. Cheap to clone and usable from
/// any task while [`SessionController::wait`] is pending.
#[derive(Debug, Clone)]
pub struct Terminator {
    tx: ShutdownSender,
}

impl Terminator {
    pub fn terminate(&self) {
        drop(self.tx.send(()));
    }
}

pub struct SessionController {
    pool_config: PoolConfig,
    duration: Duration,
    transport: Arc<dyn Transport>,
    source: Option<TaskSource>,
    shutdown_tx: ShutdownSender,
    shutdown_rx: ShutdownReceiver,
    state: SessionState,
    pool: Option<WorkerPool>,
    started_at: Option<Instant>,
    elapsed: Duration,
}

impl SessionController {
    /// Subscribes to `shutdown_tx` right away, so an interrupt sent between
    /// construction and [`SessionController::wait`] is not lost.
    #[must_use]
    pub fn new(
        pool_config: PoolConfig,
        duration: Duration,
        transport: Arc<dyn Transport>,
        source: TaskSource,
        shutdown_tx: &ShutdownSender,
    ) -> Self {
        Self {
            pool_config,
            duration,
            transport,
            source: Some(source),
            shutdown_tx: shutdown_tx.clone(),
            shutdown_rx: shutdown_tx.subscribe(),
            state: SessionState::Idle,
            pool: None,
            started_at: None,
            elapsed: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn from_config(
        config: &RunConfig,
        transport: Arc<dyn Transport>,
        source: TaskSource,
        shutdown_tx: &ShutdownSender,
    ) -> Self {
        Self::new(
            PoolConfig::from(config),
            config.duration,
            transport,
            source,
            shutdown_tx,
        )
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn terminator(&self) -> Terminator {
        Terminator {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Live collector while running; `None` before start.
    #[must_use]
    pub fn stats(&self) -> Option<Arc<StatsCollector>> {
        self.pool.as_ref().map(|pool| Arc::clone(pool.stats()))
    }

    /// Spawns the worker pool and arms the deadline.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not idle or the pool rejects its
    /// configuration.
    pub fn start(&mut self) -> AppResult<()> {
        self.expect_state(SessionState::Idle)?;
        let source = self
            .source
            .take()
            .ok_or_else(|| invalid_state(SessionState::Idle, self.state))?;
        let pool = WorkerPool::start(&self.pool_config, source, Arc::clone(&self.transport))?;
        self.pool = Some(pool);
        self.started_at = Some(Instant::now());
        self.state = SessionState::Running;
        info!(
            "Session running: {} worker(s) for {:?}",
            self.pool_config.concurrency, self.duration
        );
        Ok(())
    }

    /// Waits for the deadline, an interrupt, or the pool draining, then joins
    /// every worker.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not running or the join fails.
    pub async fn wait(&mut self) -> AppResult<SessionState> {
        self.expect_state(SessionState::Running)?;
        let started_at = self.started_at.unwrap_or_else(Instant::now);
        let deadline = started_at
            .checked_add(self.duration)
            .or_else(|| started_at.checked_add(FAR_FUTURE))
            .unwrap_or(started_at);
        let shutdown_rx = &mut self.shutdown_rx;
        let pool = self
            .pool
            .as_mut()
            .ok_or_else(|| invalid_state(SessionState::Running, SessionState::Idle))?;

        let next = tokio::select! {
            () = sleep_until(deadline) => {
                debug!("Deadline reached");
                SessionState::Completed
            }
            _ = shutdown_rx.recv() => {
                debug!("Shutdown requested");
                SessionState::Cancelled
            }
            () = pool.drained() => {
                debug!("Task queue drained");
                SessionState::Completed
            }
        };

        self.finish(next).await?;
        Ok(next)
    }

    /// Stops a running session right away and joins its workers.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not running or the join fails.
    pub async fn terminate(&mut self) -> AppResult<()> {
        self.expect_state(SessionState::Running)?;
        self.finish(SessionState::Cancelled).await
    }

    /// Builds the final report from the frozen snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error unless the session has completed or been cancelled.
    pub fn report(&mut self) -> AppResult<SessionReport> {
        if !matches!(
            self.state,
            SessionState::Completed | SessionState::Cancelled
        ) {
            return Err(invalid_state(SessionState::Completed, self.state));
        }
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| invalid_state(SessionState::Completed, self.state))?;
        let (stats, percentiles) = pool.snapshot()?;
        self.state = SessionState::Reported;
        Ok(SessionReport::new(stats, percentiles, self.elapsed))
    }

    /// Start, wait, and report in one call.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Self::start`], [`Self::wait`], or
    /// [`Self::report`].
    pub async fn run(mut self) -> AppResult<(SessionState, SessionReport)> {
        self.start()?;
        let terminal = self.wait().await?;
        let report = self.report()?;
        Ok((terminal, report))
    }

    async fn finish(&mut self, next: SessionState) -> AppResult<()> {
        if let Some(pool) = self.pool.as_mut() {
            pool.stop().await?;
        }
        self.elapsed = self
            .started_at
            .map_or(Duration::ZERO, |started| started.elapsed());
        self.state = next;
        info!("Session {} after {:?}", next, self.elapsed);
        Ok(())
    }

    fn expect_state(&self, expected: SessionState) -> AppResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(invalid_state(expected, self.state))
        }
    }
}

fn invalid_state(expected: SessionStateKind, actual: SessionStateKind) -> AppError {
    AppError::validation(ValidationError::InvalidSessionState { expected, actual })
}
