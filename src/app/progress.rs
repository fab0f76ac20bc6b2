use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::metrics::StatsCollector;

const PROGRESS_TICK: Duration = Duration::from_secs(1);

/// Logs the live request counter once per tick at `debug` level. The caller
/// aborts the returned task when the session ends.
pub(crate) fn setup_progress_logger(
    stats: Arc<StatsCollector>,
    target: Duration,
) -> tokio::task::JoinHandle<()> {
    let started = Instant::now();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PROGRESS_TICK);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            debug!("{}", progress_line(stats.total_requests(), started.elapsed(), target));
        }
    })
}

pub(crate) fn progress_line(requests: u64, elapsed: Duration, target: Duration) -> String {
    let elapsed_tenths = elapsed.as_millis().checked_div(100).unwrap_or(0);
    format!(
        "Progress: {} request(s) | {}.{}s / {}s",
        requests,
        elapsed_tenths.checked_div(10).unwrap_or(0),
        elapsed_tenths.checked_rem(10).unwrap_or(0),
        target.as_secs()
    )
}
