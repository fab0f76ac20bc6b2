use std::time::Duration;

use super::types::{AggregateStats, LatencyPercentiles};

/// Snapshot plus the rates derived from it at report time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub stats: AggregateStats,
    pub percentiles: LatencyPercentiles,
    pub elapsed: Duration,
    /// Requests per second, scaled by 100.
    pub requests_per_sec_x100: u64,
    /// Received bytes per second, scaled by 100.
    pub bytes_per_sec_x100: u64,
    /// `None` when no response arrived.
    pub average_latency: Option<Duration>,
}

impl SessionReport {
    #[must_use]
    pub fn new(stats: AggregateStats, percentiles: LatencyPercentiles, elapsed: Duration) -> Self {
        let requests_per_sec_x100 = per_second_x100(stats.total_requests, elapsed);
        let bytes_per_sec_x100 = per_second_x100(stats.total_bytes_received, elapsed);
        let average_latency = average(stats.total_latency, stats.responses());
        Self {
            stats,
            percentiles,
            elapsed,
            requests_per_sec_x100,
            bytes_per_sec_x100,
            average_latency,
        }
    }

    /// Share of all requests that succeeded, scaled by 100.
    #[must_use]
    pub fn success_rate_x100(&self) -> u64 {
        ratio_x100(self.stats.success_count, self.stats.total_requests)
    }
}

fn per_second_x100(count: u64, elapsed: Duration) -> u64 {
    let micros = elapsed.as_micros();
    if micros == 0 {
        return 0;
    }
    let scaled = u128::from(count)
        .saturating_mul(100_000_000)
        .checked_div(micros)
        .unwrap_or(0);
    u64::try_from(scaled).map_or(u64::MAX, |value| value)
}

fn ratio_x100(part: u64, whole: u64) -> u64 {
    let scaled = u128::from(part)
        .saturating_mul(10_000)
        .checked_div(u128::from(whole))
        .unwrap_or(0);
    u64::try_from(scaled).map_or(u64::MAX, |value| value)
}

fn average(total: Duration, count: u64) -> Option<Duration> {
    let nanos = total.as_nanos().checked_div(u128::from(count))?;
    Some(Duration::from_nanos(
        u64::try_from(nanos).map_or(u64::MAX, |value| value),
    ))
}
