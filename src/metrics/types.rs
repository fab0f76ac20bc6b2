use std::collections::BTreeMap;
use std::time::Duration;

/// Frozen totals read from a [`super::StatsCollector`] after the pool joins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_requests: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub error_count: u64,
    pub total_bytes_sent: u64,
    pub total_bytes_received: u64,
    /// Summed over responses only; transport errors carry no latency.
    pub total_latency: Duration,
    /// `None` until at least one response arrived.
    pub min_latency: Option<Duration>,
    pub max_latency: Option<Duration>,
    pub status_histogram: BTreeMap<u16, u64>,
}

impl AggregateStats {
    /// Requests that produced a status code.
    #[must_use]
    pub const fn responses(&self) -> u64 {
        self.success_count.saturating_add(self.fail_count)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyPercentiles {
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
}
