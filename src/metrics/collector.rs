use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::outcome::{Classification, Outcome};
use super::types::AggregateStats;

/// Status codes above this share the last bucket.
const MAX_STATUS: u16 = 999;

/// Running totals shared by every worker of one session.
///
/// Every update is an independent relaxed atomic, so recording never waits
/// on other writers and the order of records does not matter. The counters
/// are only read as a consistent set once all writers have stopped.
#[derive(Debug)]
pub struct StatsCollector {
    total: AtomicU64,
    success: AtomicU64,
    fail: AtomicU64,
    error: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    latency_sum_nanos: AtomicU64,
    min_latency_nanos: AtomicU64,
    max_latency_nanos: AtomicU64,
    statuses: Box<[AtomicU64]>,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCollector {
    #[must_use]
    pub fn new() -> Self {
        let statuses = (0..=MAX_STATUS).map(|_| AtomicU64::new(0)).collect();
        Self {
            total: AtomicU64::new(0),
            success: AtomicU64::new(0),
            fail: AtomicU64::new(0),
            error: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            latency_sum_nanos: AtomicU64::new(0),
            min_latency_nanos: AtomicU64::new(u64::MAX),
            max_latency_nanos: AtomicU64::new(0),
            statuses,
        }
    }

    pub fn record(&self, outcome: &Outcome) {
        // Classification first so a concurrent progress read never sees
        // more totals than classified requests.
        match outcome.classification {
            Classification::Success => self.success.fetch_add(1, Ordering::Relaxed),
            Classification::Failure => self.fail.fetch_add(1, Ordering::Relaxed),
            Classification::TransportError => self.error.fetch_add(1, Ordering::Relaxed),
        };
        self.total.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(outcome.bytes_sent, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(outcome.bytes_received, Ordering::Relaxed);

        if let Some(status) = outcome.status_code {
            let nanos = u64::try_from(outcome.latency.as_nanos()).unwrap_or(u64::MAX);
            self.latency_sum_nanos.fetch_add(nanos, Ordering::Relaxed);
            self.min_latency_nanos.fetch_min(nanos, Ordering::Relaxed);
            self.max_latency_nanos.fetch_max(nanos, Ordering::Relaxed);
            if let Some(bucket) = self.statuses.get(usize::from(status.min(MAX_STATUS))) {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Live request count for progress output; not part of any snapshot.
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Copies the counters. Callers must ensure no worker is still recording.
    pub(crate) fn snapshot(&self) -> AggregateStats {
        let min_nanos = self.min_latency_nanos.load(Ordering::Relaxed);
        let has_responses = min_nanos != u64::MAX;

        let mut status_histogram = BTreeMap::new();
        for (code, bucket) in (0..=MAX_STATUS).zip(self.statuses.iter()) {
            let count = bucket.load(Ordering::Relaxed);
            if count > 0 {
                status_histogram.insert(code, count);
            }
        }

        AggregateStats {
            total_requests: self.total.load(Ordering::Relaxed),
            success_count: self.success.load(Ordering::Relaxed),
            fail_count: self.fail.load(Ordering::Relaxed),
            error_count: self.error.load(Ordering::Relaxed),
            total_bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            total_bytes_received: self.bytes_received.load(Ordering::Relaxed),
            total_latency: Duration::from_nanos(self.latency_sum_nanos.load(Ordering::Relaxed)),
            min_latency: has_responses.then(|| Duration::from_nanos(min_nanos)),
            max_latency: has_responses
                .then(|| Duration::from_nanos(self.max_latency_nanos.load(Ordering::Relaxed))),
            status_histogram,
        }
    }
}
