use std::time::Duration;

use hdrhistogram::Histogram;

use crate::error::{AppError, AppResult, MetricsError};

use super::types::LatencyPercentiles;

/// Per-worker latency histogram in microseconds, merged once the pool joins.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    hist: Histogram<u64>,
}

impl LatencyHistogram {
    /// Create a new latency histogram.
    ///
    /// # Errors
    ///
    /// Returns an error if the histogram cannot be created.
    pub fn new() -> AppResult<Self> {
        let hist = Histogram::<u64>::new(3).map_err(|err| {
            AppError::metrics(MetricsError::Histogram {
                context: "create",
                source: Box::new(err),
            })
        })?;
        Ok(Self { hist })
    }

    /// Fixed-range histogram; merging samples above `max_micros` fails.
    #[cfg(test)]
    pub(crate) fn bounded(max_micros: u64) -> AppResult<Self> {
        let hist = Histogram::<u64>::new_with_max(max_micros, 3).map_err(|err| {
            AppError::metrics(MetricsError::Histogram {
                context: "create",
                source: Box::new(err),
            })
        })?;
        Ok(Self { hist })
    }

    /// Record one latency sample.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be recorded.
    pub fn record(&mut self, latency: Duration) -> AppResult<()> {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX).max(1);
        self.hist.record(micros).map_err(|err| {
            AppError::metrics(MetricsError::Histogram {
                context: "record",
                source: Box::new(err),
            })
        })
    }

    /// Merge another histogram into this one.
    ///
    /// # Errors
    ///
    /// Returns an error if the merge fails.
    pub fn merge(&mut self, other: &LatencyHistogram) -> AppResult<()> {
        self.hist.add(&other.hist).map_err(|err| {
            AppError::metrics(MetricsError::Histogram {
                context: "merge",
                source: Box::new(err),
            })
        })
    }

    #[must_use]
    pub fn percentiles(&self) -> LatencyPercentiles {
        if self.count() == 0 {
            return LatencyPercentiles::default();
        }
        LatencyPercentiles {
            p50: Duration::from_micros(self.hist.value_at_quantile(0.5)),
            p90: Duration::from_micros(self.hist.value_at_quantile(0.9)),
            p99: Duration::from_micros(self.hist.value_at_quantile(0.99)),
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.hist.len()
    }
}
