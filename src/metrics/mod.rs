//! Outcome classification, lock-free aggregation, and derived report.
mod collector;
mod histogram;
mod outcome;
mod report;
mod types;


pub use collector::StatsCollector;
pub use histogram::LatencyHistogram;
pub use outcome::{Classification, Outcome, SuccessPredicate};
pub use report::SessionReport;
pub use types::{AggregateStats, LatencyPercentiles};
