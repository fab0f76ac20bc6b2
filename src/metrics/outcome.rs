use std::time::Duration;

use tokio::time::Instant;

/// Which response statuses count as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessPredicate {
    Exact(u16),
    AnyTwoXx,
}

impl Default for SuccessPredicate {
    fn default() -> Self {
        SuccessPredicate::Exact(200)
    }
}

impl SuccessPredicate {
    #[must_use]
    pub fn matches(self, status: u16) -> bool {
        match self {
            SuccessPredicate::Exact(expected) => status == expected,
            SuccessPredicate::AnyTwoXx => (200..300).contains(&status),
        }
    }
}

impl std::fmt::Display for SuccessPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuccessPredicate::Exact(status) => write!(f, "status == {}", status),
            SuccessPredicate::AnyTwoXx => f.write_str("any 2xx"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Failure,
    TransportError,
}

/// Result of one attempt. Built once by a worker and recorded once.
#[derive(Debug, Clone, Copy)]
pub struct Outcome {
    pub classification: Classification,
    pub status_code: Option<u16>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub latency: Duration,
    pub timestamp: Instant,
}

impl Outcome {
    #[must_use]
    pub fn response(
        predicate: SuccessPredicate,
        status: u16,
        bytes_sent: u64,
        bytes_received: u64,
        latency: Duration,
        timestamp: Instant,
    ) -> Self {
        let classification = if predicate.matches(status) {
            Classification::Success
        } else {
            Classification::Failure
        };
        Self {
            classification,
            status_code: Some(status),
            bytes_sent,
            bytes_received,
            latency,
            timestamp,
        }
    }

    /// Transport-level failure: no status and no bytes on either side.
    #[must_use]
    pub const fn transport_error(latency: Duration, timestamp: Instant) -> Self {
        Self {
            classification: Classification::TransportError,
            status_code: None,
            bytes_sent: 0,
            bytes_received: 0,
            latency,
            timestamp,
        }
    }
}
