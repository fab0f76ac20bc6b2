use std::time::Duration;

use crate::metrics::SessionReport;
use crate::session::SessionState;

/// Divisor for values scaled by 100.
const PERCENT_DIVISOR: u64 = 100;
/// Binary unit step for byte counts.
const BYTE_STEP: u64 = 1_024;
const BYTE_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
/// Microseconds per millisecond.
const US_PER_MS: u128 = 1_000;

/// Human-readable report, one line per entry, rendered to stderr by the
/// runner.
#[must_use]
pub fn summary_lines(report: &SessionReport, target: &str, terminal: SessionState) -> Vec<String> {
    let stats = &report.stats;
    let mut lines = Vec::new();

    lines.push(format!("Target: {}", target));
    lines.push(format!(
        "Session {} after {}",
        terminal,
        format_latency(report.elapsed)
    ));
    lines.push(format!("Total Requests: {}", stats.total_requests));
    lines.push(format!(
        "Successful: {} ({})",
        stats.success_count,
        format_x100(report.success_rate_x100(), "%")
    ));
    lines.push(format!("Failed: {}", stats.fail_count));
    lines.push(format!("Errors: {}", stats.error_count));
    lines.push(format!(
        "Requests/sec: {}",
        format_x100(report.requests_per_sec_x100, "")
    ));
    lines.push(format!(
        "Bytes Sent/Received: {} / {}",
        format_bytes(stats.total_bytes_sent),
        format_bytes(stats.total_bytes_received)
    ));
    lines.push(format!(
        "Transfer/sec: {}/s",
        format_bytes(report.bytes_per_sec_x100.checked_div(PERCENT_DIVISOR).unwrap_or(0))
    ));
    lines.push(format!(
        "Avg Latency: {}",
        report
            .average_latency
            .map_or_else(|| "n/a".to_owned(), format_latency)
    ));
    lines.push(format!(
        "Min/Max Latency: {} / {}",
        format_optional(stats.min_latency),
        format_optional(stats.max_latency)
    ));
    lines.push(format!(
        "P50/P90/P99 Latency: {} / {} / {}",
        format_latency(report.percentiles.p50),
        format_latency(report.percentiles.p90),
        format_latency(report.percentiles.p99)
    ));

    if stats.status_histogram.is_empty() {
        lines.push("Status Codes: none".to_owned());
    } else {
        lines.push("Status Codes:".to_owned());
        for (status, count) in &stats.status_histogram {
            lines.push(format!("  {}: {}", status, count));
        }
    }
    lines
}

fn format_x100(value: u64, suffix: &str) -> String {
    format!(
        "{}.{:02}{}",
        value.checked_div(PERCENT_DIVISOR).unwrap_or(0),
        value.checked_rem(PERCENT_DIVISOR).unwrap_or(0),
        suffix
    )
}

/// Milliseconds with two decimals.
pub(crate) fn format_latency(latency: Duration) -> String {
    let micros = latency.as_micros();
    let whole = micros.checked_div(US_PER_MS).unwrap_or(0);
    let hundredths = micros
        .checked_rem(US_PER_MS)
        .and_then(|rest| rest.checked_div(10))
        .unwrap_or(0);
    format!("{}.{:02}ms", whole, hundredths)
}

fn format_optional(latency: Option<Duration>) -> String {
    latency.map_or_else(|| "n/a".to_owned(), format_latency)
}

/// 1024-based units with two decimals, e.g. `1.50 KiB`.
pub(crate) fn format_bytes(bytes: u64) -> String {
    let mut unit_index = 0_usize;
    let mut divisor: u64 = 1;
    while unit_index.saturating_add(1) < BYTE_UNITS.len()
        && bytes.checked_div(divisor).unwrap_or(0) >= BYTE_STEP
    {
        divisor = divisor.saturating_mul(BYTE_STEP);
        unit_index = unit_index.saturating_add(1);
    }
    let unit = BYTE_UNITS.get(unit_index).copied().unwrap_or("B");
    if unit_index == 0 {
        return format!("{} {}", bytes, unit);
    }
    let scaled = u128::from(bytes)
        .saturating_mul(u128::from(PERCENT_DIVISOR))
        .checked_div(u128::from(divisor))
        .unwrap_or(0);
    let whole = scaled.checked_div(u128::from(PERCENT_DIVISOR)).unwrap_or(0);
    let fraction = scaled.checked_rem(u128::from(PERCENT_DIVISOR)).unwrap_or(0);
    format!("{}.{:02} {}", whole, fraction, unit)
}
