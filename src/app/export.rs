use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{AppError, AppResult, MetricsError};
use crate::metrics::SessionReport;
use crate::session::SessionState;

/// Writes the final report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error when the file cannot be created or written.
pub async fn export_json(
    path: &str,
    report: &SessionReport,
    target: &str,
    terminal: SessionState,
) -> AppResult<()> {
    let payload = report_json(report, target, terminal);
    let json = serde_json::to_vec_pretty(&payload)?;
    write_all(path, &json).await.map_err(|err| {
        AppError::metrics(MetricsError::WriteReport {
            path: path.to_owned(),
            source: err,
        })
    })
}

async fn write_all(path: &str, bytes: &[u8]) -> Result<(), std::io::Error> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub(crate) fn report_json(
    report: &SessionReport,
    target: &str,
    terminal: SessionState,
) -> serde_json::Value {
    let stats = &report.stats;
    let statuses: serde_json::Map<String, serde_json::Value> = stats
        .status_histogram
        .iter()
        .map(|(status, count)| (status.to_string(), serde_json::Value::from(*count)))
        .collect();

    serde_json::json!({
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "target": target,
        "state": terminal.to_string(),
        "elapsed_ms": millis(report.elapsed),
        "total_requests": stats.total_requests,
        "success_count": stats.success_count,
        "fail_count": stats.fail_count,
        "error_count": stats.error_count,
        "success_rate_x100": report.success_rate_x100(),
        "requests_per_sec_x100": report.requests_per_sec_x100,
        "bytes_per_sec_x100": report.bytes_per_sec_x100,
        "total_bytes_sent": stats.total_bytes_sent,
        "total_bytes_received": stats.total_bytes_received,
        "avg_latency_us": report.average_latency.map(micros),
        "min_latency_us": stats.min_latency.map(micros),
        "max_latency_us": stats.max_latency.map(micros),
        "p50_latency_us": micros(report.percentiles.p50),
        "p90_latency_us": micros(report.percentiles.p90),
        "p99_latency_us": micros(report.percentiles.p99),
        "status_codes": statuses
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).map_or(u64::MAX, |value| value)
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).map_or(u64::MAX, |value| value)
}
