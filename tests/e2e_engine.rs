mod support;

use std::fs;
use std::time::Duration;

use clap::Parser;
use httpbench::app::build_task_source;
use httpbench::args::TesterArgs;
use httpbench::config::RunConfig;
use httpbench::http::{TransportSettings, build_transport};
use httpbench::metrics::SessionReport;
use httpbench::session::{SessionController, SessionState};
use httpbench::shutdown::shutdown_channel;
use tempfile::tempdir;

use support::{Mode, closed_port, spawn_server};

const CONCURRENCY: u64 = 3;
/// Pool reuse keeps new connections near the worker count; a connection can
/// be re-dialled when a worker races its own pool check-in.
const MAX_CONNECTIONS: u64 = 12;

async fn run_session(argv: &[&str]) -> Result<(SessionState, SessionReport), String> {
    let args = TesterArgs::try_parse_from(argv).map_err(|err| format!("parse failed: {}", err))?;
    let config = RunConfig::from_args(&args).map_err(|err| format!("config failed: {}", err))?;
    let transport = build_transport(&TransportSettings::from(&config))
        .map_err(|err| format!("transport failed: {}", err))?;
    let (source, feed) = build_task_source(&config);
    let (shutdown_tx, _) = shutdown_channel();
    let session = SessionController::from_config(&config, transport, source, &shutdown_tx);
    if let Some(feed) = feed {
        tokio::spawn(feed.run());
    }
    tokio::time::timeout(Duration::from_secs(10), session.run())
        .await
        .map_err(|_elapsed| "session did not finish".to_owned())?
        .map_err(|err| format!("session failed: {}", err))
}

fn check_totals(report: &SessionReport) -> Result<(), String> {
    let stats = &report.stats;
    let summed = stats
        .success_count
        .saturating_add(stats.fail_count)
        .saturating_add(stats.error_count);
    if summed != stats.total_requests {
        return Err(format!("counts do not add up: {:?}", stats));
    }
    let histogram: u64 = stats.status_histogram.values().sum();
    if histogram != stats.success_count.saturating_add(stats.fail_count) {
        return Err(format!("histogram does not match responses: {:?}", stats));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_engine_all_success() -> Result<(), String> {
    let (addr, server) = spawn_server(Mode::Origin, 200)?;
    let url = format!("http://{}/", addr);
    let (terminal, report) = run_session(&["httpbench", &url, "-c", "3", "-t", "300ms"]).await?;
    check_totals(&report)?;

    let stats = &report.stats;
    if terminal != SessionState::Completed {
        return Err(format!("expected completed, got {}", terminal));
    }
    if stats.total_requests == 0 || stats.success_count != stats.total_requests {
        return Err(format!("expected only successes: {:?}", stats));
    }
    if stats.total_bytes_sent == 0 || stats.total_bytes_received == 0 {
        return Err("expected byte counters to move".to_owned());
    }
    if server.requests() < stats.total_requests {
        return Err(format!(
            "server saw {} requests, client recorded {}",
            server.requests(),
            stats.total_requests
        ));
    }
    if server.connections() > MAX_CONNECTIONS {
        return Err(format!("pool opened {} connections", server.connections()));
    }
    if server.counters.absolute_form.load(std::sync::atomic::Ordering::Relaxed) != 0 {
        return Err("origin requests must use origin-form".to_owned());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_engine_all_failures() -> Result<(), String> {
    let (addr, _server) = spawn_server(Mode::Origin, 500)?;
    let url = format!("http://{}/", addr);
    let (_, report) = run_session(&["httpbench", &url, "-c", "3", "-t", "300ms"]).await?;
    check_totals(&report)?;

    let stats = &report.stats;
    if stats.success_count != 0 || stats.fail_count != stats.total_requests {
        return Err(format!("expected only failures: {:?}", stats));
    }
    if stats.status_histogram.get(&500).copied() != Some(stats.total_requests) {
        return Err(format!("expected every request under 500: {:?}", stats));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_engine_custom_success_status() -> Result<(), String> {
    let (addr, _server) = spawn_server(Mode::Origin, 404)?;
    let url = format!("http://{}/missing", addr);
    let (_, report) =
        run_session(&["httpbench", &url, "-c", "2", "-t", "200ms", "--status", "404"]).await?;
    let stats = &report.stats;
    if stats.total_requests == 0 || stats.success_count != stats.total_requests {
        return Err(format!("404 should count as success: {:?}", stats));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_engine_connection_refused() -> Result<(), String> {
    let url = format!("http://127.0.0.1:{}/", closed_port()?);
    let (_, report) = run_session(&["httpbench", &url, "-c", "3", "-t", "200ms"]).await?;
    check_totals(&report)?;

    let stats = &report.stats;
    if stats.total_requests == 0 || stats.error_count != stats.total_requests {
        return Err(format!("expected only transport errors: {:?}", stats));
    }
    if report.average_latency.is_some() || !stats.status_histogram.is_empty() {
        return Err("transport errors must not produce latency or statuses".to_owned());
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_engine_post_body_is_counted() -> Result<(), String> {
    let (addr, _server) = spawn_server(Mode::Origin, 200)?;
    let url = format!("http://{}/submit", addr);
    let body = "0123456789abcdef";
    let (_, report) = run_session(&[
        "httpbench", &url, "-c", "1", "-t", "200ms", "--post", "-d", body,
    ])
    .await?;

    let stats = &report.stats;
    let minimum = stats.total_requests.saturating_mul(16);
    if stats.total_requests == 0 || stats.total_bytes_sent <= minimum {
        return Err(format!("request bytes should include the body: {:?}", stats));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_engine_http_proxy_sees_every_connection() -> Result<(), String> {
    let (proxy_addr, proxy) = spawn_server(Mode::HttpProxy, 200)?;
    let (_, report) = run_session(&[
        "httpbench",
        "http://upstream.test/path",
        "-c",
        "3",
        "-t",
        "300ms",
        "--proxy",
        &proxy_addr,
    ])
    .await?;

    let stats = &report.stats;
    if stats.total_requests == 0 || stats.success_count != stats.total_requests {
        return Err(format!("expected proxied successes: {:?}", stats));
    }
    let absolute = proxy
        .counters
        .absolute_form
        .load(std::sync::atomic::Ordering::Relaxed);
    if absolute != proxy.requests() || proxy.requests() < stats.total_requests {
        return Err(format!(
            "proxy saw {} requests ({} absolute-form), client recorded {}",
            proxy.requests(),
            absolute,
            stats.total_requests
        ));
    }
    if proxy.connections() == 0 || proxy.connections() > MAX_CONNECTIONS {
        return Err(format!(
            "expected 1..={} pooled proxy connections, saw {}",
            MAX_CONNECTIONS,
            proxy.connections()
        ));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_engine_socks5_sees_every_connection() -> Result<(), String> {
    let (socks_addr, socks) = spawn_server(Mode::Socks5, 200)?;
    let (_, report) = run_session(&[
        "httpbench",
        "http://127.0.0.1:9/",
        "-c",
        "3",
        "-t",
        "300ms",
        "--socks5",
        &socks_addr,
    ])
    .await?;

    let stats = &report.stats;
    if stats.total_requests == 0 || stats.success_count != stats.total_requests {
        return Err(format!("expected tunnelled successes: {:?}", stats));
    }
    let handshakes = socks
        .counters
        .socks_handshakes
        .load(std::sync::atomic::Ordering::Relaxed);
    if handshakes != socks.connections() {
        return Err(format!(
            "{} connections but {} handshakes",
            socks.connections(),
            handshakes
        ));
    }
    if handshakes == 0 || handshakes > MAX_CONNECTIONS {
        return Err(format!("expected pooled tunnels, saw {}", handshakes));
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn e2e_engine_queue_drains_to_completion() -> Result<(), String> {
    let (addr, server) = spawn_server(Mode::Origin, 200)?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let urls = dir.path().join("urls.txt");
    let content = format!(
        "# targets\nhttp://{addr}/a\n\nhttp://{addr}/b\nhttp://{addr}/c\n",
        addr = addr
    );
    fs::write(&urls, content).map_err(|err| format!("write urls failed: {}", err))?;
    let urls_path = urls.to_string_lossy().into_owned();

    let (terminal, report) = run_session(&[
        "httpbench",
        "--urls-file",
        &urls_path,
        "--queue-passes",
        "2",
        "-c",
        "2",
        "-t",
        "30s",
    ])
    .await?;

    if terminal != SessionState::Completed {
        return Err(format!("expected completed, got {}", terminal));
    }
    if report.stats.total_requests != 6 || server.requests() != 6 {
        return Err(format!(
            "expected 6 requests, client {} server {}",
            report.stats.total_requests,
            server.requests()
        ));
    }
    if report.elapsed > Duration::from_secs(10) {
        return Err("drained queue should end before the deadline".to_owned());
    }
    Ok(())
}
