use clap::Parser;
use std::time::Duration;

use super::parsers::{
    parse_duration_arg, parse_header, parse_interval_arg, parse_millis_arg, parse_positive_usize,
};
use super::types::{HttpMethod, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Concurrent HTTP load generator - many request streams against one target for a bounded time window."
)]
pub struct TesterArgs {
    /// Target URL for the load test
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Number of concurrent request streams
    #[arg(
        long = "concurrency",
        short = 'c',
        visible_aliases = ["thread", "client"],
        default_value = "1",
        value_parser = parse_positive_usize
    )]
    pub concurrency: PositiveUsize,

    /// Duration of the run (bare numbers are seconds; supports ms/s/m/h)
    #[arg(
        long = "duration",
        short = 't',
        visible_alias = "time",
        default_value = "60",
        value_parser = parse_duration_arg
    )]
    pub duration: Duration,

    /// Pause between requests on each stream (bare numbers are milliseconds)
    #[arg(long = "interval", short = 'i', default_value = "0", value_parser = parse_interval_arg)]
    pub interval: Duration,

    /// Per-request timeout (bare numbers are milliseconds)
    #[arg(long = "timeout", default_value = "1000", value_parser = parse_millis_arg)]
    pub request_timeout: Duration,

    /// Timeout for establishing a new connection (bare numbers are milliseconds)
    #[arg(long = "connect-timeout", default_value = "5s", value_parser = parse_millis_arg)]
    pub connect_timeout: Duration,

    /// Use HTTP/2 (https targets only)
    #[arg(long = "http2")]
    pub http2: bool,

    /// Route requests through an HTTP proxy (host:port or http://host:port)
    #[arg(long = "proxy")]
    pub proxy: Option<String>,

    /// Route connections through a SOCKS5 proxy (host:port)
    #[arg(long = "socks5")]
    pub socks5: Option<String>,

    /// HTTP method to use
    #[arg(long = "method", short = 'X', ignore_case = true)]
    pub method: Option<HttpMethod>,

    /// Use GET (default)
    #[arg(long = "get")]
    pub get: bool,

    /// Use POST
    #[arg(long = "post")]
    pub post: bool,

    /// Use HEAD
    #[arg(long = "head")]
    pub head: bool,

    /// Use OPTIONS
    #[arg(long = "options", visible_alias = "option")]
    pub options: bool,

    /// Use TRACE
    #[arg(long = "trace")]
    pub trace: bool,

    /// Request body (only sent with POST)
    #[arg(long = "data", short = 'd')]
    pub data: Option<String>,

    /// Send reload requests (Pragma: no-cache)
    #[arg(long = "reload")]
    pub reload: bool,

    /// HTTP headers in 'Key: Value' format (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Status code counted as success
    #[arg(long = "status", short = 's', default_value = "200")]
    pub expected_status_code: u16,

    /// Count any 2xx status as success
    #[arg(long = "accept-2xx", conflicts_with = "expected_status_code")]
    pub accept_2xx: bool,

    /// Pull tasks from a queue filled with the URLs in this file (one per line)
    #[arg(long = "urls-file")]
    pub urls_file: Option<String>,

    /// How many times the URL file is queued before the queue closes
    #[arg(long = "queue-passes", default_value = "1", value_parser = parse_positive_usize)]
    pub queue_passes: PositiveUsize,

    /// Write the final report as JSON to this path
    #[arg(long = "export-json")]
    pub export_json: Option<String>,

    /// Path to config file (TOML/JSON). Defaults to ./httpbench.toml or ./httpbench.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Skip the startup banner
    #[arg(long = "no-banner")]
    pub no_banner: bool,

    /// Enable verbose logging (sets log level to debug unless overridden by HTTPBENCH_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl TesterArgs {
    /// Resolves the request method from `-X` and the single-method flags.
    ///
    /// # Errors
    ///
    /// Returns an error when more than one method is selected.
    pub fn resolve_method(&self) -> Result<HttpMethod, crate::error::ValidationError> {
        let flags = [
            (self.get, HttpMethod::Get),
            (self.post, HttpMethod::Post),
            (self.head, HttpMethod::Head),
            (self.options, HttpMethod::Options),
            (self.trace, HttpMethod::Trace),
        ];
        let mut selected = flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, method)| *method)
            .chain(self.method);
        let first = selected.next();
        if selected.any(|other| Some(other) != first) {
            return Err(crate::error::ValidationError::ConflictingMethodFlags);
        }
        Ok(first.unwrap_or_default())
    }
}
