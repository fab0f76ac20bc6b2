use crate::config::RunConfig;
use crate::http::ProxyRoute;
use crate::metrics::SuccessPredicate;

/// One-line summary of the effective session settings.
pub(crate) fn selection_line(config: &RunConfig) -> String {
    format!(
        "{} {} | concurrency={} duration={}ms timeout={}ms interval={}ms | {} | route={} | success={}{}",
        config.method,
        config.display_target(),
        config.concurrency,
        config.duration.as_millis(),
        config.request_timeout.as_millis(),
        config.interval.as_millis(),
        if config.http2 { "h2" } else { "http/1.1" },
        format_route(&config.route),
        format_success(config.success),
        if config.disable_cache { " reload" } else { "" }
    )
}

fn format_route(route: &ProxyRoute) -> &str {
    match route {
        ProxyRoute::Direct => "direct",
        ProxyRoute::Http(proxy) | ProxyRoute::Socks5(proxy) => proxy,
    }
}

fn format_success(success: SuccessPredicate) -> String {
    match success {
        SuccessPredicate::Exact(status) => status.to_string(),
        SuccessPredicate::AnyTwoXx => "2xx".to_owned(),
    }
}
