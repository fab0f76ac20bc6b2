use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Proxy};
use tracing::{debug, error};

use crate::config::RunConfig;
use crate::error::{AppError, AppResult, HttpError, ValidationError};

use super::transport::{ReqwestTransport, Transport};

/// How connections reach the target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProxyRoute {
    #[default]
    Direct,
    /// Normalized `http(s)://host:port` proxy URL.
    Http(String),
    /// Normalized `socks5://host:port` dialer address.
    Socks5(String),
}

/// Client-level knobs, split from [`RunConfig`] so tests can build a
/// transport without a full session config.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_size: usize,
    pub http2: bool,
    pub route: ProxyRoute,
}

impl From<&RunConfig> for TransportSettings {
    fn from(config: &RunConfig) -> Self {
        Self {
            request_timeout: config.request_timeout,
            connect_timeout: config.connect_timeout,
            pool_size: config.concurrency,
            http2: config.http2,
            route: config.route.clone(),
        }
    }
}

/// Builds the one shared, connection-pooling transport for a session.
///
/// # Errors
///
/// Returns an error when the proxy URL is rejected or the client cannot be
/// built (for example when the TLS backend fails to initialise).
pub fn build_transport(settings: &TransportSettings) -> AppResult<Arc<dyn Transport>> {
    let mut client_builder = Client::builder()
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .pool_max_idle_per_host(settings.pool_size);

    // Without --http2 stay on HTTP/1.1; with it, ALPN negotiates h2.
    if !settings.http2 {
        client_builder = client_builder.http1_only();
    }

    client_builder = match &settings.route {
        // HTTP_PROXY/HTTPS_PROXY are ignored; routing comes from flags only.
        ProxyRoute::Direct => client_builder.no_proxy(),
        ProxyRoute::Http(proxy_url) | ProxyRoute::Socks5(proxy_url) => {
            debug!("Routing connections through {}", proxy_url);
            let proxy = Proxy::all(proxy_url.as_str()).map_err(|err| {
                error!("Invalid proxy URL '{}': {}", proxy_url, err);
                AppError::validation(ValidationError::InvalidProxyUrl {
                    url: proxy_url.clone(),
                    source: err,
                })
            })?;
            client_builder.proxy(proxy)
        }
    };

    let client = client_builder.build().map_err(|err| {
        error!("Failed to build HTTP client: {}", err);
        AppError::http(HttpError::BuildClientFailed { source: err })
    })?;

    Ok(Arc::new(ReqwestTransport::new(client)))
}
