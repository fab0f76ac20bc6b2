use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::args::{HttpMethod, TesterArgs};
use crate::error::{AppError, AppResult, ValidationError};
use crate::http::ProxyRoute;
use crate::metrics::SuccessPredicate;

/// Where requests are aimed.
#[derive(Debug, Clone)]
pub enum TargetPlan {
    /// Every worker repeats the same request.
    Single(Url),
    /// Workers pull from a queue that is filled `passes` times, then closed.
    Queue { urls: Vec<Url>, passes: usize },
}

/// Fully validated, immutable settings for one session.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub concurrency: usize,
    pub duration: Duration,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub interval: Duration,
    pub method: HttpMethod,
    pub body: Option<Vec<u8>>,
    pub headers: HeaderMap,
    pub route: ProxyRoute,
    pub http2: bool,
    pub disable_cache: bool,
    pub success: SuccessPredicate,
    pub targets: TargetPlan,
    pub export_json: Option<String>,
    pub verbose: bool,
    pub no_banner: bool,
}

impl RunConfig {
    /// Validates CLI arguments (already merged with any config file).
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing or malformed URL, HTTP/2 over
    /// plain http, a malformed proxy or SOCKS5 address, bad headers, or
    /// conflicting method flags.
    pub fn from_args(args: &TesterArgs) -> AppResult<Self> {
        let method = args.resolve_method()?;
        let targets = resolve_targets(args)?;

        if args.http2 {
            let plain = match &targets {
                TargetPlan::Single(url) => (url.scheme() != "https").then(|| url.clone()),
                TargetPlan::Queue { urls, .. } => {
                    urls.iter().find(|url| url.scheme() != "https").cloned()
                }
            };
            if let Some(url) = plain {
                return Err(AppError::validation(ValidationError::Http2RequiresHttps {
                    url: url.to_string(),
                }));
            }
        }

        let route = resolve_route(args.proxy.as_deref(), args.socks5.as_deref())?;

        let body = match args.data.as_ref() {
            Some(data) if method.sends_body() => Some(data.as_bytes().to_vec()),
            Some(_) => {
                tracing::warn!("Ignoring request body: {} requests carry no body.", method);
                None
            }
            None => None,
        };

        let headers = build_headers(&args.headers)?;

        let success = if args.accept_2xx {
            SuccessPredicate::AnyTwoXx
        } else {
            SuccessPredicate::Exact(args.expected_status_code)
        };

        Ok(Self {
            concurrency: args.concurrency.get(),
            duration: args.duration,
            request_timeout: args.request_timeout,
            connect_timeout: args.connect_timeout,
            interval: args.interval,
            method,
            body,
            headers,
            route,
            http2: args.http2,
            disable_cache: args.reload,
            success,
            targets,
            export_json: args.export_json.clone(),
            verbose: args.verbose,
            no_banner: args.no_banner,
        })
    }

    /// URL shown in the banner and summary header.
    #[must_use]
    pub fn display_target(&self) -> String {
        match &self.targets {
            TargetPlan::Single(url) => url.to_string(),
            TargetPlan::Queue { urls, passes } => match urls.first() {
                Some(first) if urls.len() > 1 => format!(
                    "{} (+{} more, {} pass(es))",
                    first,
                    urls.len().saturating_sub(1),
                    passes
                ),
                Some(first) => format!("{} ({} pass(es))", first, passes),
                None => String::new(),
            },
        }
    }
}

fn resolve_targets(args: &TesterArgs) -> AppResult<TargetPlan> {
    match (args.url.as_deref(), args.urls_file.as_deref()) {
        (Some(_), Some(_)) => Err(AppError::validation(
            ValidationError::UrlAndUrlFileConflict,
        )),
        (Some(url), None) => Ok(TargetPlan::Single(parse_target_url(url)?)),
        (None, Some(path)) => {
            let urls = read_url_file(path)?;
            Ok(TargetPlan::Queue {
                urls,
                passes: args.queue_passes.get(),
            })
        }
        (None, None) => Err(AppError::validation(ValidationError::MissingUrl)),
    }
}

pub(crate) fn parse_target_url(raw: &str) -> AppResult<Url> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|err| {
        AppError::validation(ValidationError::InvalidUrl {
            url: trimmed.to_owned(),
            source: err,
        })
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::validation(ValidationError::UnsupportedScheme {
                scheme: other.to_owned(),
            }));
        }
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(AppError::validation(ValidationError::UrlMissingHost {
            url: trimmed.to_owned(),
        }));
    }
    Ok(url)
}

fn read_url_file(path: &str) -> AppResult<Vec<Url>> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::validation(ValidationError::ReadUrlFile {
            path: path.to_owned(),
            source: err,
        })
    })?;
    let mut urls = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        urls.push(parse_target_url(line)?);
    }
    if urls.is_empty() {
        return Err(AppError::validation(ValidationError::UrlFileEmpty {
            path: path.to_owned(),
        }));
    }
    Ok(urls)
}

pub(crate) fn resolve_route(proxy: Option<&str>, socks5: Option<&str>) -> AppResult<ProxyRoute> {
    match (proxy, socks5) {
        (Some(proxy), socks5) => {
            if socks5.is_some() {
                tracing::warn!("Both --proxy and --socks5 given; using the HTTP proxy.");
            }
            Ok(ProxyRoute::Http(normalize_proxy(proxy)?))
        }
        (None, Some(socks5)) => Ok(ProxyRoute::Socks5(normalize_socks(socks5)?)),
        (None, None) => Ok(ProxyRoute::Direct),
    }
}

fn normalize_proxy(raw: &str) -> AppResult<String> {
    let value = raw.trim();
    let invalid = || {
        AppError::validation(ValidationError::InvalidProxyAddress {
            value: value.to_owned(),
        })
    };
    if value.contains("://") {
        let url = Url::parse(value).map_err(|_err| invalid())?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none_or(str::is_empty) {
            return Err(invalid());
        }
        return Ok(value.to_owned());
    }
    if !is_host_port(value) {
        return Err(invalid());
    }
    Ok(format!("http://{}", value))
}

fn normalize_socks(raw: &str) -> AppResult<String> {
    let value = raw.trim();
    let address = value.strip_prefix("socks5://").unwrap_or(value);
    if !is_host_port(address) {
        return Err(AppError::validation(ValidationError::InvalidSocksAddress {
            value: value.to_owned(),
        }));
    }
    Ok(format!("socks5://{}", address))
}

fn is_host_port(value: &str) -> bool {
    let Some((host, port)) = value.rsplit_once(':') else {
        return false;
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    !host.is_empty()
        && !host.contains('/')
        && port.parse::<u16>().is_ok_and(|number| number > 0)
}

fn build_headers(pairs: &[(String, String)]) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (key, value) in pairs {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
            AppError::validation(ValidationError::InvalidHeaderName {
                header: key.clone(),
                source: err,
            })
        })?;
        let value = HeaderValue::from_str(value).map_err(|err| {
            AppError::validation(ValidationError::InvalidHeaderValue {
                header: key.clone(),
                source: err,
            })
        })?;
        // Last occurrence wins.
        headers.insert(name, value);
    }
    Ok(headers)
}
