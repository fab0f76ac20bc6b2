use reqwest::header::{
    CACHE_CONTROL, CONTENT_TYPE, HOST, HeaderMap, HeaderValue, PRAGMA, USER_AGENT,
};
use reqwest::{Body, Method, Request, Url};

use crate::args::{DEFAULT_USER_AGENT, HttpMethod};

use super::transport::to_u64;

const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";
const NO_CACHE: &str = "no-cache";

/// Immutable description of one request, shared read-only by every worker.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    url: Url,
    method: HttpMethod,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    request_size: u64,
}

impl TaskSpec {
    /// User headers come first; defaults fill in only what they leave unset,
    /// except the reload headers which always apply.
    #[must_use]
    pub fn new(
        url: Url,
        method: HttpMethod,
        user_headers: &HeaderMap,
        body: Option<Vec<u8>>,
        disable_cache: bool,
    ) -> Self {
        let body = body.filter(|_| method.sends_body());
        let mut headers = user_headers.clone();
        headers
            .entry(USER_AGENT)
            .or_insert(HeaderValue::from_static(DEFAULT_USER_AGENT));
        if body.is_some() {
            headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        if disable_cache {
            headers.insert(PRAGMA, HeaderValue::from_static(NO_CACHE));
            headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
        }

        let request_size = request_wire_size(&url, method, &headers, body.as_deref());
        Self {
            url,
            method,
            headers,
            body,
            request_size,
        }
    }

    /// Fresh request for one attempt; nothing carries over between calls.
    #[must_use]
    pub fn build_request(&self) -> Request {
        let method: Method = self.method.to_reqwest();
        let mut request = Request::new(method, self.url.clone());
        *request.headers_mut() = self.headers.clone();
        if let Some(body) = self.body.as_ref() {
            *request.body_mut() = Some(Body::from(body.clone()));
        }
        request
    }

    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.method
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Size of the request as written on an HTTP/1.1 connection, counted
    /// once per attempt as bytes sent.
    #[must_use]
    pub const fn request_size(&self) -> u64 {
        self.request_size
    }
}

fn request_wire_size(
    url: &Url,
    method: HttpMethod,
    headers: &HeaderMap,
    body: Option<&[u8]>,
) -> u64 {
    let path = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_owned(),
    };
    // "METHOD /path HTTP/1.1\r\n"
    let request_line = format!("{} {} HTTP/1.1\r\n", method.as_str(), path);
    let mut size = to_u64(request_line.len());

    if !headers.contains_key(HOST) {
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("Host: {}:{}\r\n", host, port),
            (Some(host), None) => format!("Host: {}\r\n", host),
            (None, _) => String::new(),
        };
        size = size.saturating_add(to_u64(host.len()));
    }

    for (name, value) in headers {
        size = size
            .saturating_add(to_u64(name.as_str().len()))
            .saturating_add(to_u64(value.as_bytes().len()))
            .saturating_add(4);
    }

    if let Some(body) = body {
        let content_length = format!("Content-Length: {}\r\n", body.len());
        size = size
            .saturating_add(to_u64(content_length.len()))
            .saturating_add(to_u64(body.len()));
    }

    size.saturating_add(2)
}
