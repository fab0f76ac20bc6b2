use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Url;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue, PRAGMA, USER_AGENT};

use super::*;
use crate::args::HttpMethod;
use crate::error::{AppError, AppResult, TransportError, ValidationError};

fn parse_url(raw: &str) -> AppResult<Url> {
    Url::parse(raw).map_err(|err| {
        AppError::validation(ValidationError::InvalidUrl {
            url: raw.to_owned(),
            source: err,
        })
    })
}

fn settings(route: ProxyRoute) -> TransportSettings {
    TransportSettings {
        request_timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(1),
        pool_size: 2,
        http2: false,
        route,
    }
}

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: std::future::Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

/// Serves exactly one request with `response` and then closes.
fn one_shot_server(response: &'static [u8]) -> AppResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0_u8; 4096];
            if stream.read(&mut buf).is_ok() {
                drop(stream.write_all(response));
            }
        }
    });
    Ok(port)
}

#[test]
fn task_spec_applies_default_headers() -> AppResult<()> {
    let url = parse_url("http://localhost:3000/submit")?;
    let task = TaskSpec::new(
        url,
        HttpMethod::Post,
        &HeaderMap::new(),
        Some(b"{\"a\":1}".to_vec()),
        true,
    );

    let headers = task.headers();
    if headers.get(CONTENT_TYPE) != Some(&HeaderValue::from_static("application/json;charset=utf-8"))
    {
        return Err(AppError::validation("Expected JSON content type"));
    }
    if headers.get(PRAGMA).is_none() || headers.get(CACHE_CONTROL).is_none() {
        return Err(AppError::validation("Expected reload headers"));
    }
    if headers.get(USER_AGENT).is_none() {
        return Err(AppError::validation("Expected default user agent"));
    }
    if task.body() != Some(b"{\"a\":1}".as_slice()) {
        return Err(AppError::validation("Expected body"));
    }
    Ok(())
}

#[test]
fn task_spec_keeps_user_headers_and_drops_body_for_get() -> AppResult<()> {
    let mut user = HeaderMap::new();
    user.insert(USER_AGENT, HeaderValue::from_static("custom/1.0"));
    user.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    let task = TaskSpec::new(
        parse_url("http://localhost/")?,
        HttpMethod::Get,
        &user,
        Some(b"ignored".to_vec()),
        false,
    );

    if task.headers().get(USER_AGENT) != Some(&HeaderValue::from_static("custom/1.0")) {
        return Err(AppError::validation("User agent override lost"));
    }
    if task.body().is_some() {
        return Err(AppError::validation("GET must not carry a body"));
    }
    if task.headers().get(PRAGMA).is_some() {
        return Err(AppError::validation("Unexpected reload header"));
    }
    Ok(())
}

#[test]
fn build_request_is_fresh_each_time() -> AppResult<()> {
    let task = TaskSpec::new(
        parse_url("http://localhost:3000/a?b=1")?,
        HttpMethod::Post,
        &HeaderMap::new(),
        Some(b"xyz".to_vec()),
        false,
    );
    let mut first = task.build_request();
    first
        .headers_mut()
        .insert("x-leak", HeaderValue::from_static("1"));
    let second = task.build_request();

    if second.headers().contains_key("x-leak") {
        return Err(AppError::validation("Header state leaked between requests"));
    }
    if second.method() != reqwest::Method::POST || second.url().query() != Some("b=1") {
        return Err(AppError::validation("Unexpected method or url"));
    }
    if second.body().and_then(reqwest::Body::as_bytes) != Some(b"xyz".as_slice()) {
        return Err(AppError::validation("Unexpected body"));
    }
    Ok(())
}

#[test]
fn request_size_counts_line_headers_and_body() -> AppResult<()> {
    let get = TaskSpec::new(
        parse_url("http://example.com/")?,
        HttpMethod::Get,
        &HeaderMap::new(),
        None,
        false,
    );
    let post = TaskSpec::new(
        parse_url("http://example.com/")?,
        HttpMethod::Post,
        &HeaderMap::new(),
        Some(vec![b'x'; 100]),
        false,
    );
    // "GET / HTTP/1.1\r\n" + "Host: example.com\r\n" + User-Agent line + "\r\n"
    let user_agent_line = format!("User-Agent: {}\r\n", crate::args::DEFAULT_USER_AGENT).len();
    let expected_get = u64::try_from(16 + 19 + user_agent_line + 2)
        .map_err(|_err| AppError::validation("size overflow"))?;
    if get.request_size() != expected_get {
        return Err(AppError::validation(format!(
            "Unexpected GET size: {} (expected {})",
            get.request_size(),
            expected_get
        )));
    }
    if post.request_size() <= get.request_size().saturating_add(100) {
        return Err(AppError::validation("POST size should include body"));
    }
    Ok(())
}

#[test]
fn reqwest_transport_reports_status_and_bytes() -> AppResult<()> {
    run_async_test(async {
        let port = one_shot_server(
            b"HTTP/1.1 503 Service Unavailable\r\nContent-Length: 5\r\nConnection: close\r\n\r\nbusy!",
        )?;
        let transport = build_transport(&settings(ProxyRoute::Direct))?;
        let task = TaskSpec::new(
            parse_url(&format!("http://127.0.0.1:{}/", port))?,
            HttpMethod::Get,
            &HeaderMap::new(),
            None,
            false,
        );
        let response = transport
            .execute(task.build_request())
            .await
            .map_err(|err| AppError::validation(format!("transport failed: {}", err)))?;
        if response.status != 503 {
            return Err(AppError::validation(format!(
                "Unexpected status: {}",
                response.status
            )));
        }
        // Body plus at least the status line and headers.
        if response.bytes_received <= 5 {
            return Err(AppError::validation("Expected head and body bytes"));
        }
        Ok(())
    })
}

#[test]
fn reqwest_transport_maps_refused_connection() -> AppResult<()> {
    run_async_test(async {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);

        let transport = build_transport(&settings(ProxyRoute::Direct))?;
        let task = TaskSpec::new(
            parse_url(&format!("http://127.0.0.1:{}/", port))?,
            HttpMethod::Get,
            &HeaderMap::new(),
            None,
            false,
        );
        match transport.execute(task.build_request()).await {
            Err(TransportError::Connect(_)) => Ok(()),
            Err(err) => Err(AppError::validation(format!("Unexpected error: {}", err))),
            Ok(response) => Err(AppError::validation(format!(
                "Unexpected response: {}",
                response.status
            ))),
        }
    })
}

#[test]
fn build_transport_accepts_proxy_routes() -> AppResult<()> {
    build_transport(&settings(ProxyRoute::Http("http://127.0.0.1:3128".to_owned())))?;
    build_transport(&settings(ProxyRoute::Socks5(
        "socks5://127.0.0.1:1080".to_owned(),
    )))?;
    Ok(())
}
