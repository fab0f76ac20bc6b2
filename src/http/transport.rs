use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Request, Response};

use crate::error::TransportError;

/// What a worker needs from one completed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Status line, headers, and body as they came off the wire.
    pub bytes_received: u64,
}

/// Issues a single request. One instance is shared by every worker.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request) -> Result<TransportResponse, TransportError>;
}

/// Connection-pooling transport backed by a single [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: Request) -> Result<TransportResponse, TransportError> {
        let response = self.client.execute(request).await?;
        let status = response.status().as_u16();
        let head = response_head_size(&response);

        // Drain the body so the connection goes back to the pool.
        let mut body_bytes: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            body_bytes = body_bytes.saturating_add(to_u64(chunk.len()));
        }

        Ok(TransportResponse {
            status,
            bytes_received: head.saturating_add(body_bytes),
        })
    }
}

fn response_head_size(response: &Response) -> u64 {
    // "HTTP/1.1 200 OK\r\n"
    let status_line = format!("{:?} {}\r\n", response.version(), response.status());
    let mut size = to_u64(status_line.len());
    for (name, value) in response.headers() {
        // "name: value\r\n"
        size = size
            .saturating_add(to_u64(name.as_str().len()))
            .saturating_add(to_u64(value.as_bytes().len()))
            .saturating_add(4);
    }
    size.saturating_add(2)
}

pub(crate) fn to_u64(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}
