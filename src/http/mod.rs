//! Shared HTTP transport and the request template workers repeat.
mod client;
mod task;
mod transport;

#[cfg(test)]
mod tests;

pub use client::{ProxyRoute, TransportSettings, build_transport};
pub use task::TaskSpec;
pub use transport::{ReqwestTransport, Transport, TransportResponse};
