//! Core library for the `httpbench` CLI.
//!
//! A fixed pool of workers shares one pooled HTTP transport, records every
//! attempt into a lock-free collector, and stops on a deadline, an interrupt,
//! or a drained task queue. The binary is a thin layer over
//! [`entry::run`]; the engine types ([`session::SessionController`],
//! [`pool::WorkerPool`], [`http::Transport`]) are public so they can be driven
//! directly.
pub mod app;
pub mod args;
pub mod config;
pub mod entry;
pub mod error;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod pool;
pub mod session;
pub mod shutdown;
pub mod shutdown_handlers;
mod system;
