//! NetEase MCP Common Library
//!
//! Shared configuration, error handling, tracing, transport selection and the
//! SSE session transport used by the NetEase Cloud Music MCP server.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod sse;
pub mod tracing;
pub mod transport;

#[cfg(test)]
mod error_test;
#[cfg(test)]
mod transport_test;

pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use server::{McpServerBuilder, ServerError, shutdown_channel};
pub use session::{SessionHandlerFactory, SessionId};
pub use transport::{Transport, TransportArgs, TransportMode};
