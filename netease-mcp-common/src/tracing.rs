//! Tracing initialization for the NetEase MCP server.
//!
//! Logs are written to stderr so the stdio transport keeps stdout for
//! JSON-RPC traffic.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Controls the log level and filtering. Examples:
//!   - `RUST_LOG=debug` - Enable debug logging for all modules
//!   - `RUST_LOG=netease_mcp=debug` - Enable debug for the server crate
//!   - `RUST_LOG=warn,netease_mcp_common=debug` - Warn by default, debug for common

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn fmt_layer<S>() -> impl tracing_subscriber::Layer<S> + Send + Sync + 'static
where
    S: ::tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// Defaults to `info` when `RUST_LOG` is not set.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use netease_mcp_common::tracing::init_tracing;
///
/// fn main() {
///     init_tracing();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Initialize tracing with a custom default level used when `RUST_LOG` is
/// not set.
pub fn init_tracing_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(fmt_layer())
        .init();
}

/// Try to initialize tracing, returning an error if already initialized.
///
/// Unlike `init_tracing()`, this does not panic when a subscriber is
/// already set, which makes it safe to call from tests.
pub fn try_init_tracing() -> Result<(), ()> {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt_layer())
        .try_init()
        .map_err(|_| ())
}
