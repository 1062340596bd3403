//! MCP transport configuration.
//!
//! Two transport modes are supported:
//!
//! - **SSE**: Default mode. `GET /sse` opens a session, `POST /messages`
//!   delivers client messages, and each session may carry its own cookie.
//! - **Stdio**: Local subprocess communication with a single session that
//!   always uses the global cookie.
//!
//! # Example
//!
//! ```ignore
//! use netease_mcp_common::transport::TransportArgs;
//! use clap::Parser;
//!
//! #[derive(Parser)]
//! struct Args {
//!     #[command(flatten)]
//!     transport: TransportArgs,
//! }
//!
//! let args = Args::parse();
//! let transport = args.transport.into_transport();
//! ```

use clap::Args;
use std::fmt;

/// Default SSE listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Transport mode for MCP server communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Standard input/output transport.
    Stdio,
    /// Server-Sent Events transport with per-session routing.
    Sse {
        /// Port to listen on
        port: u16,
    },
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Sse { port: DEFAULT_PORT }
    }
}

impl Transport {
    /// Create a new stdio transport.
    pub fn stdio() -> Self {
        Transport::Stdio
    }

    /// Create a new SSE transport on the specified port.
    pub fn sse(port: u16) -> Self {
        Transport::Sse { port }
    }

    /// Check if this is a stdio transport.
    pub fn is_stdio(&self) -> bool {
        matches!(self, Transport::Stdio)
    }

    /// Check if this is an SSE transport.
    pub fn is_sse(&self) -> bool {
        matches!(self, Transport::Sse { .. })
    }

    /// Get the port if this is a network transport.
    pub fn port(&self) -> Option<u16> {
        match self {
            Transport::Stdio => None,
            Transport::Sse { port } => Some(*port),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => write!(f, "stdio"),
            Transport::Sse { port } => write!(f, "sse (port {})", port),
        }
    }
}

/// Command-line arguments for transport configuration.
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Transport mode: sse or stdio
    #[arg(long, default_value = "sse", value_parser = parse_transport_mode)]
    pub transport: TransportMode,

    /// Port for the SSE transport (default: 3000, or from PORT env var)
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,
}

/// Transport mode parsed from command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Sse,
    Stdio,
}

fn parse_transport_mode(s: &str) -> Result<TransportMode, String> {
    match s.to_lowercase().as_str() {
        "sse" => Ok(TransportMode::Sse),
        "stdio" => Ok(TransportMode::Stdio),
        _ => Err(format!(
            "Invalid transport mode '{}'. Valid options: sse, stdio",
            s
        )),
    }
}

impl TransportArgs {
    /// Convert command-line arguments into a Transport configuration.
    pub fn into_transport(self) -> Transport {
        match self.transport {
            TransportMode::Sse => Transport::Sse { port: self.port },
            TransportMode::Stdio => Transport::Stdio,
        }
    }
}

impl Default for TransportArgs {
    fn default() -> Self {
        Self {
            transport: TransportMode::Sse,
            port: DEFAULT_PORT,
        }
    }
}
