//! Session identity and the per-session handler seam.
//!
//! A session is one logical client connection over the SSE transport. The
//! transport owns the session lifecycle (create on `GET /sse`, close when the
//! event stream drops) and asks a [`SessionHandlerFactory`] to build the MCP
//! handler bound to each session.

use std::borrow::Borrow;
use std::fmt;

use async_trait::async_trait;
use rmcp::ServerHandler;
use uuid::Uuid;

/// Opaque session identifier assigned to each inbound connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Builds MCP handlers for sessions and observes their lifecycle.
///
/// `open` runs once per connection before any message is routed, with the
/// bearer credential presented on connect (if any). `close` runs once after
/// the connection is gone, including a connection dropped while `open` was
/// still running; no message for that session is routed afterwards.
#[async_trait]
pub trait SessionHandlerFactory: Clone + Send + Sync + 'static {
    /// Handler type served for each session.
    type Handler: ServerHandler + Clone + Send + Sync + 'static;

    /// Handler for the single, unauthenticated stdio session.
    fn local(&self) -> Self::Handler;

    /// Open a network session and return the handler bound to it.
    async fn open(&self, session: &SessionId, bearer: Option<String>) -> Self::Handler;

    /// Release everything held for a closed session.
    async fn close(&self, session: &SessionId);
}
