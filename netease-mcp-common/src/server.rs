//! MCP Server builder utilities.
//!
//! This module provides a consistent pattern for building and running the
//! MCP server over either transport, with graceful shutdown.
//!
//! # Example
//!
//! ```ignore
//! use netease_mcp_common::server::McpServerBuilder;
//! use netease_mcp_common::transport::Transport;
//!
//! McpServerBuilder::new(sessions)
//!     .with_transport(Transport::sse(3000))
//!     .run()
//!     .await?;
//! ```

use crate::session::SessionHandlerFactory;
use crate::sse::{self, HEALTH_PATH, MESSAGE_PATH, SSE_PATH, SseState};
use crate::transport::Transport;
use rmcp::ServiceExt;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors that can occur when running an MCP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified port
    #[error("Failed to bind to port {port}: {message}")]
    BindFailed { port: u16, message: String },

    /// Transport error during communication
    #[error("Transport error: {0}")]
    Transport(String),

    /// IO error while serving connections
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Builder for configuring and running the MCP server.
pub struct McpServerBuilder<F> {
    factory: F,
    transport: Transport,
    shutdown_rx: Option<oneshot::Receiver<()>>,
}

impl<F> McpServerBuilder<F>
where
    F: SessionHandlerFactory,
{
    /// Create a new server builder around a session handler factory.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            transport: Transport::default(),
            shutdown_rx: None,
        }
    }

    /// Set the transport mode for the server.
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Set a shutdown signal receiver for graceful shutdown.
    ///
    /// When the sender is dropped or a message is sent, the server
    /// will initiate graceful shutdown.
    pub fn with_shutdown(mut self, shutdown_rx: oneshot::Receiver<()>) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    /// Run the MCP server with the configured transport.
    ///
    /// Returns once the server is shut down (via signal or shutdown channel).
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(transport = %self.transport, "Starting MCP server");

        match self.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Sse { port } => self.run_sse(port).await,
        }
    }

    /// Run the server with stdio transport.
    async fn run_stdio(self) -> Result<(), ServerError> {
        use rmcp::transport::io::stdio;

        let shutdown_future = wait_for_shutdown(self.shutdown_rx);

        let service = self
            .factory
            .local()
            .serve(stdio())
            .await
            .map_err(|e| ServerError::Transport(e.to_string()))?;

        tokio::select! {
            result = service.waiting() => {
                result.map_err(|e| ServerError::Transport(e.to_string()))?;
                Ok(())
            }
            _ = shutdown_future => {
                tracing::info!("Received shutdown signal, stopping server");
                Ok(())
            }
        }
    }

    /// Run the server with the SSE session transport.
    async fn run_sse(self, port: u16) -> Result<(), ServerError> {
        let state = SseState::new(self.factory);
        let router = sse::router(state.clone());

        let bind_addr = format!("0.0.0.0:{}", port);
        let tcp_listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ServerError::BindFailed {
                port,
                message: e.to_string(),
            })?;

        tracing::info!(
            port,
            sse = SSE_PATH,
            messages = MESSAGE_PATH,
            health = HEALTH_PATH,
            "SSE server listening"
        );

        // Open event streams only end once their sessions are closed, so
        // close them all before axum waits on in-flight connections.
        let shutdown_rx = self.shutdown_rx;
        let shutdown_future = async move {
            wait_for_shutdown(shutdown_rx).await;
            tracing::info!("Received shutdown signal, closing sessions");
            state.close_all().await;
        };

        axum::serve(tcp_listener, router)
            .with_graceful_shutdown(shutdown_future)
            .await?;

        tracing::info!("SSE server stopped");
        Ok(())
    }
}

async fn wait_for_shutdown(shutdown_rx: Option<oneshot::Receiver<()>>) {
    match shutdown_rx {
        Some(rx) => {
            let _ = rx.await;
        }
        None => wait_for_shutdown_signal().await,
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM");
                    }
                    _ = sigint.recv() => {
                        tracing::info!("Received SIGINT");
                    }
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to register signal handlers, falling back to Ctrl+C");
            }
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

/// Convenience function to set up graceful shutdown handling.
///
/// Returns a sender that can be used to trigger shutdown programmatically,
/// and a receiver to pass to the server builder.
pub fn shutdown_channel() -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
    oneshot::channel()
}
