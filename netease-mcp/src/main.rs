//! NetEase Cloud Music MCP Server
//!
//! MCP server exposing the NetEase Cloud Music API over SSE or stdio.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use netease_mcp::{CookieStore, Facade, NeteaseClient, NeteaseSessions};
use netease_mcp_common::tracing::init_tracing;
use netease_mcp_common::{Config, McpServerBuilder, TransportArgs};

#[derive(Parser, Debug)]
#[command(name = "netease-mcp")]
#[command(about = "MCP server for the NetEase Cloud Music API with per-session cookies")]
struct Args {
    #[command(flatten)]
    transport: TransportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    tracing::info!("netease-mcp server starting...");

    let args = Args::parse();
    let config = Config::from_env()?;
    let client = Arc::new(NeteaseClient::new(&config)?);

    // Settle the global cookie before any session can connect
    let cookies = CookieStore::new();
    cookies
        .bootstrap(config.cookie.as_deref(), client.as_ref())
        .await;

    let facade = Arc::new(Facade::new(client, cookies));
    let transport = args.transport.into_transport();

    McpServerBuilder::new(NeteaseSessions::new(facade))
        .with_transport(transport)
        .run()
        .await?;

    Ok(())
}
