//! NetEase Cloud Music MCP Server Library
//!
//! Exposes the NetEase Cloud Music API as MCP tools. Each SSE session may
//! bring its own cookie through a bearer header; otherwise the global cookie
//! is used.

pub mod api;
pub mod cookie;
pub mod facade;
pub mod server;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use api::{ApiRequest, Endpoint, MusicApi, NeteaseClient};
pub use cookie::CookieStore;
pub use facade::Facade;
pub use server::{NeteaseServer, NeteaseSessions};
pub use tools::{MusicTool, ToolError};
