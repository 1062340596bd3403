//! MCP server for NetEase Cloud Music.
//!
//! This module provides the MCP server handler that exposes the music tools
//! and the session factory that wires SSE connections to cookies.

use std::sync::Arc;

use async_trait::async_trait;
use netease_mcp_common::error::Error;
use netease_mcp_common::session::{SessionHandlerFactory, SessionId};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    model::{CallToolResult, ErrorCode, ListToolsResult, ServerCapabilities, ServerInfo},
};
use serde_json::json;
use tracing::{debug, info};

use crate::facade::Facade;
use crate::tools::{self, ToolError};

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(_) => McpError::new(ErrorCode::METHOD_NOT_FOUND, err.to_string(), None),
            ToolError::InvalidParams(_) => McpError::invalid_params(err.to_string(), None),
            ToolError::Api(Error::Api {
                ref endpoint,
                status_code,
                ..
            }) => McpError::internal_error(
                err.to_string(),
                Some(json!({ "endpoint": endpoint, "status": status_code })),
            ),
            ToolError::Api(_) | ToolError::Serialize(_) => {
                McpError::internal_error(err.to_string(), None)
            }
        }
    }
}

/// MCP server bound to one session (or to none, for stdio).
#[derive(Clone)]
pub struct NeteaseServer {
    facade: Arc<Facade>,
    session: Option<SessionId>,
}

impl NeteaseServer {
    pub fn new(facade: Arc<Facade>, session: Option<SessionId>) -> Self {
        Self { facade, session }
    }

    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }
}

impl ServerHandler for NeteaseServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "NetEase Cloud Music server. Use search to find songs, albums, artists and \
                 playlists, then the get_* tools to fetch details, playback URLs and lyrics."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            debug!("Listing tools");
            Ok(ListToolsResult {
                tools: tools::definitions(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            tools::dispatch(
                &self.facade,
                params.name.as_ref(),
                params.arguments,
                self.session.as_ref(),
            )
            .await
            .map_err(McpError::from)
        }
    }
}

/// Builds a [`NeteaseServer`] per SSE session and keeps session cookies in step.
#[derive(Clone)]
pub struct NeteaseSessions {
    facade: Arc<Facade>,
}

impl NeteaseSessions {
    pub fn new(facade: Arc<Facade>) -> Self {
        Self { facade }
    }
}

#[async_trait]
impl SessionHandlerFactory for NeteaseSessions {
    type Handler = NeteaseServer;

    fn local(&self) -> NeteaseServer {
        NeteaseServer::new(self.facade.clone(), None)
    }

    async fn open(&self, session: &SessionId, bearer: Option<String>) -> NeteaseServer {
        match bearer {
            Some(cookie) => {
                self.facade.cookies().set_for_session(session, cookie).await;
                info!(session = %session, "Session opened with its own cookie");
            }
            None => info!(session = %session, "Session opened with the global cookie"),
        }
        NeteaseServer::new(self.facade.clone(), Some(session.clone()))
    }

    async fn close(&self, session: &SessionId) {
        let had_cookie = self.facade.cookies().remove_session(session).await;
        info!(session = %session, had_cookie, "Session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Endpoint;
    use crate::cookie::CookieStore;
    use crate::test_support::RecordingApi;

    fn sessions_with(api: RecordingApi) -> (NeteaseSessions, Arc<Facade>) {
        let facade = Arc::new(Facade::new(Arc::new(api), CookieStore::new()));
        (NeteaseSessions::new(facade.clone()), facade)
    }

    #[test]
    fn test_server_info() {
        let (sessions, _) = sessions_with(RecordingApi::new());
        let info = sessions.local().get_info();
        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
    }

    #[tokio::test]
    async fn test_open_with_bearer_sets_session_cookie() {
        let (sessions, facade) = sessions_with(RecordingApi::new());
        facade.cookies().set_global("global").await;
        let session = SessionId::generate();

        let server = sessions.open(&session, Some("MUSIC_U=abc".to_string())).await;

        assert_eq!(server.session(), Some(&session));
        assert_eq!(facade.cookies().resolve(Some(&session)).await, "MUSIC_U=abc");
    }

    #[tokio::test]
    async fn test_open_without_bearer_uses_global() {
        let (sessions, facade) = sessions_with(RecordingApi::new());
        facade.cookies().set_global("global").await;
        let session = SessionId::generate();

        sessions.open(&session, None).await;

        assert_eq!(facade.cookies().session_count().await, 0);
        assert_eq!(facade.cookies().resolve(Some(&session)).await, "global");
    }

    #[tokio::test]
    async fn test_close_removes_session_cookie() {
        let (sessions, facade) = sessions_with(RecordingApi::new());
        facade.cookies().set_global("global").await;
        let session = SessionId::generate();
        sessions.open(&session, Some("MUSIC_U=abc".to_string())).await;

        sessions.close(&session).await;

        assert_eq!(facade.cookies().session_count().await, 0);
        assert_eq!(facade.cookies().resolve(Some(&session)).await, "global");
    }

    #[test]
    fn test_local_handler_has_no_session() {
        let (sessions, _) = sessions_with(RecordingApi::new());
        assert!(sessions.local().session().is_none());
    }

    #[test]
    fn test_not_found_maps_to_method_not_found() {
        let err: McpError = ToolError::NotFound("get_mv".to_string()).into();
        assert_eq!(err.code, ErrorCode::METHOD_NOT_FOUND);
        assert!(err.message.contains("get_mv"));
    }

    #[test]
    fn test_invalid_params_maps_to_invalid_params() {
        let err: McpError = ToolError::InvalidParams("id: missing".to_string()).into();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_api_error_carries_endpoint_and_status() {
        let api = Error::api(format!("http://gw{}", Endpoint::Album), 503, "busy");
        let err: McpError = ToolError::Api(api).into();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        let data = err.data.expect("error data");
        assert_eq!(data["endpoint"], "http://gw/album");
        assert_eq!(data["status"], 503);
    }

    #[test]
    fn test_timeout_maps_to_internal_error() {
        let err: McpError = ToolError::Api(Error::timeout(30)).into();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.data.is_none());
    }
}
