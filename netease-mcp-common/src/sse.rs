//! SSE session transport.
//!
//! Implements the two-endpoint MCP SSE transport on top of axum:
//!
//! - `GET /sse` opens a session. The first event is `endpoint`, carrying the
//!   URI the client must POST its messages to. Server messages follow as
//!   `message` events.
//! - `POST /messages?sessionId=<id>` delivers one client JSON-RPC message to
//!   the session's MCP service.
//! - `GET /health` is a liveness probe.
//!
//! Each session runs its own rmcp service over a pair of channels. The
//! session is closed when its event stream is dropped (client went away) or
//! when the service stops; closing removes the message route and notifies
//! the [`SessionHandlerFactory`].

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, KeepAliveStream, Sse},
    },
    routing::{get, post},
};
use futures::{SinkExt, Stream, StreamExt, channel::mpsc};
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use rmcp::{ServerHandler, ServiceExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::session::{SessionHandlerFactory, SessionId};

/// Path of the event-stream endpoint.
pub const SSE_PATH: &str = "/sse";
/// Path of the message-delivery endpoint.
pub const MESSAGE_PATH: &str = "/messages";
/// Path of the liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

const CHANNEL_CAPACITY: usize = 64;
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

type Route = mpsc::Sender<ClientJsonRpcMessage>;

/// Message routes of the live sessions, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    routes: Arc<RwLock<HashMap<SessionId, Route>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, session: SessionId, route: Route) {
        self.routes.write().await.insert(session, route);
    }

    async fn route(&self, session: &str) -> Option<Route> {
        self.routes.read().await.get(session).cloned()
    }

    /// Remove a session's route. Returns `false` if it was already gone.
    pub async fn remove(&self, session: &SessionId) -> bool {
        self.routes.write().await.remove(session).is_some()
    }

    /// Check whether a session is live.
    pub async fn contains(&self, session: &str) -> bool {
        self.routes.read().await.contains_key(session)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn drain(&self) -> Vec<SessionId> {
        self.routes.write().await.drain().map(|(id, _)| id).collect()
    }
}

/// Shared state of the SSE router.
#[derive(Clone)]
pub struct SseState<F> {
    factory: F,
    sessions: SessionRegistry,
}

impl<F: SessionHandlerFactory> SseState<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            sessions: SessionRegistry::new(),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Close one session. Idempotent: the factory is notified only once.
    pub async fn close(&self, session: &SessionId) {
        if self.sessions.remove(session).await {
            self.factory.close(session).await;
            info!(session = %session, "Session closed");
        }
    }

    /// Close every live session, ending their event streams.
    pub async fn close_all(&self) {
        let sessions = self.sessions.drain().await;
        for session in &sessions {
            self.factory.close(session).await;
        }
        if !sessions.is_empty() {
            info!(count = sessions.len(), "Closed all sessions");
        }
    }
}

/// Build the axum router serving the SSE transport.
pub fn router<F: SessionHandlerFactory>(state: SseState<F>) -> Router {
    Router::new()
        .route(SSE_PATH, get(open_session::<F>))
        .route(MESSAGE_PATH, post(deliver_message::<F>))
        .route(HEALTH_PATH, get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Extract the credential from an `Authorization: Bearer <token>` header.
///
/// Returns `None` for other schemes and for an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// URI a session's client must POST its messages to.
pub fn endpoint_uri(session: &SessionId) -> String {
    format!(
        "{}?sessionId={}",
        MESSAGE_PATH,
        urlencoding::encode(session.as_str())
    )
}

pub(crate) async fn open_session<F: SessionHandlerFactory>(
    State(state): State<SseState<F>>,
    headers: HeaderMap,
) -> Sse<KeepAliveStream<SessionStream<F>>> {
    let session = SessionId::generate();
    let bearer = bearer_token(&headers);
    info!(session = %session, authenticated = bearer.is_some(), "New SSE connection");

    // Register the route and arm the guard before the factory sees the
    // session, so a connection dropped mid-open is still closed.
    let (client_tx, client_rx) = mpsc::channel::<ClientJsonRpcMessage>(CHANNEL_CAPACITY);
    let (server_tx, server_rx) = mpsc::channel::<ServerJsonRpcMessage>(CHANNEL_CAPACITY);
    state.sessions.insert(session.clone(), client_tx).await;
    let guard = SessionGuard {
        session: session.clone(),
        state: state.clone(),
    };

    let handler = state.factory.open(&session, bearer).await;
    tokio::spawn(run_service(session.clone(), handler, server_tx, client_rx));

    let endpoint = Event::default().event("endpoint").data(endpoint_uri(&session));
    let stream = SessionStream {
        endpoint: Some(endpoint),
        messages: server_rx,
        guard,
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

/// Serve one session until its inbound route is dropped or the client quits.
async fn run_service<H: ServerHandler>(
    session: SessionId,
    handler: H,
    outbound: mpsc::Sender<ServerJsonRpcMessage>,
    inbound: mpsc::Receiver<ClientJsonRpcMessage>,
) {
    match handler.serve((outbound, inbound)).await {
        Ok(service) => {
            if let Err(e) = service.waiting().await {
                warn!(session = %session, error = %e, "MCP service task failed");
            }
        }
        Err(e) => {
            warn!(session = %session, error = %e, "MCP session ended before initialization");
        }
    }
    debug!(session = %session, "MCP service stopped");
}

/// Query string of `POST /messages`.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

async fn deliver_message<F: SessionHandlerFactory>(
    State(state): State<SseState<F>>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| !id.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing sessionId").into_response();
    };

    let Some(mut route) = state.sessions.route(&session_id).await else {
        debug!(session = %session_id, "Message for unknown session");
        return (StatusCode::NOT_FOUND, "Session not found").into_response();
    };

    let message: ClientJsonRpcMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON-RPC message: {}", e),
            )
                .into_response();
        }
    };

    if route.send(message).await.is_err() {
        return (StatusCode::GONE, "Session closed").into_response();
    }

    StatusCode::ACCEPTED.into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Closes its session when dropped.
struct SessionGuard<F: SessionHandlerFactory> {
    session: SessionId,
    state: SseState<F>,
}

impl<F: SessionHandlerFactory> Drop for SessionGuard<F> {
    fn drop(&mut self) {
        let session = self.session.clone();
        let state = self.state.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { state.close(&session).await });
            }
            Err(_) => warn!(session = %session, "No runtime available to close session"),
        }
    }
}

/// Event stream of one session: the endpoint event, then server messages.
pub struct SessionStream<F: SessionHandlerFactory> {
    endpoint: Option<Event>,
    messages: mpsc::Receiver<ServerJsonRpcMessage>,
    guard: SessionGuard<F>,
}

// No field is structurally pinned.
impl<F: SessionHandlerFactory> Unpin for SessionStream<F> {}

impl<F: SessionHandlerFactory> SessionStream<F> {
    pub fn session(&self) -> &SessionId {
        &self.guard.session
    }
}

impl<F: SessionHandlerFactory> Stream for SessionStream<F> {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(endpoint) = self.endpoint.take() {
            return Poll::Ready(Some(Ok(endpoint)));
        }

        loop {
            match self.messages.poll_next_unpin(cx) {
                Poll::Ready(Some(message)) => {
                    match Event::default().event("message").json_data(&message) {
                        Ok(event) => return Poll::Ready(Some(Ok(event))),
                        Err(e) => {
                            warn!(session = %self.guard.session, error = %e, "Dropping unserializable message");
                        }
                    }
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
