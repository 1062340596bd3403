//! Cookie store for gateway credentials.
//!
//! Holds one global fallback cookie plus one entry per SSE session. Lookups
//! never fail; an empty string simply means "no credential".

use std::collections::HashMap;
use std::sync::Arc;

use netease_mcp_common::session::SessionId;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::api::{ApiRequest, Endpoint, MusicApi};

/// Global and per-session cookies.
#[derive(Clone, Default)]
pub struct CookieStore {
    global: Arc<RwLock<String>>,
    sessions: Arc<RwLock<HashMap<SessionId, String>>>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the global fallback cookie.
    pub async fn set_global(&self, cookie: impl Into<String>) {
        *self.global.write().await = cookie.into();
    }

    pub async fn global(&self) -> String {
        self.global.read().await.clone()
    }

    /// Insert or replace the cookie for a session.
    pub async fn set_for_session(&self, session: &SessionId, cookie: impl Into<String>) {
        self.sessions
            .write()
            .await
            .insert(session.clone(), cookie.into());
    }

    /// Drop the cookie for a session. Returns whether an entry existed.
    pub async fn remove_session(&self, session: &SessionId) -> bool {
        self.sessions.write().await.remove(session).is_some()
    }

    /// Session cookie if one was set, else the global cookie.
    pub async fn resolve(&self, session: Option<&SessionId>) -> String {
        self.resolve_with(None, session).await
    }

    /// Resolve the cookie for one call.
    ///
    /// Precedence: a non-empty `override_cookie`, then the session entry,
    /// then the global cookie.
    pub async fn resolve_with(
        &self,
        override_cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> String {
        if let Some(cookie) = override_cookie.filter(|c| !c.is_empty()) {
            return cookie.to_string();
        }

        if let Some(session) = session {
            if let Some(cookie) = self.sessions.read().await.get(session) {
                return cookie.clone();
            }
        }

        self.global().await
    }

    /// Number of sessions with their own cookie.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Install the startup credential.
    ///
    /// A configured cookie always wins and no anonymous registration is
    /// attempted. Otherwise the gateway's anonymous registration is called;
    /// on failure the global cookie stays empty and startup continues.
    #[instrument(level = "info", name = "cookie_bootstrap", skip_all)]
    pub async fn bootstrap(&self, configured: Option<&str>, api: &dyn MusicApi) {
        if let Some(cookie) = configured.filter(|c| !c.trim().is_empty()) {
            self.set_global(cookie).await;
            info!("Using configured global cookie");
            return;
        }

        match api.call(ApiRequest::new(Endpoint::RegisterAnonymous)).await {
            Ok(body) => match body.get("cookie").and_then(|c| c.as_str()) {
                Some(cookie) if !cookie.is_empty() => {
                    self.set_global(cookie).await;
                    info!("Registered anonymous global cookie");
                }
                _ => warn!("Anonymous registration returned no cookie; continuing without one"),
            },
            Err(e) => {
                warn!(error = %e, "Anonymous registration failed; continuing without a cookie")
            }
        }
    }
}
