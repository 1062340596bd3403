//! Typed operations over the music gateway.
//!
//! Each operation resolves a cookie, builds one [`ApiRequest`] and returns
//! the gateway body untouched. Errors are propagated as-is.

use std::sync::Arc;

use netease_mcp_common::error::Error;
use netease_mcp_common::session::SessionId;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::api::{ApiRequest, Endpoint, MusicApi};
use crate::cookie::CookieStore;

/// Music operations shared by every session.
#[derive(Clone)]
pub struct Facade {
    api: Arc<dyn MusicApi>,
    cookies: CookieStore,
}

impl Facade {
    pub fn new(api: Arc<dyn MusicApi>, cookies: CookieStore) -> Self {
        Self { api, cookies }
    }

    /// Cookie store backing this facade.
    pub fn cookies(&self) -> &CookieStore {
        &self.cookies
    }

    async fn send(
        &self,
        request: ApiRequest,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let cookie = self.cookies.resolve_with(cookie, session).await;
        debug!(endpoint = %request.endpoint, session = ?session.map(SessionId::as_str), "Dispatching gateway call");
        self.api.call(request.with_cookie(cookie)).await
    }

    /// Search songs, albums, artists, playlists and more.
    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn search(
        &self,
        keywords: &str,
        search_type: u32,
        limit: u32,
        offset: u32,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let request = ApiRequest::new(Endpoint::CloudSearch)
            .param("keywords", keywords)
            .param("type", search_type)
            .param("limit", limit)
            .param("offset", offset);
        self.send(request, cookie, session).await
    }

    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn song_detail(
        &self,
        ids: &[u64],
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let ids = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let request = ApiRequest::new(Endpoint::SongDetail).param("ids", ids);
        self.send(request, cookie, session).await
    }

    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn song_url(
        &self,
        id: u64,
        level: &str,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let request = ApiRequest::new(Endpoint::SongUrl)
            .param("id", id)
            .param("level", level);
        self.send(request, cookie, session).await
    }

    /// Like [`Facade::song_url`], asking the gateway to unblock greyed-out tracks.
    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn unblocked_song_url(
        &self,
        id: u64,
        level: &str,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let request = ApiRequest::new(Endpoint::SongUrl)
            .param("id", id)
            .param("level", level)
            .param("unblock", true);
        self.send(request, cookie, session).await
    }

    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn lyric(
        &self,
        id: u64,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let request = ApiRequest::new(Endpoint::Lyric).param("id", id);
        self.send(request, cookie, session).await
    }

    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn playlist_detail(
        &self,
        id: u64,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let request = ApiRequest::new(Endpoint::PlaylistDetail).param("id", id);
        self.send(request, cookie, session).await
    }

    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn playlist_tracks(
        &self,
        id: u64,
        limit: u32,
        offset: u32,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let request = ApiRequest::new(Endpoint::PlaylistTracks)
            .param("id", id)
            .param("limit", limit)
            .param("offset", offset);
        self.send(request, cookie, session).await
    }

    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn album(
        &self,
        id: u64,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let request = ApiRequest::new(Endpoint::Album).param("id", id);
        self.send(request, cookie, session).await
    }

    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn artist_detail(
        &self,
        id: u64,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let request = ApiRequest::new(Endpoint::ArtistDetail).param("id", id);
        self.send(request, cookie, session).await
    }

    #[instrument(level = "debug", skip(self, cookie, session))]
    pub async fn artist_top_songs(
        &self,
        id: u64,
        cookie: Option<&str>,
        session: Option<&SessionId>,
    ) -> Result<Value, Error> {
        let request = ApiRequest::new(Endpoint::ArtistTopSongs).param("id", id);
        self.send(request, cookie, session).await
    }
}
