//! Tool catalog and dispatch.
//!
//! Every tool has a parameter type (serde + JSON schema), a description and
//! a handler that calls into the [`Facade`]. Arguments are deserialized against
//! their type before any gateway call is made.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use netease_mcp_common::error::Error;
use netease_mcp_common::session::SessionId;
use rmcp::model::{CallToolResult, Content, Tool};
use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info, instrument};

use crate::facade::Facade;

/// What a search looks for. Serialized as the gateway's numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
pub enum SearchType {
    #[default]
    #[serde(rename = "1")]
    Song,
    #[serde(rename = "10")]
    Album,
    #[serde(rename = "100")]
    Artist,
    #[serde(rename = "1000")]
    Playlist,
    #[serde(rename = "1002")]
    User,
    #[serde(rename = "1004")]
    Mv,
    #[serde(rename = "1006")]
    Lyric,
    #[serde(rename = "1009")]
    Radio,
    #[serde(rename = "1014")]
    Video,
    #[serde(rename = "1018")]
    Mixed,
    #[serde(rename = "2000")]
    Voice,
}

impl SearchType {
    pub fn code(self) -> u32 {
        match self {
            SearchType::Song => 1,
            SearchType::Album => 10,
            SearchType::Artist => 100,
            SearchType::Playlist => 1000,
            SearchType::User => 1002,
            SearchType::Mv => 1004,
            SearchType::Lyric => 1006,
            SearchType::Radio => 1009,
            SearchType::Video => 1014,
            SearchType::Mixed => 1018,
            SearchType::Voice => 2000,
        }
    }
}

/// Audio quality for song URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SoundLevel {
    #[default]
    Standard,
    Higher,
    Exhigh,
    Lossless,
    Hires,
    Jyeffect,
    Sky,
    Dolby,
    Jymaster,
}

impl SoundLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SoundLevel::Standard => "standard",
            SoundLevel::Higher => "higher",
            SoundLevel::Exhigh => "exhigh",
            SoundLevel::Lossless => "lossless",
            SoundLevel::Hires => "hires",
            SoundLevel::Jyeffect => "jyeffect",
            SoundLevel::Sky => "sky",
            SoundLevel::Dolby => "dolby",
            SoundLevel::Jymaster => "jymaster",
        }
    }
}

/// Parameters for `search`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SearchParams {
    /// Search keywords.
    pub keywords: String,

    /// Search type: 1 song, 10 album, 100 artist, 1000 playlist, 1002 user,
    /// 1004 MV, 1006 lyric, 1009 radio, 1014 video, 1018 mixed, 2000 voice.
    #[serde(default, rename = "type")]
    pub search_type: SearchType,

    /// Number of results to return.
    #[serde(default = "default_search_limit")]
    pub limit: u32,

    /// Offset for pagination.
    #[serde(default)]
    pub offset: u32,
}

fn default_search_limit() -> u32 {
    30
}

/// Parameters for `get_song_detail`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SongDetailParams {
    /// Song ids to look up.
    pub ids: Vec<u64>,
}

/// Parameters for `get_song_url` and `get_unblocked_url`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SongUrlParams {
    /// Song id.
    pub id: u64,

    /// Audio quality level.
    #[serde(default)]
    pub level: SoundLevel,
}

/// Parameters for tools that take a single id.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct IdParams {
    /// Resource id.
    pub id: u64,
}

/// Parameters for `get_playlist`.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct PlaylistParams {
    /// Playlist id.
    pub id: u64,

    /// Number of tracks to return.
    #[serde(default = "default_playlist_limit")]
    pub limit: u32,

    /// Offset for track pagination.
    #[serde(default)]
    pub offset: u32,
}

fn default_playlist_limit() -> u32 {
    1000
}

/// Failure of a tool invocation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {0} not found")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Api(#[from] Error),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Deserialize tool arguments against their schema type.
///
/// Missing required fields, values outside an enum and non-integer numbers
/// are rejected. Missing arguments count as `{}`.
pub fn parse_params<T: DeserializeOwned>(
    arguments: Option<Map<String, Value>>,
) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// The fixed tool set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicTool {
    Search,
    SongDetail,
    SongUrl,
    UnblockedUrl,
    Lyric,
    Playlist,
    Album,
    Artist,
}

impl MusicTool {
    pub const ALL: [MusicTool; 8] = [
        MusicTool::Search,
        MusicTool::SongDetail,
        MusicTool::SongUrl,
        MusicTool::UnblockedUrl,
        MusicTool::Lyric,
        MusicTool::Playlist,
        MusicTool::Album,
        MusicTool::Artist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MusicTool::Search => "search",
            MusicTool::SongDetail => "get_song_detail",
            MusicTool::SongUrl => "get_song_url",
            MusicTool::UnblockedUrl => "get_unblocked_url",
            MusicTool::Lyric => "get_lyric",
            MusicTool::Playlist => "get_playlist",
            MusicTool::Album => "get_album",
            MusicTool::Artist => "get_artist",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MusicTool::Search => {
                "Search NetEase Cloud Music for songs, albums, artists, playlists and more."
            }
            MusicTool::SongDetail => "Get details for one or more songs by id.",
            MusicTool::SongUrl => "Get the playback URL of a song at the requested quality level.",
            MusicTool::UnblockedUrl => {
                "Get the playback URL of a song, asking the gateway to unblock greyed-out tracks."
            }
            MusicTool::Lyric => "Get the lyrics of a song.",
            MusicTool::Playlist => "Get a playlist's details together with its tracks.",
            MusicTool::Album => "Get an album's details and songs.",
            MusicTool::Artist => "Get an artist's details together with their top songs.",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Catalog entry for `tools/list`.
    pub fn definition(self) -> Tool {
        match self {
            MusicTool::Search => create_tool::<SearchParams>(self),
            MusicTool::SongDetail => create_tool::<SongDetailParams>(self),
            MusicTool::SongUrl | MusicTool::UnblockedUrl => create_tool::<SongUrlParams>(self),
            MusicTool::Lyric | MusicTool::Album | MusicTool::Artist => {
                create_tool::<IdParams>(self)
            }
            MusicTool::Playlist => create_tool::<PlaylistParams>(self),
        }
    }

    /// Validate the arguments and run the tool.
    #[instrument(level = "info", name = "tool_call", skip(self, facade, arguments, session), fields(tool = self.name()))]
    pub async fn invoke(
        self,
        facade: &Facade,
        arguments: Option<Map<String, Value>>,
        session: Option<&SessionId>,
    ) -> Result<CallToolResult, ToolError> {
        let result = match self {
            MusicTool::Search => {
                let p: SearchParams = parse_params(arguments)?;
                info!(keywords = %p.keywords, search_type = p.search_type.code(), "Searching");
                facade
                    .search(&p.keywords, p.search_type.code(), p.limit, p.offset, None, session)
                    .await?
            }
            MusicTool::SongDetail => {
                let p: SongDetailParams = parse_params(arguments)?;
                facade.song_detail(&p.ids, None, session).await?
            }
            MusicTool::SongUrl => {
                let p: SongUrlParams = parse_params(arguments)?;
                facade.song_url(p.id, p.level.as_str(), None, session).await?
            }
            MusicTool::UnblockedUrl => {
                let p: SongUrlParams = parse_params(arguments)?;
                facade
                    .unblocked_song_url(p.id, p.level.as_str(), None, session)
                    .await?
            }
            MusicTool::Lyric => {
                let p: IdParams = parse_params(arguments)?;
                facade.lyric(p.id, None, session).await?
            }
            MusicTool::Playlist => {
                let p: PlaylistParams = parse_params(arguments)?;
                let playlist = facade.playlist_detail(p.id, None, session).await?;
                let tracks = facade
                    .playlist_tracks(p.id, p.limit, p.offset, None, session)
                    .await?;
                json!({ "playlist": playlist, "tracks": tracks })
            }
            MusicTool::Album => {
                let p: IdParams = parse_params(arguments)?;
                facade.album(p.id, None, session).await?
            }
            MusicTool::Artist => {
                let p: IdParams = parse_params(arguments)?;
                let artist = facade.artist_detail(p.id, None, session).await?;
                let top_songs = facade.artist_top_songs(p.id, None, session).await?;
                json!({ "artist": artist, "topSongs": top_songs })
            }
        };

        let text = serde_json::to_string_pretty(&result)?;
        debug!(bytes = text.len(), "Tool completed");
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

impl fmt::Display for MusicTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn create_tool<T: JsonSchema>(tool: MusicTool) -> Tool {
    let schema = schema_for!(T);
    let input_schema = match serde_json::to_value(&schema).unwrap_or_default() {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(Map::new()),
    };

    Tool {
        name: Cow::Borrowed(tool.name()),
        description: Some(Cow::Borrowed(tool.description())),
        input_schema,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }
}

/// Catalog of every tool.
pub fn definitions() -> Vec<Tool> {
    MusicTool::ALL.into_iter().map(MusicTool::definition).collect()
}

/// Look up a tool by name and run it.
///
/// Unknown names fail before any gateway call is made.
pub async fn dispatch(
    facade: &Facade,
    name: &str,
    arguments: Option<Map<String, Value>>,
    session: Option<&SessionId>,
) -> Result<CallToolResult, ToolError> {
    let tool = MusicTool::from_name(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
    tool.invoke(facade, arguments, session).await
}
