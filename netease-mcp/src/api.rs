//! NetEase Cloud Music gateway client.
//!
//! The gateway is a NeteaseCloudMusicApi-compatible HTTP service. Every call
//! is a `POST {base}{route}` with a form body made of the route's parameters
//! plus the resolved `cookie`. Response bodies are returned verbatim as JSON.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use netease_mcp_common::config::Config;
use netease_mcp_common::error::Error;
use serde_json::Value;
use tracing::{debug, instrument};

/// Gateway routes used by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CloudSearch,
    SongDetail,
    SongUrl,
    Lyric,
    PlaylistDetail,
    PlaylistTracks,
    Album,
    ArtistDetail,
    ArtistTopSongs,
    RegisterAnonymous,
}

impl Endpoint {
    /// Route path on the gateway.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::CloudSearch => "/cloudsearch",
            Endpoint::SongDetail => "/song/detail",
            Endpoint::SongUrl => "/song/url/v1",
            Endpoint::Lyric => "/lyric/new",
            Endpoint::PlaylistDetail => "/playlist/detail",
            Endpoint::PlaylistTracks => "/playlist/track/all",
            Endpoint::Album => "/album",
            Endpoint::ArtistDetail => "/artist/detail",
            Endpoint::ArtistTopSongs => "/artist/top/song",
            // Upstream spelling
            Endpoint::RegisterAnonymous => "/register/anonimous",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// One gateway call: route, ordered parameters and the cookie to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub endpoint: Endpoint,
    pub params: Vec<(&'static str, String)>,
    /// Empty means "no credential"; the field is then omitted on the wire.
    pub cookie: String,
}

impl ApiRequest {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
            cookie: String::new(),
        }
    }

    /// Append a parameter.
    pub fn param(mut self, name: &'static str, value: impl ToString) -> Self {
        self.params.push((name, value.to_string()));
        self
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }

    /// Look up a parameter value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Form fields sent on the wire, cookie last.
    pub fn form(&self) -> Vec<(&'static str, &str)> {
        let mut form: Vec<(&'static str, &str)> = self
            .params
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .collect();
        if !self.cookie.is_empty() {
            form.push(("cookie", self.cookie.as_str()));
        }
        form
    }
}

/// External music API.
///
/// Implementations return the response body untouched and surface every
/// failure as an error; callers never retry.
#[async_trait]
pub trait MusicApi: Send + Sync {
    async fn call(&self, request: ApiRequest) -> Result<Value, Error>;
}

/// HTTP client for a NeteaseCloudMusicApi gateway.
pub struct NeteaseClient {
    config: Config,
    http: reqwest::Client,
}

impl NeteaseClient {
    /// Create a client for the gateway named in the configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                Error::api(&config.api_base_url, 0, format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            config: config.clone(),
            http,
        })
    }

    /// Full URL of a gateway route.
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        self.config.endpoint_url(endpoint.path())
    }
}

#[async_trait]
impl MusicApi for NeteaseClient {
    #[instrument(level = "debug", name = "netease_call", skip_all, fields(endpoint = %request.endpoint))]
    async fn call(&self, request: ApiRequest) -> Result<Value, Error> {
        let url = self.endpoint_url(request.endpoint);
        debug!(params = request.params.len(), has_cookie = !request.cookie.is_empty(), "Calling gateway");

        let response = self
            .http
            .post(&url)
            .form(&request.form())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(self.config.request_timeout_secs)
                } else {
                    Error::api(&url, 0, format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::api(&url, status.as_u16(), format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            return Err(Error::api(&url, status.as_u16(), body));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::api(
                &url,
                status.as_u16(),
                format!(
                    "Failed to parse response: {}. Raw: {}",
                    e,
                    body.chars().take(500).collect::<String>()
                ),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout_secs: u64) -> NeteaseClient {
        let config = Config {
            api_base_url: server.uri(),
            cookie: None,
            request_timeout_secs: timeout_secs,
        };
        NeteaseClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::CloudSearch.path(), "/cloudsearch");
        assert_eq!(Endpoint::SongUrl.path(), "/song/url/v1");
        assert_eq!(Endpoint::PlaylistTracks.path(), "/playlist/track/all");
        assert_eq!(Endpoint::ArtistTopSongs.to_string(), "/artist/top/song");
        assert_eq!(Endpoint::RegisterAnonymous.path(), "/register/anonimous");
    }

    #[test]
    fn test_form_omits_empty_cookie() {
        let request = ApiRequest::new(Endpoint::Lyric).param("id", 42);
        assert_eq!(request.form(), vec![("id", "42")]);

        let request = request.with_cookie("MUSIC_U=x");
        assert_eq!(request.form(), vec![("id", "42"), ("cookie", "MUSIC_U=x")]);
        assert_eq!(request.get("id"), Some("42"));
        assert_eq!(request.get("level"), None);
    }

    #[tokio::test]
    async fn test_call_forwards_params_and_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/lyric/new"))
            .and(body_string_contains("id=186016"))
            .and(body_string_contains("cookie=MUSIC_U%3Dabc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "lrc": {"lyric": "..."}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, 5);
        let body = client
            .call(ApiRequest::new(Endpoint::Lyric).param("id", 186016).with_cookie("MUSIC_U=abc"))
            .await
            .unwrap();
        assert_eq!(body["code"], 200);
        assert_eq!(body["lrc"]["lyric"], "...");
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/album"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = client_for(&server, 5);
        let err = client
            .call(ApiRequest::new(Endpoint::Album).param("id", 1))
            .await
            .unwrap_err();
        match err {
            Error::Api { endpoint, status_code, message } => {
                assert!(endpoint.ends_with("/album"));
                assert_eq!(status_code, 502);
                assert_eq!(message, "upstream down");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/artist/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, 5);
        let err = client
            .call(ApiRequest::new(Endpoint::ArtistDetail).param("id", 7))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(200));
        assert!(err.to_string().contains("Failed to parse response"));
    }

    #[tokio::test]
    async fn test_slow_gateway_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/album"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 200}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, 1);
        let err = client
            .call(ApiRequest::new(Endpoint::Album).param("id", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(1)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_status_zero() {
        let config = Config {
            api_base_url: "http://127.0.0.1:9".to_string(),
            cookie: None,
            request_timeout_secs: 5,
        };
        let client = NeteaseClient::new(&config).unwrap();
        let err = client
            .call(ApiRequest::new(Endpoint::Album).param("id", 1))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(0));
    }
}
