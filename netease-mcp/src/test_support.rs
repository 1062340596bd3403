//! In-memory `MusicApi` used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use netease_mcp_common::error::Error;
use serde_json::{Value, json};

use crate::api::{ApiRequest, Endpoint, MusicApi};

/// Records every call and answers from canned responses.
///
/// Endpoints without a canned response echo `{"code": 200}`. Endpoints
/// marked with [`RecordingApi::fail`] return a 500 API error.
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<ApiRequest>>,
    responses: HashMap<Endpoint, Value>,
    failing: HashSet<Endpoint>,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, endpoint: Endpoint, body: Value) -> Self {
        self.responses.insert(endpoint, body);
        self
    }

    pub fn fail(mut self, endpoint: Endpoint) -> Self {
        self.failing.insert(endpoint);
        self
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.calls().into_iter().map(|c| c.endpoint).collect()
    }
}

#[async_trait]
impl MusicApi for RecordingApi {
    async fn call(&self, request: ApiRequest) -> Result<Value, Error> {
        let endpoint = request.endpoint;
        self.calls.lock().unwrap().push(request);

        if self.failing.contains(&endpoint) {
            return Err(Error::api(
                format!("http://gateway.test{}", endpoint),
                500,
                "gateway exploded",
            ));
        }

        Ok(self
            .responses
            .get(&endpoint)
            .cloned()
            .unwrap_or_else(|| json!({"code": 200})))
    }
}
