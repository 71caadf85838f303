use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use aura_core::test_helpers::sample_words;
use aura_core::track::{SourceRef, TrackInfo};

use aura_server::config::ServerConfig;
use aura_server::media::{MediaIndex, ResolveError};
use aura_server::state::{AppState, Collaborators};
use aura_server::store::{MemoryNotes, MemoryStore};
use aura_server::voice::LoggingVoice;
use aura_server::{build_app_with, spawn_sweeper};

/// Media index with a fixed catalogue:
/// - `nothing` resolves to no tracks
/// - `broken` makes the index fail
/// - sources starting with `dead` have no stream
/// - playlist URLs expand to three entries
pub struct FakeIndex;

#[async_trait]
impl MediaIndex for FakeIndex {
    async fn resolve(&self, query: &str) -> Result<Vec<TrackInfo>, ResolveError> {
        match query {
            "nothing" => Ok(Vec::new()),
            "broken" => Err(ResolveError::Failed("index offline".into())),
            _ => Ok(vec![TrackInfo::new(query, query)]),
        }
    }

    async fn resolve_playlist(&self, _url: &str) -> Result<Vec<TrackInfo>, ResolveError> {
        Ok(vec![
            TrackInfo::new("Intro", "intro"),
            TrackInfo::new("Dead Air", "dead-air"),
            TrackInfo::new("Outro", "outro"),
        ])
    }

    async fn stream_source(&self, source: &SourceRef) -> Result<String, ResolveError> {
        if source.0.starts_with("dead") {
            return Err(ResolveError::NoStream(source.clone()));
        }
        Ok(format!("https://cdn.test/{}", source.0))
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub client: reqwest::Client,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with in-memory collaborators.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let collaborators = Collaborators {
            media: Arc::new(FakeIndex),
            voice: Arc::new(LoggingVoice::new()),
            settings: Arc::new(MemoryStore::new()),
            notes: Arc::new(MemoryNotes::new()),
            words: sample_words(),
        };
        let (app, state) = build_app_with(config, collaborators);
        spawn_sweeper(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            client: reqwest::Client::new(),
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    /// POST a JSON body, returning the status and parsed response.
    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    /// POST with an empty JSON object.
    pub async fn post_empty(&self, path: &str) -> (u16, Value) {
        self.post(path, serde_json::json!({})).await
    }

    pub async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    pub async fn delete(&self, path: &str) -> (u16, Value) {
        let resp = self.client.delete(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    /// Submit one move, returning the status and parsed response.
    pub async fn play_move(&self, key: &str, actor: u64, action: &str, value: Value) -> (u16, Value) {
        self.post(
            &format!("/api/v1/sessions/{key}/moves"),
            serde_json::json!({ "actor": actor, "action": action, "value": value }),
        )
        .await
    }

    /// Poll the guild's queue until `check` passes (2s timeout).
    pub async fn wait_for_queue(&self, guild: u64, check: impl Fn(&Value) -> bool) -> Value {
        let path = format!("/api/v1/guilds/{guild}/queue");
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let (_, body) = self.get(&path).await;
                if check(&body) {
                    return body;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Timed out waiting for queue state")
    }
}
