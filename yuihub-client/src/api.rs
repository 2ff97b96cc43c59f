//! Typed calls to the YuiHub service.

use tracing::info;

use crate::error::{ClientError, Result};
use crate::executor::RequestExecutor;
use crate::types::{Health, SaveRequest, SaveResponse, SavedNote, SearchResponse, ThreadResponse};

/// Client for the YuiHub endpoints, built on a [`RequestExecutor`].
#[derive(Debug, Clone)]
pub struct YuiHubClient {
    executor: RequestExecutor,
}

impl YuiHubClient {
    pub fn new(executor: RequestExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<Health> {
        self.executor.get("/health", &[]).await
    }

    /// `GET /search?q=&limit=`.
    pub async fn search(&self, query: &str, limit: Option<u32>) -> Result<SearchResponse> {
        let params = [
            ("q", Some(query.to_string())),
            ("limit", limit.map(|l| l.to_string())),
        ];
        self.executor.get("/search", &params).await
    }

    /// `POST /threads/new`, returning the new thread id.
    ///
    /// A reply without a thread id is a [`ClientError::MalformedResponse`].
    pub async fn issue_thread(&self) -> Result<String> {
        let response: ThreadResponse = self
            .executor
            .post("/threads/new", &serde_json::json!({}))
            .await?;

        match response.data {
            Some(data) if response.ok && !data.thread.is_empty() => {
                info!("issued thread {}", data.thread);
                Ok(data.thread)
            }
            _ => Err(ClientError::MalformedResponse(
                "no thread returned by /threads/new".to_string(),
            )),
        }
    }

    /// `POST /save`.
    ///
    /// A reply that is not `ok` or lacks the saved note is a
    /// [`ClientError::MalformedResponse`].
    pub async fn save(&self, request: &SaveRequest) -> Result<SavedNote> {
        let response: SaveResponse = self.executor.post("/save", request).await?;

        match response.data {
            Some(note) if response.ok => {
                info!("saved note {} to {}", note.id, note.thread);
                Ok(note)
            }
            _ => Err(ClientError::MalformedResponse(
                "save was not acknowledged by /save".to_string(),
            )),
        }
    }
}
