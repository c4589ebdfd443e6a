//! Resource search: web hits for a subtopic, classified by domain.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::errors::AppError;
use crate::models::roadmap::{Resource, ResourceType};

const SERPER_URL: &str = "https://google.serper.dev/search";
const HITS_CONSIDERED: usize = 3;
const RESOURCES_KEPT: usize = 2;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    /// The provider answered with a non-2xx status.
    #[error("search returned status {0}")]
    Status(u16),
    #[error("search request failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

pub struct SerperClient {
    client: Client,
    api_key: String,
}

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SearchHit>,
}

impl SerperClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl WebSearch for SerperClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .post(SERPER_URL)
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query }))
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let parsed: SerperResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Ok(parsed.organic)
    }
}

pub fn resource_query(subtopic: &str, goal: &str) -> String {
    format!("{subtopic} {goal} site:youtube.com OR site:coursera.org OR free learning")
}

/// At most two resources from the top three hits. A non-2xx answer becomes a single
/// "Search failed" placeholder whose url is the status code; transport failures propagate.
pub async fn find_resources(
    search: &dyn WebSearch,
    subtopic: &str,
    goal: &str,
) -> Result<Vec<Resource>, AppError> {
    let query = resource_query(subtopic, goal);
    match search.search(&query).await {
        Ok(hits) => Ok(hits
            .into_iter()
            .take(HITS_CONSIDERED)
            .map(|hit| Resource {
                kind: ResourceType::classify(&hit.link),
                title: hit.title,
                url: hit.link,
                completed: false,
            })
            .take(RESOURCES_KEPT)
            .collect()),
        Err(SearchError::Status(code)) => {
            tracing::warn!(status = code, subtopic, "resource search degraded");
            Ok(vec![Resource {
                kind: ResourceType::Other,
                title: "Search failed".to_string(),
                url: code.to_string(),
                completed: false,
            }])
        }
        Err(SearchError::Transport(e)) => Err(AppError::Search(e)),
    }
}
