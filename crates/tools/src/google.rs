//! Google Custom Search JSON API client.

use async_trait::async_trait;
use quarry_config::SearchConfig;
use quarry_core::error::ToolError;
use quarry_core::web::{SearchHit, SearchProvider};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// The API refuses more than ten results per request.
const MAX_NUM: usize = 10;

pub struct GoogleSearchProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
}

impl GoogleSearchProvider {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::SearchProvider(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: ENDPOINT.to_string(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
        })
    }

    /// Build from config, failing if credentials are missing.
    pub fn from_config(config: &SearchConfig) -> Result<Self, ToolError> {
        match (&config.api_key, &config.engine_id) {
            (Some(key), Some(cx)) if !key.is_empty() && !cx.is_empty() => Self::new(key, cx),
            _ => Err(ToolError::SearchProvider(
                "Google API key or Search Engine ID not configured".into(),
            )),
        }
    }

    /// Point at a different endpoint (tests, proxies).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    pagemap: Option<PageMap>,
}

#[derive(Deserialize)]
struct PageMap {
    #[serde(default)]
    metatags: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl Item {
    fn into_hit(self) -> SearchHit {
        let description = self
            .pagemap
            .as_ref()
            .and_then(|p| p.metatags.first())
            .and_then(|tags| tags.get("og:description"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        SearchHit {
            title: self.title,
            link: self.link,
            snippet: self.snippet,
            description,
        }
    }
}

fn parse_response(body: &str) -> Result<Vec<SearchHit>, ToolError> {
    let parsed: SearchResponse = serde_json::from_str(body)
        .map_err(|e| ToolError::SearchProvider(format!("unreadable search response: {e}")))?;
    Ok(parsed.items.into_iter().map(Item::into_hit).collect())
}

#[async_trait]
impl SearchProvider for GoogleSearchProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        let num = num_results.clamp(1, MAX_NUM).to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::SearchProvider(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::SearchProvider(e.to_string()))?;
        if !status.is_success() {
            return Err(ToolError::SearchProvider(format!("HTTP {status}: {body}")));
        }

        let hits = parse_response(&body)?;
        debug!(query = %query, hits = hits.len(), "Search completed");
        Ok(hits)
    }
}

/// Stands in when no credentials are configured; every query fails.
pub struct UnconfiguredSearch;

#[async_trait]
impl SearchProvider for UnconfiguredSearch {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn search(&self, _query: &str, _num_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        Err(ToolError::SearchProvider(
            "Google API key or Search Engine ID not configured".into(),
        ))
    }
}
