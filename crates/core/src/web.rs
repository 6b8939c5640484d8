//! Web collaborators: the search engine and the page fetcher.
//!
//! Both are slow and unreliable, so tools only ever reach them through
//! these traits and tests substitute counting fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ToolError;

/// One search engine result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
    /// `og:description` of the page when the engine provides it
    #[serde(default)]
    pub description: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Run one query. Implementations return `ToolError::SearchProvider`
    /// on failure.
    async fn search(&self, query: &str, num_results: usize) -> std::result::Result<Vec<SearchHit>, ToolError>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its readable text. Implementations return
    /// `ToolError::FetchFailure` for no response, status >= 400 or
    /// transport errors.
    async fn fetch(&self, url: &str) -> std::result::Result<String, ToolError>;
}
