//! `search`: run up to three web queries and merge the references.

use async_trait::async_trait;
use quarry_cache::Blacklist;
use quarry_core::error::ToolError;
use quarry_core::tool::{SideEffect, Tool, ToolContext, ToolResult, required_str};
use quarry_core::web::{SearchHit, SearchProvider};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use crate::fetch::domain_of;

pub struct SearchTool {
    provider: Arc<dyn SearchProvider>,
    blacklist: Arc<Blacklist>,
    results_per_query: usize,
    max_results: usize,
}

impl SearchTool {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        blacklist: Arc<Blacklist>,
        results_per_query: usize,
        max_results: usize,
    ) -> Self {
        Self {
            provider,
            blacklist,
            results_per_query,
            max_results,
        }
    }

    async fn is_blacklisted(&self, link: &str) -> bool {
        match domain_of(link) {
            Some(domain) => self.blacklist.contains(&domain).await,
            None => false,
        }
    }
}

fn render(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| {
            format!(
                "<reference><title>{}</title><desc>{}</desc><snippet>{}</snippet><link>{}</link></reference>\n",
                h.title, h.description, h.snippet, h.link
            )
        })
        .collect()
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web. Give the main query plus two reworded or more specific variants; results are merged and returned as references with title, description, snippet and link."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The main search query"
                },
                "augmented_query_1": {
                    "type": "string",
                    "description": "A variant of the query that widens or sharpens it"
                },
                "augmented_query_2": {
                    "type": "string",
                    "description": "Another variant of the query"
                }
            },
            "required": ["query", "augmented_query_1", "augmented_query_2"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Network
    }

    async fn execute(&self, arguments: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = required_str(&arguments, "query")?;
        let augmented_1 = required_str(&arguments, "augmented_query_1")?;
        let augmented_2 = required_str(&arguments, "augmented_query_2")?;

        if query.trim().is_empty() {
            return Err(ToolError::InvalidArguments("Search query is empty".into()));
        }

        let queries: Vec<&str> = [query, augmented_1, augmented_2]
            .into_iter()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .collect();

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        let mut dropped = 0usize;
        for q in &queries {
            let hits = self.provider.search(q, self.results_per_query).await?;
            for hit in hits {
                if !seen.insert(hit.link.clone()) {
                    continue;
                }
                if self.is_blacklisted(&hit.link).await {
                    dropped += 1;
                    continue;
                }
                merged.push(hit);
            }
        }
        merged.truncate(self.max_results);

        info!(
            provider = %self.provider.name(),
            queries = queries.len(),
            results = merged.len(),
            blacklisted = dropped,
            "Search finished"
        );

        if merged.is_empty() {
            debug!(query = %query, "Search returned nothing");
            return Ok(ToolResult::ok(format!(
                "<query>{query}</query>\n<augmented_query_1>{augmented_1}</augmented_query_1>\n<augmented_query_2>{augmented_2}</augmented_query_2>\nNo search results were found. Try again with different queries."
            ))
            .with_data(serde_json::json!([])));
        }

        let data: Vec<serde_json::Value> = merged
            .iter()
            .map(|h| serde_json::json!({"title": h.title, "snippet": h.snippet, "link": h.link}))
            .collect();
        Ok(ToolResult::ok(render(&merged)).with_data(serde_json::Value::Array(data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StaticSearch, ctx};

    fn args(q: &str, a1: &str, a2: &str) -> serde_json::Value {
        serde_json::json!({"query": q, "augmented_query_1": a1, "augmented_query_2": a2})
    }

    fn hit(link: &str) -> SearchHit {
        SearchHit {
            title: format!("title {link}"),
            link: link.into(),
            snippet: format!("snippet {link}"),
            description: String::new(),
        }
    }

    fn rust_search() -> Arc<StaticSearch> {
        Arc::new(
            StaticSearch::default()
                .with("rust ownership", vec![hit("https://doc.rust-lang.org/book/ch04"), hit("https://a.example/1")])
                .with("rust borrow checker", vec![hit("https://a.example/1"), hit("https://b.example/2")])
                .with("rust lifetimes", vec![hit("https://c.example/3")]),
        )
    }

    #[tokio::test]
    async fn merges_and_dedupes_in_query_order() {
        let search = rust_search();
        let tool = SearchTool::new(search.clone(), Arc::new(Blacklist::in_memory()), 10, 5);
        let result = tool
            .execute(args("rust ownership", "rust borrow checker", "rust lifetimes"), &ctx())
            .await
            .unwrap();

        let links: Vec<&str> = result.data.as_ref().unwrap().as_array().unwrap()
            .iter()
            .map(|v| v["link"].as_str().unwrap())
            .collect();
        assert_eq!(
            links,
            vec![
                "https://doc.rust-lang.org/book/ch04",
                "https://a.example/1",
                "https://b.example/2",
                "https://c.example/3",
            ]
        );
        assert!(result.output.contains("<link>https://b.example/2</link>"));
        assert_eq!(search.calls(), 3);
    }

    #[tokio::test]
    async fn blank_augmented_queries_are_skipped() {
        let search = rust_search();
        let tool = SearchTool::new(search.clone(), Arc::new(Blacklist::in_memory()), 10, 5);
        tool.execute(args("rust ownership", "  ", ""), &ctx()).await.unwrap();
        assert_eq!(search.calls(), 1);
    }

    #[tokio::test]
    async fn truncates_to_max_results() {
        let tool = SearchTool::new(rust_search(), Arc::new(Blacklist::in_memory()), 10, 2);
        let result = tool
            .execute(args("rust ownership", "rust borrow checker", "rust lifetimes"), &ctx())
            .await
            .unwrap();
        assert_eq!(result.data.unwrap().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blacklisted_domains_dropped() {
        let blacklist = Arc::new(Blacklist::in_memory());
        blacklist.insert("a.example").await;
        let tool = SearchTool::new(rust_search(), blacklist, 10, 5);
        let result = tool
            .execute(args("rust ownership", "rust borrow checker", ""), &ctx())
            .await
            .unwrap();
        assert!(!result.output.contains("a.example"));
        assert!(result.output.contains("b.example"));
    }

    #[tokio::test]
    async fn no_results_message_echoes_queries() {
        let tool = SearchTool::new(rust_search(), Arc::new(Blacklist::in_memory()), 10, 5);
        let result = tool.execute(args("zzz", "yyy", "xxx"), &ctx()).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("<query>zzz</query>"));
        assert!(result.output.contains("No search results"));
    }

    #[tokio::test]
    async fn provider_failure_is_not_retried() {
        let search = Arc::new(StaticSearch::failing());
        let tool = SearchTool::new(search.clone(), Arc::new(Blacklist::in_memory()), 10, 5);
        let err = tool
            .execute(args("rust", "rust lang", "rustlang"), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::SearchProvider(_)));
        assert_eq!(search.calls(), 1);
    }
}
