//! `infer_knowledge_by_url`: fetch a page (through the cache) and have the
//! model extract what the task needs from it.
//!
//! A failed fetch blacklists the page's domain for the life of the process
//! (and of the cache directory, when persisted).

use async_trait::async_trait;
use chrono::Utc;
use quarry_cache::{Blacklist, UrlCache};
use quarry_core::error::ToolError;
use quarry_core::event::{DomainEvent, EventBus};
use quarry_core::tool::{SideEffect, Tool, ToolContext, ToolResult, required_str};
use quarry_core::web::PageFetcher;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::fetch::domain_of;
use crate::model::ModelClient;

const EXTRACTION_SYSTEM_PROMPT: &str = "You are an excellent editor. The input is the content of a web page and contains a lot of irrelevant information, so carefully select only the important parts. When a passage you extract contains URLs, include the URLs as well.";

pub struct InferKnowledgeTool {
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<UrlCache>,
    blacklist: Arc<Blacklist>,
    model: ModelClient,
    events: Option<Arc<EventBus>>,
}

impl InferKnowledgeTool {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        cache: Arc<UrlCache>,
        blacklist: Arc<Blacklist>,
        model: ModelClient,
    ) -> Self {
        Self {
            fetcher,
            cache,
            blacklist,
            model,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    async fn blacklist_domain(&self, domain: &str) {
        if self.blacklist.insert(domain).await
            && let Some(events) = &self.events
        {
            events.publish(DomainEvent::DomainBlacklisted {
                domain: domain.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}

fn extraction_prompt(what_to_search: &str, content: &str) -> String {
    format!(
        "The following is a web page converted to text. Extract the information related to what_to_search from the content below.\n<what_to_search>{what_to_search}</what_to_search>\n<content>\n{content}\n</content>"
    )
}

#[async_trait]
impl Tool for InferKnowledgeTool {
    fn name(&self) -> &str {
        "infer_knowledge_by_url"
    }

    fn description(&self) -> &str {
        "Read the web page at a URL and extract the information described by what_to_search. Describe what_to_search in detail, including why the information is needed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The page to read"
                },
                "what_to_search": {
                    "type": "string",
                    "description": "What to look for on the page and the objective behind it"
                }
            },
            "required": ["url", "what_to_search"]
        })
    }

    fn side_effect(&self) -> SideEffect {
        SideEffect::Network
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let url = required_str(&arguments, "url")?;
        let what_to_search = required_str(&arguments, "what_to_search")?;
        let domain = domain_of(url)
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{url}' is not a valid URL")))?;

        if self.blacklist.contains(&domain).await {
            info!(url = %url, domain = %domain, "Skipping blacklisted domain");
            return Ok(ToolResult::failed(format!(
                "The domain {domain} is unavailable because an earlier fetch from it failed. Use a different source."
            )));
        }

        ctx.messenger
            .send(&format!("Fetching {url} to extract information about {what_to_search}"))
            .await?;

        let fetcher = self.fetcher.clone();
        let lookup = self
            .cache
            .get_or_fetch(url, || async move { fetcher.fetch(url).await })
            .await;

        let page = match lookup {
            Ok(page) => {
                let stats = self.cache.stats();
                debug!(url = %url, from_cache = page.from_cache, hits = stats.hits, misses = stats.misses, "Page ready");
                page
            }
            Err(e) => {
                warn!(url = %url, domain = %domain, error = %e, "Fetch failed, blacklisting domain");
                self.blacklist_domain(&domain).await;
                return Err(e);
            }
        };

        let extraction = self
            .model
            .ask(
                self.name(),
                EXTRACTION_SYSTEM_PROMPT,
                &extraction_prompt(what_to_search, &page.content),
            )
            .await?;

        Ok(ToolResult::ok(extraction).with_data(serde_json::json!({
            "url": url,
            "from_cache": page.from_cache,
        })))
    }
}
