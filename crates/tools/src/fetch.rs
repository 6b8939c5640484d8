//! HTTP page fetcher and HTML-to-text conversion.

use async_trait::async_trait;
use quarry_config::BrowseConfig;
use quarry_core::error::ToolError;
use quarry_core::web::PageFetcher;
use std::time::Duration;
use tracing::debug;

/// Lowercased host of `url`, or `None` if it does not parse.
pub fn domain_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Fetches pages with `reqwest` and reduces HTML to readable text.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    max_content_chars: usize,
}

impl HttpPageFetcher {
    pub fn new(config: &BrowseConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "infer_knowledge_by_url".into(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            max_content_chars: config.max_content_chars,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ToolError> {
        let failure = |reason: String| ToolError::FetchFailure {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().await.map_err(|e| failure(e.to_string()))?;
        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(failure(format!("HTTP status {status}")));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("html"))
            .unwrap_or(true);
        let body = response.text().await.map_err(|e| failure(e.to_string()))?;
        debug!(url = %url, bytes = body.len(), "Fetched page");

        let text = if is_html { html_to_text(&body) } else { body };
        Ok(truncate_chars(text, self.max_content_chars))
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}

/// Strip scripts, styles and tags, then collapse whitespace.
pub fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();
    for (open, close) in [("<script", "</script>"), ("<style", "</style>"), ("<noscript", "</noscript>")] {
        text = remove_blocks(&text, open, close);
    }

    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                stripped.push(' ');
            }
            _ if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    html_decode(&collapsed)
}

fn remove_blocks(text: &str, open: &str, close: &str) -> String {
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(start) = lower[cursor..].find(open).map(|i| cursor + i) {
        out.push_str(&text[cursor..start]);
        match lower[start..].find(close) {
            Some(end) => cursor = start + end + close.len(),
            None => {
                cursor = text.len();
                break;
            }
        }
    }
    out.push_str(&text[cursor..]);
    out
}

fn html_decode(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_of_extracts_host() {
        assert_eq!(domain_of("https://Docs.RS/tokio/latest").as_deref(), Some("docs.rs"));
        assert_eq!(domain_of("not a url"), None);
    }

    #[test]
    fn html_to_text_drops_scripts_and_tags() {
        let html = "<html><head><style>p{}</style><SCRIPT>alert(1)</SCRIPT></head>\
                    <body><h1>Title</h1><p>Fish &amp; chips</p></body></html>";
        assert_eq!(html_to_text(html), "Title Fish & chips");
    }

    #[test]
    fn unterminated_script_is_dropped() {
        assert_eq!(html_to_text("before<script>never closed"), "before");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo".to_string(), 2), "hé");
        assert_eq!(truncate_chars("hi".to_string(), 10), "hi");
    }

    #[tokio::test]
    async fn unreachable_host_is_fetch_failure() {
        let fetcher = HttpPageFetcher::new(&BrowseConfig {
            fetch_timeout_secs: 2,
            ..Default::default()
        })
        .unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, ToolError::FetchFailure { .. }));
    }
}
