//! End-to-end tests: the full stack from query to final message, with the
//! model endpoint, the search engine and the page fetcher scripted.

use async_trait::async_trait;
use quarry_agent::{TaskRunner, ToolCaller};
use quarry_cache::{Blacklist, CachePolicy, UrlCache};
use quarry_channels::CaptureMessenger;
use quarry_core::error::{ProviderError, TaskError, ToolError};
use quarry_core::message::{Message, MessageToolCall, Role};
use quarry_core::provider::{Provider, ProviderRequest, ProviderResponse};
use quarry_core::web::{PageFetcher, SearchHit, SearchProvider};
use quarry_core::{DomainEvent, EventBus};
use quarry_security::{CommandPolicy, Workspace};
use quarry_tools::{ModelClient, ToolDeps, default_registry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// --- Scripted collaborators ---

struct ScriptedProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        Ok(self.responses[n.min(self.responses.len() - 1)].clone())
    }
}

fn tool_response(name: &str, args: serde_json::Value) -> ProviderResponse {
    let call = MessageToolCall {
        id: format!("call_{name}"),
        name: name.into(),
        arguments: args.to_string(),
    };
    ProviderResponse {
        message: Message::assistant_tool_call("", call),
        usage: None,
        model: "mock".into(),
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: None,
        model: "mock".into(),
    }
}

#[derive(Default)]
struct StaticSearch {
    hits: Vec<SearchHit>,
}

#[async_trait]
impl SearchProvider for StaticSearch {
    fn name(&self) -> &str {
        "static"
    }

    async fn search(&self, _query: &str, _num_results: usize) -> Result<Vec<SearchHit>, ToolError> {
        Ok(self.hits.clone())
    }
}

struct FixedFetcher {
    body: Option<String>,
    calls: AtomicUsize,
}

impl FixedFetcher {
    fn ok(body: &str) -> Self {
        Self { body: Some(body.into()), calls: AtomicUsize::new(0) }
    }

    fn failing() -> Self {
        Self { body: None, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl PageFetcher for FixedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.body.clone().ok_or_else(|| ToolError::FetchFailure {
            url: url.into(),
            reason: "503".into(),
        })
    }
}

struct Stack {
    runner: TaskRunner,
    agent: Arc<ScriptedProvider>,
    fetcher: Arc<FixedFetcher>,
    cache: Arc<UrlCache>,
    blacklist: Arc<Blacklist>,
    events: Arc<EventBus>,
    _workspace: tempfile::TempDir,
}

fn stack(script: Vec<ProviderResponse>, search: StaticSearch, fetcher: FixedFetcher) -> Stack {
    let workspace = tempfile::tempdir().unwrap();
    let agent = Arc::new(ScriptedProvider::new(script));
    let extractor = Arc::new(ScriptedProvider::new(vec![text_response(
        "<think>reading</think>Tokio 1.40 added task hooks.",
    )]));
    let fetcher = Arc::new(fetcher);
    let cache = Arc::new(UrlCache::in_memory(CachePolicy::default()));
    let blacklist = Arc::new(Blacklist::in_memory());
    let events = Arc::new(EventBus::default());

    let deps = ToolDeps {
        workspace: Workspace::new(workspace.path()).unwrap(),
        command_policy: CommandPolicy::new(vec!["rm -rf".into()]),
        command_timeout: Duration::from_secs(5),
        search: Arc::new(search),
        results_per_query: 5,
        max_results: 10,
        fetcher: fetcher.clone(),
        cache: cache.clone(),
        blacklist: blacklist.clone(),
        model: ModelClient::new(extractor, "mock", 0.0),
        events: Some(events.clone()),
    };
    let registry = Arc::new(default_registry(deps));
    let caller = ToolCaller::new(agent.clone(), "mock", 0.0, registry, events.clone()).with_max_iterations(6);

    Stack {
        runner: TaskRunner::new(caller).with_timeout(Duration::from_secs(30)),
        agent,
        fetcher,
        cache,
        blacklist,
        events,
        _workspace: workspace,
    }
}

fn hit(link: &str) -> SearchHit {
    SearchHit {
        title: "Tokio release notes".into(),
        link: link.into(),
        snippet: "What's new".into(),
        description: String::new(),
    }
}

fn search_call() -> ProviderResponse {
    tool_response(
        "search",
        serde_json::json!({
            "query": "tokio latest release",
            "augmented_query_1": "tokio changelog",
            "augmented_query_2": ""
        }),
    )
}

fn infer_call(url: &str) -> ProviderResponse {
    tool_response("infer_knowledge_by_url", serde_json::json!({ "url": url, "what_to_search": "new features" }))
}

fn complete_call(message: &str) -> ProviderResponse {
    tool_response("complete", serde_json::json!({ "message": message }))
}

// --- Full research flow ---

#[tokio::test]
async fn e2e_search_infer_complete_returns_summary() {
    let stack = stack(
        vec![
            search_call(),
            infer_call("https://tokio.rs/blog"),
            complete_call("Tokio 1.40 added task hooks."),
        ],
        StaticSearch { hits: vec![hit("https://tokio.rs/blog")] },
        FixedFetcher::ok("Tokio 1.40 release notes ..."),
    );

    let answer = stack.runner.handle("What is new in tokio?").await;
    assert_eq!(answer, "Tokio 1.40 added task hooks.");

    let ledger = stack.agent.last_request().messages;
    assert_eq!(ledger[0].role, Role::System);
    assert_eq!(ledger[1].content, "What is new in tokio?");
    assert!(ledger.iter().any(|m| m.content.contains("<link>https://tokio.rs/blog</link>")));
    // Reasoning is stripped before the extraction enters the ledger
    assert!(
        ledger
            .iter()
            .any(|m| m.content.contains("<result>\nTokio 1.40 added task hooks.\n</result>"))
    );
    assert!(!ledger.iter().any(|m| m.content.contains("<think>")));
    assert_eq!(stack.cache.len().await, 1);
}

#[tokio::test]
async fn e2e_second_fetch_of_same_url_hits_cache() {
    let stack = stack(
        vec![
            infer_call("https://tokio.rs/blog"),
            infer_call("https://tokio.rs/blog"),
            complete_call("done"),
        ],
        StaticSearch::default(),
        FixedFetcher::ok("page"),
    );

    assert_eq!(stack.runner.handle("read it twice").await, "done");
    assert_eq!(stack.fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn e2e_failed_fetch_blacklists_domain_and_task_continues() {
    let stack = stack(
        vec![
            infer_call("https://down.example.com/a"),
            infer_call("https://down.example.com/b"),
            complete_call("Could not reach the source."),
        ],
        StaticSearch::default(),
        FixedFetcher::failing(),
    );
    let mut rx = stack.events.subscribe();

    let answer = stack.runner.handle("read a broken site").await;
    assert_eq!(answer, "Could not reach the source.");

    assert!(stack.blacklist.contains("down.example.com").await);
    // The second URL on the same domain is refused without a network call
    assert_eq!(stack.fetcher.calls.load(Ordering::SeqCst), 1);

    let ledger = stack.agent.last_request().messages;
    let failures = ledger.iter().filter(|m| m.content.contains("<failed>")).count();
    assert_eq!(failures, 2);

    let mut blacklisted = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event.as_ref(), DomainEvent::DomainBlacklisted { .. }) {
            blacklisted += 1;
        }
    }
    assert_eq!(blacklisted, 1);
}

#[tokio::test]
async fn e2e_blacklisted_domains_are_dropped_from_search() {
    let stack = stack(
        vec![search_call(), complete_call("ok")],
        StaticSearch {
            hits: vec![hit("https://bad.example.com/x"), hit("https://good.example.org/y")],
        },
        FixedFetcher::ok("page"),
    );
    stack.blacklist.insert("bad.example.com").await;

    stack.runner.handle("search something").await;

    let ledger = stack.agent.last_request().messages;
    let search_entry = ledger
        .iter()
        .find(|m| m.content.starts_with("tool used: search"))
        .unwrap();
    assert!(search_entry.content.contains("good.example.org"));
    assert!(!search_entry.content.contains("bad.example.com"));
}

// --- Loop limits and failure shapes ---

#[tokio::test]
async fn e2e_budget_exhaustion_is_reported_as_error_string() {
    let stack = stack(vec![search_call()], StaticSearch::default(), FixedFetcher::ok("page"));

    let answer = stack.runner.handle("loop forever").await;
    assert!(answer.starts_with("Error:"));
    assert!(answer.contains("6"));
}

#[tokio::test]
async fn e2e_ask_to_user_under_service_fails_task() {
    let stack = stack(
        vec![tool_response("ask_to_user", serde_json::json!({ "message": "Which version?" }))],
        StaticSearch::default(),
        FixedFetcher::ok("page"),
    );

    let capture = Arc::new(CaptureMessenger::new());
    let err = stack.runner.run_task("needs clarification", capture).await.unwrap_err();
    assert!(matches!(err, TaskError::UnsupportedInteraction));

    let answer = stack.runner.handle("needs clarification").await;
    assert!(answer.starts_with("Error:"));
}

#[tokio::test]
async fn e2e_idle_model_completes_with_its_text() {
    let stack = stack(
        vec![text_response("Rust 1.80 stabilized LazyLock.")],
        StaticSearch::default(),
        FixedFetcher::ok("page"),
    );

    let answer = stack.runner.handle("what is new in rust").await;
    assert_eq!(answer, "Rust 1.80 stabilized LazyLock.");
}

#[tokio::test]
async fn e2e_workspace_tools_write_then_read() {
    let stack = stack(
        vec![
            tool_response("write_file", serde_json::json!({ "path": "notes/a.txt", "content": "hello" })),
            tool_response("read_file", serde_json::json!({ "path": "notes/a.txt" })),
            tool_response("run_command", serde_json::json!({ "command": "rm -rf notes" })),
            complete_call("saved"),
        ],
        StaticSearch::default(),
        FixedFetcher::ok("page"),
    );

    assert_eq!(stack.runner.handle("take notes").await, "saved");

    let ledger = stack.agent.last_request().messages;
    assert!(
        ledger
            .iter()
            .any(|m| m.content.starts_with("tool used: read_file") && m.content.contains("hello"))
    );
    assert!(
        ledger
            .iter()
            .any(|m| m.content.starts_with("tool used: run_command") && m.content.contains("<failed>"))
    );
}

#[tokio::test]
async fn e2e_events_frame_each_task() {
    let stack = stack(vec![complete_call("fine")], StaticSearch::default(), FixedFetcher::ok("page"));
    let mut rx = stack.events.subscribe();

    stack.runner.handle("quick").await;

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(match event.as_ref() {
            DomainEvent::TaskStarted { .. } => "started",
            DomainEvent::ToolExecuted { .. } => "tool",
            DomainEvent::TaskFinished { .. } => "finished",
            DomainEvent::DomainBlacklisted { .. } => "blacklisted",
        });
    }
    assert_eq!(names, vec!["started", "tool", "finished"]);
}

// --- HTTP service ---

mod service {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use quarry_gateway::{GatewayState, build_router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn e2e_rpc_handle_search_runs_task() {
        let stack = stack(vec![complete_call("42")], StaticSearch::default(), FixedFetcher::ok("page"));
        let app = build_router(Arc::new(GatewayState {
            service: Arc::new(stack.runner),
        }));

        let body = serde_json::json!({
            "method": "handle_search",
            "params": { "query": "the answer" },
            "id": 7
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/rpc")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["result"], "42");
        assert_eq!(json["id"], 7);
    }
}

// --- Configuration ---

#[test]
fn e2e_default_config_is_valid() {
    let config = quarry_config::AppConfig::default();
    assert!(config.validate().is_ok());
    assert!(config.agent.max_iterations > 0);
    assert!(quarry_config::AppConfig::default_toml().contains("[gateway]"));
}
