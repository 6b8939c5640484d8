//! Built-in tool implementations for Quarry.
//!
//! Tools give the agent the ability to interact with the world:
//! read and write workspace files, run shell commands, search the web,
//! read pages through the shared URL cache, and talk to the requester.

pub mod complete;
pub mod fetch;
pub mod google;
pub mod infer_knowledge;
pub mod messaging;
pub mod model;
pub mod read_file;
pub mod refine_task;
pub mod run_command;
pub mod search;
pub mod write_file;

use quarry_cache::{Blacklist, UrlCache};
use quarry_config::AppConfig;
use quarry_core::error::ToolError;
use quarry_core::event::EventBus;
use quarry_core::provider::Provider;
use quarry_core::tool::ToolRegistry;
use quarry_core::web::{PageFetcher, SearchProvider};
use quarry_security::{CommandPolicy, PathError, Workspace};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub use fetch::{HttpPageFetcher, domain_of};
pub use google::{GoogleSearchProvider, UnconfiguredSearch};
pub use model::{ModelClient, strip_reasoning};

/// Map a sandbox violation onto the tool error the model sees.
pub(crate) fn sandbox_error(err: PathError) -> ToolError {
    match err {
        PathError::EscapesWorkspace { path } => ToolError::PathEscapesWorkspace { path },
        other => ToolError::ExecutionFailed {
            tool_name: "workspace".into(),
            reason: other.to_string(),
        },
    }
}

/// Everything the built-in tools need. Shared handles are cloned into the
/// tools, so one `ToolDeps` can back a registry used by many tasks.
#[derive(Clone)]
pub struct ToolDeps {
    pub workspace: Workspace,
    pub command_policy: CommandPolicy,
    pub command_timeout: Duration,
    pub search: Arc<dyn SearchProvider>,
    pub results_per_query: usize,
    pub max_results: usize,
    pub fetcher: Arc<dyn PageFetcher>,
    pub cache: Arc<UrlCache>,
    pub blacklist: Arc<Blacklist>,
    pub model: ModelClient,
    pub events: Option<Arc<EventBus>>,
}

impl ToolDeps {
    /// Build the production collaborators described by `config`.
    ///
    /// Missing search credentials are not fatal: the `search` tool then
    /// fails every call with a provider error.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        cache: Arc<UrlCache>,
        blacklist: Arc<Blacklist>,
    ) -> Result<Self, ToolError> {
        let root = config.workspace.resolved_root();
        std::fs::create_dir_all(&root).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "workspace".into(),
            reason: format!("cannot create {}: {e}", root.display()),
        })?;
        let workspace = Workspace::new(&root).map_err(sandbox_error)?;
        let command_policy = CommandPolicy::new(config.workspace.command_denylist.clone());
        debug!(root = %workspace.root().display(), denylist = ?command_policy.patterns(), "Tool sandbox ready");

        let search: Arc<dyn SearchProvider> = match GoogleSearchProvider::from_config(&config.search) {
            Ok(google) => Arc::new(google),
            Err(e) => {
                warn!(error = %e, "Web search disabled");
                Arc::new(UnconfiguredSearch)
            }
        };

        Ok(Self {
            workspace,
            command_policy,
            command_timeout: Duration::from_secs(config.workspace.command_timeout_secs),
            search,
            results_per_query: config.search.results_per_query,
            max_results: config.search.max_results,
            fetcher: Arc::new(HttpPageFetcher::new(&config.browse)?),
            cache,
            blacklist,
            model: ModelClient::new(provider, config.default_model.clone(), config.default_temperature),
            events: None,
        })
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }
}

/// Create a registry holding all nine built-in tools.
pub fn default_registry(deps: ToolDeps) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(read_file::ReadFileTool::new(deps.workspace.clone())));
    registry.register(Box::new(write_file::WriteFileTool::new(deps.workspace.clone())));
    registry.register(Box::new(run_command::RunCommandTool::new(
        deps.workspace,
        deps.command_policy,
        deps.command_timeout,
    )));
    registry.register(Box::new(search::SearchTool::new(
        deps.search,
        deps.blacklist.clone(),
        deps.results_per_query,
        deps.max_results,
    )));

    let mut infer = infer_knowledge::InferKnowledgeTool::new(
        deps.fetcher,
        deps.cache,
        deps.blacklist,
        deps.model.clone(),
    );
    if let Some(events) = deps.events {
        infer = infer.with_events(events);
    }
    registry.register(Box::new(infer));

    registry.register(Box::new(messaging::AskToUserTool));
    registry.register(Box::new(messaging::ReportToUserTool));
    registry.register(Box::new(complete::CompleteTool));
    registry.register(Box::new(refine_task::RefineTaskTool::new(deps.model)));
    registry
}
