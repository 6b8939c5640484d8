//! Process-wide wiring: builds the shared handles once from configuration.

use quarry_cache::{Blacklist, UrlCache};
use quarry_config::AppConfig;
use quarry_core::error::Error;
use quarry_core::event::EventBus;
use std::sync::Arc;
use tracing::info;
use crate::runner::TaskRunner;

/// Everything shared between tasks. Cloning is cheap.
#[derive(Clone)]
pub struct Runtime {
    pub runner: Arc<TaskRunner>,
    pub cache: Arc<UrlCache>,
    pub blacklist: Arc<Blacklist>,
    pub event_bus: Arc<EventBus>,
}

impl Runtime {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let router = quarry_providers::build_from_config(config).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        let provider = router.default().ok_or_else(|| Error::Config {
            message: format!("provider '{}' is not configured", config.default_provider),
        })?;

        let (cache, blacklist) = quarry_cache::open(&config.cache).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        let cache = Arc::new(cache);
        let blacklist = Arc::new(blacklist);
        let event_bus = Arc::new(EventBus::default());

        let deps = quarry_tools::ToolDeps::from_config(config, provider.clone(), cache.clone(), blacklist.clone())?
            .with_events(event_bus.clone());
        let tools = Arc::new(quarry_tools::default_registry(deps));

        info!(
            provider = %provider.name(),
            model = %config.default_model,
            tools = tools.len(),
            "Runtime ready"
        );

        let runner = TaskRunner::from_config(config, provider, tools, event_bus.clone());
        Ok(Self {
            runner: Arc::new(runner),
            cache,
            blacklist,
            event_bus,
        })
    }
}
