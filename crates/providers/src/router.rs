//! Provider router: selects the model endpoint from configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use quarry_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;
use quarry_config::{AppConfig, ConfigError};
use tracing::debug;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }
}

/// Build providers from configuration.
///
/// The default provider is always registered, even without an explicit
/// `[providers.<name>]` table. A provider name without a known endpoint
/// must set `api_url`.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ConfigError> {
    let mut router = ProviderRouter::new(&config.default_provider);
    let timeout = Duration::from_secs(config.agent.request_timeout_secs.max(1));

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_else(|| default_api_key(name));

        let base_url = match &provider_config.api_url {
            Some(url) => url.clone(),
            None => known_base_url(name).ok_or_else(|| unknown_provider(name))?.to_string(),
        };

        let provider = OpenAiCompatProvider::new(name, &base_url, &api_key).with_timeout(timeout);
        debug!(provider = %name, base_url = %provider.base_url(), "Provider registered");
        router.register(name.clone(), Arc::new(provider));
    }

    if router.get(&config.default_provider).is_none() {
        let name = &config.default_provider;
        let base_url = known_base_url(name).ok_or_else(|| unknown_provider(name))?;
        let api_key = config.api_key.clone().unwrap_or_else(|| default_api_key(name));
        let provider = OpenAiCompatProvider::new(name, base_url, &api_key).with_timeout(timeout);
        debug!(provider = %name, base_url = %provider.base_url(), "Default provider registered");
        router.register(name.clone(), Arc::new(provider));
    }

    Ok(router)
}

fn unknown_provider(name: &str) -> ConfigError {
    ConfigError::ValidationError(format!(
        "unknown provider '{name}'; set providers.{name}.api_url or use one of: {}",
        KNOWN_PROVIDERS.join(", ")
    ))
}

fn default_api_key(provider_name: &str) -> String {
    match provider_name {
        "ollama" => "ollama".into(),
        _ => String::new(),
    }
}

const KNOWN_PROVIDERS: &[&str] = &["ollama", "openai", "openrouter", "groq", "vllm", "llamacpp"];

/// Base URL for well-known providers.
fn known_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "openai" => Some("https://api.openai.com/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" | "llama.cpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}
