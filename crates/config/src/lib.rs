//! Configuration loading, validation, and management for Quarry.
//!
//! Loads configuration from `~/.quarry/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.quarry/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub browse: BrowseConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "qwen3:30b".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("providers", &self.providers)
            .field("agent", &self.agent)
            .field("workspace", &self.workspace)
            .field("search", &self.search)
            .field("browse", &self.browse)
            .field("cache", &self.cache)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Tool caller limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model consultations per task before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Consecutive text-only answers before the task is closed
    #[serde(default = "default_max_idle_turns")]
    pub max_idle_turns: u32,

    /// Overall deadline for one service request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Replace the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_iterations() -> u32 {
    30
}
fn default_max_idle_turns() -> u32 {
    3
}
fn default_request_timeout() -> u64 {
    300
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_idle_turns: default_max_idle_turns(),
            request_timeout_secs: default_request_timeout(),
            system_prompt_override: None,
        }
    }
}

/// Sandbox for file and shell tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory; defaults to the process working directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Commands containing any of these substrings are refused
    #[serde(default = "default_command_denylist")]
    pub command_denylist: Vec<String>,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn default_command_denylist() -> Vec<String> {
    vec!["curl".into(), "wget".into(), "aria2c".into()]
}
fn default_command_timeout() -> u64 {
    120
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: None,
            command_denylist: default_command_denylist(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl WorkspaceConfig {
    /// The configured root, or the current directory.
    pub fn resolved_root(&self) -> PathBuf {
        self.root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Google Custom Search settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_id: Option<String>,

    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// References returned to the model after merging
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_results_per_query() -> usize {
    10
}
fn default_max_results() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            engine_id: None,
            results_per_query: default_results_per_query(),
            max_results: default_max_results(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &redact(&self.api_key))
            .field("engine_id", &self.engine_id)
            .field("results_per_query", &self.results_per_query)
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Page fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowseConfig {
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Page text is truncated to this many characters before extraction
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_fetch_timeout() -> u64 {
    60
}
fn default_max_content_chars() -> usize {
    60_000
}
fn default_user_agent() -> String {
    concat!("quarry/", env!("CARGO_PKG_VERSION")).into()
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            max_content_chars: default_max_content_chars(),
            user_agent: default_user_agent(),
        }
    }
}

/// URL cache and domain blacklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory for persisted pages and blacklist; defaults to `~/.quarry/cache`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Write entries to disk; when false the cache lives in memory only
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Entries older than this are refetched. Unset = never expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_hours: Option<u64>,

    /// Oldest entries are evicted past this size. Unset = unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            persist: true,
            ttl_hours: None,
            max_entries: None,
        }
    }
}

impl CacheConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("cache"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.quarry/config.toml).
    ///
    /// Environment overrides:
    /// - `QUARRY_API_KEY`, then `OPENAI_API_KEY` for the model endpoint
    /// - `QUARRY_PROVIDER`, `QUARRY_MODEL`
    /// - `OLLAMA_HOST` for the ollama endpoint
    /// - `GOOGLE_API_KEY`, `GOOGLE_SEARCH_ENGINE_ID` for search
    /// - `SEARCH_AGENT_PORT` for the gateway
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` so tests need not touch
    /// the process environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("QUARRY_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("QUARRY_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("QUARRY_MODEL") {
            self.default_model = model;
        }
        if let Some(host) = lookup("OLLAMA_HOST") {
            let url = if host.starts_with("http") { host } else { format!("http://{host}") };
            self.providers.entry("ollama".into()).or_insert(ProviderConfig {
                api_key: None,
                api_url: None,
                default_model: None,
            }).api_url = Some(format!("{}/v1", url.trim_end_matches('/')));
        }
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(id) = lookup("GOOGLE_SEARCH_ENGINE_ID") {
            self.search.engine_id = Some(id);
        }
        if let Some(port) = lookup("SEARCH_AGENT_PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".quarry")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_results must be at least 1".into(),
            ));
        }

        if self.cache.max_entries == Some(0) {
            return Err(ConfigError::ValidationError(
                "cache.max_entries must be at least 1 when set".into(),
            ));
        }

        Ok(())
    }

    pub fn has_search_credentials(&self) -> bool {
        self.search.api_key.is_some() && self.search.engine_id.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            providers: HashMap::new(),
            agent: AgentConfig::default(),
            workspace: WorkspaceConfig::default(),
            search: SearchConfig::default(),
            browse: BrowseConfig::default(),
            cache: CacheConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
