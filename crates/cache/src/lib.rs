//! URL cache and domain blacklist for Quarry.
//!
//! Both stores are shared by every task in the process and optionally
//! persisted under the configured cache directory.

pub mod blacklist;
pub mod store;
pub mod url_cache;

use std::path::PathBuf;

pub use blacklist::Blacklist;
pub use store::{CacheStore, CachedPage};
pub use url_cache::{CacheLookup, CachePolicy, CacheStats, UrlCache};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O failed at {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Cache serialization failed: {0}")]
    Serialization(String),
}

/// Build the cache and blacklist described by `config`.
pub fn open(config: &quarry_config::CacheConfig) -> Result<(UrlCache, Blacklist), CacheError> {
    let policy = CachePolicy::from_config(config);
    if !config.persist {
        return Ok((UrlCache::in_memory(policy), Blacklist::in_memory()));
    }
    let store = CacheStore::open(config.resolved_dir())?;
    tracing::info!(dir = %store.dir().display(), "Opened page cache");
    Ok((
        UrlCache::persistent(store.clone(), policy),
        Blacklist::persistent(store),
    ))
}
