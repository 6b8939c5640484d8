//! Domains whose fetch failed once and are never tried again.

use std::collections::HashSet;
use tokio::sync::RwLock;
use tracing::{info, warn};
use crate::store::CacheStore;

pub struct Blacklist {
    domains: RwLock<HashSet<String>>,
    store: Option<CacheStore>,
}

impl Blacklist {
    pub fn in_memory() -> Self {
        Self {
            domains: RwLock::new(HashSet::new()),
            store: None,
        }
    }

    pub fn persistent(store: CacheStore) -> Self {
        Self {
            domains: RwLock::new(store.load_blacklist()),
            store: Some(store),
        }
    }

    pub async fn contains(&self, domain: &str) -> bool {
        self.domains.read().await.contains(&domain.to_lowercase())
    }

    /// Add a domain. Returns `true` if it was not already listed.
    ///
    /// The file is rewritten while the write lock is held, so snapshots
    /// reach disk in insertion order.
    pub async fn insert(&self, domain: &str) -> bool {
        let mut domains = self.domains.write().await;
        if !domains.insert(domain.to_lowercase()) {
            return false;
        }
        info!(domain = %domain, "Domain blacklisted");

        if let Some(store) = &self.store
            && let Err(e) = store.write_blacklist(&domains).await
        {
            warn!(domain = %domain, error = %e, "Failed to persist blacklist");
        }
        true
    }

    /// Sorted snapshot of all domains.
    pub async fn list(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.domains.read().await.iter().cloned().collect();
        domains.sort();
        domains
    }

    pub async fn len(&self) -> usize {
        self.domains.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.domains.read().await.is_empty()
    }
}
