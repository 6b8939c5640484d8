//! Process-wide memo of fetched page content, keyed by URL.
//!
//! Reads are served from memory; every successful fetch is written
//! through to the `CacheStore` when one is attached. Concurrent misses for
//! the same URL are serialized so the page is fetched once.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use crate::store::{CacheStore, CachedPage};

/// Expiry and size limits. The default is unbounded.
#[derive(Debug, Clone, Default)]
pub struct CachePolicy {
    pub ttl: Option<Duration>,
    pub max_entries: Option<usize>,
}

impl CachePolicy {
    pub fn from_config(config: &quarry_config::CacheConfig) -> Self {
        Self {
            ttl: config
                .ttl_hours
                .map(|h| Duration::hours(i64::try_from(h).unwrap_or(i64::MAX / 3_600_000))),
            max_entries: config.max_entries,
        }
    }

    fn is_fresh(&self, page: &CachedPage) -> bool {
        match self.ttl {
            Some(ttl) => Utc::now() - page.fetched_at < ttl,
            None => true,
        }
    }
}

/// Counters for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

/// Outcome of `get_or_fetch`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub content: String,
    pub from_cache: bool,
}

type InflightMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Releases a URL's in-flight gate when the fetching caller finishes or is
/// dropped mid-fetch. A gate already replaced by a newer one is left alone.
struct InflightSlot<'a> {
    inflight: &'a InflightMap,
    url: &'a str,
    gate: &'a Arc<tokio::sync::Mutex<()>>,
}

impl Drop for InflightSlot<'_> {
    fn drop(&mut self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if inflight.get(self.url).is_some_and(|g| Arc::ptr_eq(g, self.gate)) {
            inflight.remove(self.url);
        }
    }
}

pub struct UrlCache {
    entries: RwLock<HashMap<String, CachedPage>>,
    inflight: InflightMap,
    store: Option<CacheStore>,
    policy: CachePolicy,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl UrlCache {
    /// A cache that never touches disk.
    pub fn in_memory(policy: CachePolicy) -> Self {
        Self::with_entries(HashMap::new(), None, policy)
    }

    /// A cache backed by `store`, preloaded with its pages.
    pub fn persistent(store: CacheStore, policy: CachePolicy) -> Self {
        let entries = store
            .load_pages()
            .into_iter()
            .map(|page| (page.url.clone(), page))
            .collect();
        Self::with_entries(entries, Some(store), policy)
    }

    fn with_entries(
        entries: HashMap<String, CachedPage>,
        store: Option<CacheStore>,
        policy: CachePolicy,
    ) -> Self {
        Self {
            entries: RwLock::new(entries),
            inflight: Mutex::new(HashMap::new()),
            store,
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Cached content for `url`, if present and not expired.
    pub async fn get(&self, url: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(url)
            .filter(|page| self.policy.is_fresh(page))
            .map(|page| page.content.clone())
    }

    /// Store `content` for `url`, evicting the oldest entry if over capacity.
    pub async fn insert(&self, url: &str, content: String) {
        let page = CachedPage {
            url: url.to_string(),
            content,
            fetched_at: Utc::now(),
        };

        let evicted = {
            let mut entries = self.entries.write().await;
            entries.insert(page.url.clone(), page.clone());
            let mut evicted = Vec::new();
            if let Some(max) = self.policy.max_entries {
                while entries.len() > max {
                    let oldest = entries
                        .values()
                        .filter(|p| p.url != page.url)
                        .min_by_key(|p| p.fetched_at)
                        .map(|p| p.url.clone());
                    match oldest {
                        Some(old) => {
                            entries.remove(&old);
                            evicted.push(old);
                        }
                        None => break,
                    }
                }
            }
            evicted
        };
        self.writes.fetch_add(1, Ordering::Relaxed);

        if let Some(store) = &self.store {
            if let Err(e) = store.write_page(&page).await {
                warn!(url = %url, error = %e, "Failed to persist cached page");
            }
            for old in &evicted {
                if let Err(e) = store.remove_page(old).await {
                    warn!(url = %old, error = %e, "Failed to remove evicted page");
                }
            }
        }
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "Evicted cached pages");
        }
    }

    /// Return cached content, or run `fetch` once and cache its success.
    ///
    /// Callers racing on the same uncached URL wait for the first fetch
    /// and then read its result. Failures are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, url: &str, fetch: F) -> Result<CacheLookup, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if let Some(content) = self.get(url).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(url = %url, "Cache hit");
            return Ok(CacheLookup { content, from_cache: true });
        }

        let gate = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            inflight.entry(url.to_string()).or_default().clone()
        };
        let _guard = gate.lock().await;
        let _slot = InflightSlot {
            inflight: &self.inflight,
            url,
            gate: &gate,
        };

        if let Some(content) = self.get(url).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(url = %url, "Cache hit after waiting on in-flight fetch");
            return Ok(CacheLookup { content, from_cache: true });
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(url = %url, "Cache miss");
        let result = fetch().await;
        if let Ok(content) = &result {
            self.insert(url, content.clone()).await;
        }

        result.map(|content| CacheLookup { content, from_cache: false })
    }

    /// Snapshot of all entries, newest first.
    pub async fn list(&self) -> Vec<CachedPage> {
        let mut pages: Vec<CachedPage> = self.entries.read().await.values().cloned().collect();
        pages.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        pages
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    async fn fetch_counting(counter: &AtomicUsize, body: &str) -> Result<String, String> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(body.to_string())
    }

    #[tokio::test]
    async fn second_lookup_is_a_hit() {
        let cache = UrlCache::in_memory(CachePolicy::default());
        let fetches = AtomicUsize::new(0);

        let first = cache
            .get_or_fetch("https://a.example", || fetch_counting(&fetches, "page"))
            .await
            .unwrap();
        let second = cache
            .get_or_fetch("https://a.example", || fetch_counting(&fetches, "other"))
            .await
            .unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.content, "page");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, writes: 1 });
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = UrlCache::in_memory(CachePolicy::default());
        let result: Result<CacheLookup, String> = cache
            .get_or_fetch("https://down.example", || async { Err("502".to_string()) })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().writes, 0);
    }

    #[tokio::test]
    async fn concurrent_misses_fetch_once() {
        let cache = Arc::new(UrlCache::in_memory(CachePolicy::default()));
        let fetches = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let fetches = fetches.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("https://slow.example", move || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        Ok::<_, String>("slow page".to_string())
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().content, "slow page");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().writes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_fetch_releases_its_gate() {
        let cache = UrlCache::in_memory(CachePolicy::default());

        let stalled = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            cache.get_or_fetch("https://slow.example", || {
                std::future::pending::<Result<String, String>>()
            }),
        )
        .await;
        assert!(stalled.is_err());
        assert!(cache.inflight.lock().unwrap().is_empty());

        let fetches = AtomicUsize::new(0);
        let lookup = cache
            .get_or_fetch("https://slow.example", || fetch_counting(&fetches, "page"))
            .await
            .unwrap();
        assert!(!lookup.from_cache);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(cache.inflight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let cache = UrlCache::in_memory(CachePolicy {
            ttl: Some(Duration::zero()),
            max_entries: None,
        });
        let fetches = AtomicUsize::new(0);
        cache.get_or_fetch("https://a.example", || fetch_counting(&fetches, "v1")).await.unwrap();
        let again = cache.get_or_fetch("https://a.example", || fetch_counting(&fetches, "v2")).await.unwrap();
        assert!(!again.from_cache);
        assert_eq!(again.content, "v2");
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn oldest_entry_evicted_past_capacity() {
        let cache = UrlCache::in_memory(CachePolicy {
            ttl: None,
            max_entries: Some(2),
        });
        cache.insert("https://1.example", "one".into()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        cache.insert("https://2.example", "two".into()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        cache.insert("https://3.example", "three".into()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get("https://1.example").await.is_none());
        assert_eq!(cache.get("https://3.example").await.as_deref(), Some("three"));
    }

    #[tokio::test]
    async fn persistent_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = UrlCache::persistent(CacheStore::open(dir.path()).unwrap(), CachePolicy::default());
            cache.insert("https://keep.example", "kept".into()).await;
        }
        let reopened = UrlCache::persistent(CacheStore::open(dir.path()).unwrap(), CachePolicy::default());
        assert_eq!(reopened.get("https://keep.example").await.as_deref(), Some("kept"));
        assert_eq!(reopened.list().await.len(), 1);
    }
}
