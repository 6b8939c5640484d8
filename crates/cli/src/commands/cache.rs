//! `quarry cache`: inspect the persisted page cache and blacklist.

use quarry_cache::{Blacklist, CachePolicy, CacheStore, UrlCache};
use quarry_config::AppConfig;
use tracing::info;

fn store() -> Result<CacheStore, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(CacheStore::open(config.cache.resolved_dir())?)
}

/// One line per cached page, newest first. Expiry is ignored so every
/// page on disk is shown.
async fn page_lines(cache: &UrlCache) -> Vec<String> {
    cache
        .list()
        .await
        .iter()
        .map(|page| {
            format!(
                "  {}  {:>8} chars  {}",
                page.fetched_at.format("%Y-%m-%d %H:%M"),
                page.content.chars().count(),
                page.url
            )
        })
        .collect()
}

async fn domain_lines(blacklist: &Blacklist) -> Vec<String> {
    blacklist.list().await.iter().map(|d| format!("  {d}")).collect()
}

fn print_section(title: &str, lines: &[String]) {
    println!("{title}");
    if lines.is_empty() {
        println!("  (none)");
    }
    for line in lines {
        println!("{line}");
    }
}

pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let store = store()?;
    let title = format!("Cached pages in {}", store.dir().display());
    let cache = UrlCache::persistent(store, CachePolicy::default());
    print_section(&title, &page_lines(&cache).await);
    Ok(())
}

pub async fn blacklist() -> Result<(), Box<dyn std::error::Error>> {
    let blacklist = Blacklist::persistent(store()?);
    print_section("Blacklisted domains", &domain_lines(&blacklist).await);
    Ok(())
}

pub fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let store = store()?;
    store.clear()?;
    info!(dir = %store.dir().display(), "Cache cleared");
    println!("Cleared {}", store.dir().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listings_read_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = CacheStore::open(dir.path()).unwrap();
            let cache = UrlCache::persistent(store.clone(), CachePolicy::default());
            cache.insert("https://a.example/page", "hello".into()).await;
            let blacklist = Blacklist::persistent(store);
            blacklist.insert("z.example").await;
            blacklist.insert("b.example").await;
        }

        let store = CacheStore::open(dir.path()).unwrap();
        let pages = page_lines(&UrlCache::persistent(store.clone(), CachePolicy::default())).await;
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("5 chars"));
        assert!(pages[0].ends_with("https://a.example/page"));

        let domains = domain_lines(&Blacklist::persistent(store)).await;
        assert_eq!(domains, vec!["  b.example", "  z.example"]);
    }

    #[tokio::test]
    async fn empty_cache_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        assert!(page_lines(&UrlCache::persistent(store.clone(), CachePolicy::default())).await.is_empty());
        assert!(domain_lines(&Blacklist::persistent(store)).await.is_empty());
    }
}
