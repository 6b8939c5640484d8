//! On-disk persistence for the URL cache and the domain blacklist.
//!
//! Layout under the cache directory:
//! - `pages/<sha256(url)>.json`: one `CachedPage` per file
//! - `blacklist.json`: sorted list of domains
//!
//! Files are plain JSON so they can be inspected by hand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use crate::CacheError;

/// A fetched page as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPage {
    pub url: String,
    pub content: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(dir.join("pages")).map_err(|e| CacheError::Io {
            path: dir.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn page_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.dir.join("pages").join(format!("{}.json", hex::encode(digest)))
    }

    fn blacklist_path(&self) -> PathBuf {
        self.dir.join("blacklist.json")
    }

    /// Load every readable page. Corrupted files are skipped.
    pub fn load_pages(&self) -> Vec<CachedPage> {
        let entries = match std::fs::read_dir(self.dir.join("pages")) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let pages: Vec<CachedPage> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                let raw = std::fs::read_to_string(&path).ok()?;
                match serde_json::from_str::<CachedPage>(&raw) {
                    Ok(page) => Some(page),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping corrupted cache entry");
                        None
                    }
                }
            })
            .collect();

        debug!(dir = %self.dir.display(), count = pages.len(), "Loaded cached pages");
        pages
    }

    pub async fn write_page(&self, page: &CachedPage) -> Result<(), CacheError> {
        let path = self.page_path(&page.url);
        let json = serde_json::to_string(page).map_err(|e| CacheError::Serialization(e.to_string()))?;
        write_atomic(&path, json).await
    }

    pub async fn remove_page(&self, url: &str) -> Result<(), CacheError> {
        let path = self.page_path(url);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io {
                path,
                reason: e.to_string(),
            }),
        }
    }

    pub fn load_blacklist(&self) -> HashSet<String> {
        let path = self.blacklist_path();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return HashSet::new(),
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(domains) => domains.into_iter().collect(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring corrupted blacklist file");
                HashSet::new()
            }
        }
    }

    pub async fn write_blacklist(&self, domains: &HashSet<String>) -> Result<(), CacheError> {
        let mut sorted: Vec<&String> = domains.iter().collect();
        sorted.sort();
        let path = self.blacklist_path();
        let json = serde_json::to_string_pretty(&sorted).map_err(|e| CacheError::Serialization(e.to_string()))?;
        write_atomic(&path, json).await
    }

    /// Remove all persisted pages and the blacklist.
    pub fn clear(&self) -> Result<(), CacheError> {
        let io = |path: &Path, e: std::io::Error| CacheError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
        let pages = self.dir.join("pages");
        if pages.exists() {
            std::fs::remove_dir_all(&pages).map_err(|e| io(&pages, e))?;
        }
        std::fs::create_dir_all(&pages).map_err(|e| io(&pages, e))?;
        let blacklist = self.blacklist_path();
        if blacklist.exists() {
            std::fs::remove_file(&blacklist).map_err(|e| io(&blacklist, e))?;
        }
        Ok(())
    }
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Write through a uniquely named sibling temp file and rename it into
/// place, so readers never observe a half-written file.
async fn write_atomic(path: &Path, contents: String) -> Result<(), CacheError> {
    let io = |e: std::io::Error| CacheError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    let tmp = PathBuf::from(tmp);
    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(io(e));
    }
    tokio::fs::rename(&tmp, path).await.map_err(io)
}
