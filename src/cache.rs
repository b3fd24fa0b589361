//! Time-boxed memoization of full discovery passes.

use crate::config::Config;
use crate::discovery::Discovery;
use crate::error::Result;
use crate::model::MarkdownFile;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const CACHE_KEY_PREFIX: &str = "markdown-files";

/// Snapshot of one unlimited discovery pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub root: PathBuf,
    pub files: Vec<MarkdownFile>,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        (now - self.timestamp).to_std().ok()
    }
}

/// Result cache for a single root.
///
/// Only unlimited passes read or write the stored entry; limited passes are
/// partial and always go straight to discovery.
pub struct ResultCache {
    discovery: Discovery,
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    // held for the whole of an unlimited pass
    pass: Mutex<()>,
}

impl ResultCache {
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_discovery(Discovery::new(config), store, config.cache_ttl)
    }

    pub fn with_discovery(
        discovery: Discovery,
        store: Arc<dyn KeyValueStore>,
        ttl: Duration,
    ) -> Self {
        Self { discovery, store, ttl, pass: Mutex::new(()) }
    }

    pub fn root(&self) -> &Path {
        self.discovery.root()
    }

    pub fn key(&self) -> String {
        cache_key(self.root())
    }

    /// Every file under the root, from cache when the entry is fresh.
    pub async fn get_all(&self) -> Result<Vec<MarkdownFile>> {
        let _pass = self.pass.lock().await;

        let stale = match self.read_entry() {
            Some(entry) if self.is_fresh(&entry) => {
                tracing::debug!(
                    "Cache hit for {} ({} files)",
                    self.root().display(),
                    entry.files.len()
                );
                return Ok(entry.files);
            }
            other => other,
        };

        tracing::info!("Running full discovery pass for {}", self.root().display());
        match self.discovery.discover(None).await {
            Ok(files) => {
                self.write_entry(&files);
                Ok(files)
            }
            Err(e) => match stale {
                Some(entry) => {
                    tracing::warn!(
                        "{e}; serving {} cached files from {}",
                        entry.files.len(),
                        entry.timestamp
                    );
                    Ok(entry.files)
                }
                None => Err(e),
            },
        }
    }

    /// Up to `limit` files. Never reads or writes the cache.
    pub async fn get_limited(&self, limit: usize) -> Result<Vec<MarkdownFile>> {
        self.discovery.discover(Some(limit)).await
    }

    /// Re-discover regardless of the stored entry's age.
    pub async fn refresh(&self) -> Result<Vec<MarkdownFile>> {
        let _pass = self.pass.lock().await;
        let files = self.discovery.discover(None).await?;
        self.write_entry(&files);
        Ok(files)
    }

    pub fn invalidate(&self) -> Result<bool> {
        self.store.delete(&self.key())
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.age(Utc::now()).is_some_and(|age| age < self.ttl)
    }

    fn read_entry(&self) -> Option<CacheEntry> {
        let raw = match self.store.get(&self.key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Could not read cache entry: {e}");
                return None;
            }
        };
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if entry.root == self.root() => Some(entry),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry: {e}");
                None
            }
        }
    }

    fn write_entry(&self, files: &[MarkdownFile]) {
        let entry = CacheEntry {
            root: self.root().to_path_buf(),
            files: files.to_vec(),
            timestamp: Utc::now(),
        };
        let stored = serde_json::to_string(&entry)
            .map_err(Into::into)
            .and_then(|payload| self.store.set(&self.key(), &payload));
        if let Err(e) = stored {
            tracing::warn!("Could not store cache entry: {e}");
        }
    }
}

pub fn cache_key(root: &Path) -> String {
    format!("{CACHE_KEY_PREFIX}:{}", root.display())
}
