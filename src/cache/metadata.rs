//! Time-bounded cache of remote metadata payloads
//!
//! One file per cache key directly under the cache home. An entry whose
//! modification time is older than the freshness window is refetched;
//! otherwise the network is never touched. There is no locking: concurrent
//! processes may race on the same key and the last writer wins.

use crate::error::{BazeliskError, BazeliskResult};
use crate::http::HttpClient;
use chrono::{DateTime, TimeDelta, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Maximum age of a cached payload before it must be refetched
pub const FRESHNESS_WINDOW: TimeDelta = TimeDelta::hours(1);

/// A cached payload as found on disk
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Vec<u8>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether the entry is younger than `window` at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        now - self.fetched_at < window
    }
}

/// Read-through, write-through cache for remote metadata
#[derive(Clone)]
pub struct MetadataCache {
    root: PathBuf,
    client: Arc<dyn HttpClient>,
    token: Option<String>,
    freshness: TimeDelta,
}

impl MetadataCache {
    /// Create a cache rooted at `root`; `token` authenticates cached fetches
    pub fn new(
        root: impl Into<PathBuf>,
        client: Arc<dyn HttpClient>,
        token: Option<String>,
    ) -> Self {
        Self {
            root: root.into(),
            client,
            token,
            freshness: FRESHNESS_WINDOW,
        }
    }

    /// Override the freshness window
    pub fn with_freshness(mut self, window: TimeDelta) -> Self {
        self.freshness = window;
        self
    }

    /// The HTTP client this cache fetches through
    pub fn client(&self) -> &Arc<dyn HttpClient> {
        &self.client
    }

    /// Return the payload for `key`, fetching `url` when the entry is missing
    /// or stale. `description` only feeds error messages.
    pub async fn fetch(&self, url: &str, key: &str, description: &str) -> BazeliskResult<Vec<u8>> {
        if let Some(entry) = self.entry(key).await? {
            if entry.is_fresh(Utc::now(), self.freshness) {
                debug!("Cache hit for {} (fetched {})", key, entry.fetched_at);
                return Ok(entry.payload);
            }
            debug!("Cache entry {} is stale", key);
        }

        let body = self.fetch_remote(url, description, self.token.as_deref()).await?;

        fs::create_dir_all(&self.root).await.map_err(|e| {
            BazeliskError::io(format!("creating directory {}", self.root.display()), e)
        })?;
        let path = self.cache_path(key);
        fs::write(&path, &body)
            .await
            .map_err(|e| BazeliskError::io(format!("writing cache file {}", path.display()), e))?;

        debug!("Cached {} ({} bytes)", key, body.len());
        Ok(body)
    }

    /// Fetch `url` without consulting or populating the cache and without
    /// credentials
    pub async fn fetch_uncached(&self, url: &str, description: &str) -> BazeliskResult<Vec<u8>> {
        self.fetch_remote(url, description, None).await
    }

    /// Load the on-disk entry for `key`, regardless of age
    pub async fn entry(&self, key: &str) -> BazeliskResult<Option<CacheEntry>> {
        let path = self.cache_path(key);
        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BazeliskError::io(
                    format!("reading cache file {}", path.display()),
                    e,
                ))
            }
        };

        let modified = metadata
            .modified()
            .map_err(|e| BazeliskError::io(format!("reading mtime of {}", path.display()), e))?;
        let payload = fs::read(&path)
            .await
            .map_err(|e| BazeliskError::io(format!("reading cache file {}", path.display()), e))?;

        Ok(Some(CacheEntry {
            key: key.to_string(),
            payload,
            fetched_at: DateTime::<Utc>::from(modified),
        }))
    }

    async fn fetch_remote(
        &self,
        url: &str,
        description: &str,
        token: Option<&str>,
    ) -> BazeliskResult<Vec<u8>> {
        self.client
            .get(url, token)
            .await
            .map_err(|e| BazeliskError::MetadataFetch {
                description: description.to_string(),
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn cache_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}
