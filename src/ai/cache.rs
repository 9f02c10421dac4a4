use crate::ai::{CompletionOptions, Summarizer};
use crate::error::Result;
use crate::storage::{Store, CHUNK_CACHE_TREE};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sled::{Db, Tree};
use tracing::{debug, warn};

/// Cache for compressed diff chunks
pub struct ChunkCache {
    db: Db,
    tree: Tree,
    ttl_hours: u32,
}

impl ChunkCache {
    /// Open the cache tree inside the store
    pub fn open(store: &Store, ttl_hours: u32) -> Result<Self> {
        let db = store.db().clone();
        let tree = db.open_tree(CHUNK_CACHE_TREE)?;

        Ok(Self { db, tree, ttl_hours })
    }

    /// Generate a cache key from the model, the instruction and the chunk text
    pub fn generate_key(model: &str, system: &str, text: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        model.hash(&mut hasher);
        system.hash(&mut hasher);
        text.hash(&mut hasher);

        format!("chunk_{:x}", hasher.finish())
    }

    /// Get a compression from cache if it exists and is not expired
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        if let Some(data) = self.tree.get(key)? {
            let cached: CachedChunk = serde_json::from_slice(&data)?;

            if self.is_expired(&cached.cached_at) {
                self.tree.remove(key)?;
                return Ok(None);
            }

            Ok(Some(cached.text))
        } else {
            Ok(None)
        }
    }

    /// Store a compression in cache
    pub fn set(&self, key: &str, text: String) -> Result<()> {
        let cached = CachedChunk {
            text,
            cached_at: Utc::now(),
        };

        let data = serde_json::to_vec(&cached)?;
        self.tree.insert(key, data)?;
        self.tree.flush()?;

        Ok(())
    }

    fn is_expired(&self, cached_at: &DateTime<Utc>) -> bool {
        let ttl = Duration::hours(i64::from(self.ttl_hours));
        Utc::now() - *cached_at > ttl
    }

    /// Clear all cache entries
    pub fn clear(&self) -> Result<()> {
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.tree.len(),
            db_size_bytes: self.db.size_on_disk().unwrap_or(0),
        }
    }

    /// Remove expired entries
    pub fn cleanup_expired(&self) -> Result<usize> {
        let mut removed = 0;

        for item in self.tree.iter() {
            let (key, value) = item?;

            if let Ok(cached) = serde_json::from_slice::<CachedChunk>(&value) {
                if self.is_expired(&cached.cached_at) {
                    self.tree.remove(key)?;
                    removed += 1;
                }
            }
        }

        self.tree.flush()?;
        Ok(removed)
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CachedChunk {
    text: String,
    cached_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug)]
pub struct CacheStats {
    pub total_entries: usize,
    pub db_size_bytes: u64,
}

impl CacheStats {
    /// Format size in human-readable format
    pub fn format_size(&self) -> String {
        let bytes = self.db_size_bytes;
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.2} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}

/// Summarizer that remembers deterministic (temperature 0) answers
///
/// Entries are keyed per `model`. Narrative calls pass straight through.
/// Cache read or write failures are logged and never fail the call.
pub struct CachedSummarizer<S> {
    inner: S,
    cache: ChunkCache,
    model: String,
}

impl<S: Summarizer> CachedSummarizer<S> {
    pub fn new(inner: S, cache: ChunkCache, model: impl Into<String>) -> Self {
        Self {
            inner,
            cache,
            model: model.into(),
        }
    }
}

#[async_trait]
impl<S: Summarizer> Summarizer for CachedSummarizer<S> {
    async fn summarize(
        &self,
        system: &str,
        user: &str,
        options: CompletionOptions,
    ) -> Result<String> {
        if !options.is_deterministic() {
            return self.inner.summarize(system, user, options).await;
        }

        let key = ChunkCache::generate_key(&self.model, system, user);
        match self.cache.get(&key) {
            Ok(Some(text)) => {
                debug!(key = %key, "Chunk cache hit");
                return Ok(text);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Chunk cache read failed"),
        }

        let text = self.inner.summarize(system, user, options).await?;
        if let Err(e) = self.cache.set(&key, text.clone()) {
            warn!(error = %e, "Chunk cache write failed");
        }

        Ok(text)
    }
}
