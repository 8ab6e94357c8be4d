use crate::clock::{Clock, SystemClock};
use crate::error::CacheError;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-write options: how long the value lives and which tags it answers to.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// Counters for the debug view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub keys: Vec<CacheKeyInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheKeyInfo {
    pub key: String,
    pub tags: Vec<String>,
    #[serde(serialize_with = "as_millis")]
    pub expires_in: Duration,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[derive(Debug)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
    tags: HashSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, CacheEntry>,
    /// tag -> keys carrying it. Kept in step with `entries`.
    tag_index: HashMap<String, HashSet<String>>,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        for tag in &entry.tags {
            if let Some(keys) = self.tag_index.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }

    fn insert(&mut self, key: String, entry: CacheEntry) {
        self.remove(&key);
        for tag in &entry.tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(key, entry);
    }
}

/// A read-through cache of query results with TTL expiry and tag invalidation.
///
/// Values are stored as JSON. Reads never block on the backend: a miss is
/// reported and the caller fetches. Concurrent fetches for the same key are not
/// coalesced; the last `set` wins, which is fine because the database stays the
/// source of truth.
pub struct QueryCache {
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl QueryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            default_ttl,
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the raw cached value if present and fresh. Expired entries are evicted.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let (fresh, expired) = match inner.entries.get(key) {
            Some(entry) if entry.expires_at > now => (Some(entry.value.clone()), false),
            Some(_) => (None, true),
            None => (None, false),
        };
        if expired {
            inner.remove(key);
        }
        drop(inner);

        match fresh {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Typed `get`. A value that no longer deserializes into `T` counts as a miss and is dropped.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::warn!(key, error = %e, "Cached value has an unexpected shape; evicting.");
                self.inner.lock().remove(key);
                self.hits.fetch_sub(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `value` under `key`, replacing any previous value, expiry and tags.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, options: SetOptions) -> Result<(), CacheError> {
        let value = serde_json::to_value(value)
            .map_err(|e| CacheError::Serialization(key.to_string(), e))?;
        let ttl = options.ttl.unwrap_or(self.default_ttl);
        let expires_at = self
            .clock
            .now()
            .checked_add(ttl)
            .ok_or_else(|| CacheError::TtlOverflow(key.to_string(), ttl))?;
        let entry = CacheEntry {
            value,
            expires_at,
            tags: options.tags.into_iter().collect(),
        };
        self.inner.lock().insert(key.to_string(), entry);
        Ok(())
    }

    /// Removes every entry carrying `tag`. Returns how many were removed.
    pub fn invalidate(&self, tag: &str) -> usize {
        let mut inner = self.inner.lock();
        let Some(keys) = inner.tag_index.get(tag).cloned() else {
            return 0;
        };
        let mut removed = 0;
        for key in &keys {
            if inner.remove(key).is_some() {
                removed += 1;
            }
        }
        tracing::debug!(tag, removed, "Cache tag invalidated.");
        removed
    }

    pub fn invalidate_key(&self, key: &str) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    /// Drops every entry. Counters are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.tag_index.clear();
    }

    /// Evicts everything that has expired. Returns how many were evicted.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }

    /// Read-through: returns the cached value or awaits `fetch` and caches its `Ok` result.
    /// Errors are passed through and never cached.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, options: SetOptions, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key) {
            return Ok(cached);
        }
        let fresh = fetch().await?;
        if let Err(e) = self.set(key, &fresh, options) {
            tracing::warn!(error = %e, "Skipping cache write.");
        }
        Ok(fresh)
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let inner = self.inner.lock();
        let mut keys: Vec<CacheKeyInfo> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at > now)
            .map(|(key, e)| {
                let mut tags: Vec<String> = e.tags.iter().cloned().collect();
                tags.sort();
                CacheKeyInfo {
                    key: key.clone(),
                    tags,
                    expires_in: e.expires_at - now,
                }
            })
            .collect();
        keys.sort_by(|a, b| a.key.cmp(&b.key));

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            entries: keys.len(),
            hits,
            misses,
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
            keys,
        }
    }
}
