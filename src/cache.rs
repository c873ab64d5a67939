// In-memory result cache for finished subtitle documents
//
// Entries are keyed by (content id, language) and bounded both by age and
// by count. Every operation runs as one critical section under a single
// mutex.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::error::{Result, SubfuseError};

/// Source of the current time, injectable for tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub content_id: String,
    pub language: String,
}

impl CacheKey {
    pub fn new<S1: Into<String>, S2: Into<String>>(content_id: S1, language: S2) -> Self {
        Self {
            content_id: content_id.into(),
            language: language.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    created_at: DateTime<Utc>,
    /// Insertion sequence, breaks `created_at` ties deterministically
    seq: u64,
}

/// Metadata returned by the maintenance surface
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub content_id: String,
    pub language: String,
    pub cached_at: DateTime<Utc>,
    pub age_secs: i64,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub ttl_secs: u64,
}

struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    next_seq: u64,
}

pub struct ResultCache {
    state: Mutex<CacheState>,
    capacity: usize,
    ttl: Duration,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

/// TTL as a chrono duration, clamped to the largest one chrono can represent
fn ttl_duration(ttl_secs: u64) -> Duration {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

impl ResultCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_seq: 0,
            }),
            capacity: config.max_entries.max(1),
            ttl: ttl_duration(config.ttl_secs),
            ttl_secs: config.ttl_secs,
            clock,
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.created_at > self.ttl
    }

    /// Look up a cached document, dropping it if it outlived the TTL
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => return Some(entry.payload.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("Cache entry expired: {}/{}", key.content_id, key.language);
            state.entries.remove(key);
        }
        None
    }

    /// Store a document, evicting expired entries and then the oldest one when full
    pub fn put(&self, key: CacheKey, payload: String) {
        let now = self.clock.now();
        let mut state = self.state.lock();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            let before = state.entries.len();
            state.entries.retain(|_, entry| now - entry.created_at <= self.ttl);
            let purged = before - state.entries.len();
            if purged > 0 {
                debug!("Purged {} expired cache entries", purged);
            }

            if state.entries.len() >= self.capacity {
                let oldest = state
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| (entry.created_at, entry.seq))
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    debug!("Evicting oldest cache entry: {}/{}", oldest.content_id, oldest.language);
                    state.entries.remove(&oldest);
                }
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key,
            CacheEntry {
                payload,
                created_at: now,
                seq,
            },
        );
    }

    /// Report metadata for one entry without returning its payload
    pub fn inspect(&self, key: &CacheKey) -> Option<CacheEntryInfo> {
        let now = self.clock.now();
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => {
                return Some(CacheEntryInfo {
                    content_id: key.content_id.clone(),
                    language: key.language.clone(),
                    cached_at: entry.created_at,
                    age_secs: (now - entry.created_at).num_seconds(),
                    size: entry.payload.len(),
                });
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.remove(key);
        }
        None
    }

    /// Remove one entry, returning whether it existed
    pub fn remove(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.remove(key).is_some()
    }

    /// Remove every language cached for one content id
    pub fn remove_content(&self, content_id: &str) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| key.content_id != content_id);
        before - state.entries.len()
    }

    /// Empty the cache, returning how many entries were removed
    pub fn clear(&self) -> Result<usize> {
        let mut state = self.state.lock();
        let removed = state.entries.len();
        state.entries.clear();

        if !state.entries.is_empty() {
            return Err(SubfuseError::CacheInvariant(format!(
                "{} entries remained after clearing {}",
                state.entries.len(),
                removed
            )));
        }

        info!("Cleared {} cache entries", removed);
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            capacity: self.capacity,
            ttl_secs: self.ttl_secs,
        }
    }
}
