//! In-memory response cache, the default when the host supplies none.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rowsource_api::GetRowsResponse;

use crate::{CacheKey, ResponseCache};

/// How long an entry stays valid unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached response and when it stops being served.
#[derive(Debug, Clone)]
struct CachedResponse {
    response: GetRowsResponse,
    expires_at: Option<Instant>,
}

impl CachedResponse {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// A `HashMap`-backed cache with an optional time-to-live.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, CachedResponse>>,

    /// `None` keeps entries until cleared.
    ttl: Option<Duration>,

    /// Stats for debugging
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    /// Create a cache with the default time-to-live.
    pub fn new() -> Self {
        Self::with_ttl(Some(DEFAULT_TTL))
    }

    /// Create a cache whose entries expire after `ttl` (`None`: never).
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Drop all expired entries.
    pub fn prune_expired(&self) {
        let now = Instant::now();
        self.entries().retain(|_, entry| !entry.is_expired(now));
    }

    /// Get the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, CachedResponse>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<GetRowsResponse> {
        let now = Instant::now();
        let mut entries = self.entries();

        let found = match entries.get(key).map(|entry| entry.is_expired(now)) {
            Some(true) => {
                entries.remove(key);
                None
            }
            Some(false) => entries.get(key).map(|entry| entry.response.clone()),
            None => None,
        };

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    fn set(&self, key: CacheKey, response: GetRowsResponse) {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        self.entries().insert(key, CachedResponse {
            response,
            expires_at,
        });
    }

    fn clear(&self) {
        self.entries().clear();
    }
}

// =========================================================================
// Tests
// =========================================================================
