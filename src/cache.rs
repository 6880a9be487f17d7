//! Per-ticker in-memory cache of built surfaces with a fixed time-to-live.
//!
//! ```
//! use std::time::Duration;
//! use ivsurf::SurfaceCache;
//!
//! let cache: SurfaceCache<u32> = SurfaceCache::new(Duration::from_secs(60));
//! let v = cache.get_or_try_insert_with("AAPL", || Ok::<_, ()>(7)).unwrap();
//! assert_eq!(v, 7);
//! assert_eq!(cache.get("aapl"), Some(7));
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

/// Thread-safe map from ticker to a cached value.
///
/// Tickers are case-insensitive. Expired entries are ignored by reads and
/// dropped on the next write or [`purge_expired`](Self::purge_expired).
/// Values are built outside the lock, so concurrent misses on the same
/// ticker may each build; the last insert wins.
#[derive(Debug)]
pub struct SurfaceCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry<T>>>,
}

fn key(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

impl<T: Clone> SurfaceCache<T> {
    /// Empty cache whose entries expire `ttl` after insertion.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Time-to-live of every entry.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<T>>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, entry: &Entry<T>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) < self.ttl
    }

    /// Fresh value for `ticker`, if any. Tickers match case-insensitively.
    pub fn get(&self, ticker: &str) -> Option<T> {
        self.get_at(ticker, Instant::now())
    }

    /// Fresh value for `ticker` as of `now`.
    pub fn get_at(&self, ticker: &str, now: Instant) -> Option<T> {
        self.lock()
            .get(&key(ticker))
            .filter(|e| self.is_fresh(e, now))
            .map(|e| e.value.clone())
    }

    /// Store `value` for `ticker`, replacing any previous entry.
    pub fn insert(&self, ticker: &str, value: T) {
        self.insert_at(ticker, value, Instant::now());
    }

    /// [`SurfaceCache::insert`] stamped at `now`.
    pub fn insert_at(&self, ticker: &str, value: T, now: Instant) {
        self.lock().insert(
            key(ticker),
            Entry {
                value,
                inserted_at: now,
            },
        );
    }

    /// Cached value, or the result of `build` stored and returned.
    ///
    /// # Errors
    /// Propagates the error from `build`; nothing is cached in that case.
    pub fn get_or_try_insert_with<E, F>(&self, ticker: &str, build: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.get_or_try_insert_with_at(ticker, Instant::now(), build)
    }

    pub fn get_or_try_insert_with_at<E, F>(&self, ticker: &str, now: Instant, build: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(hit) = self.get_at(ticker, now) {
            #[cfg(feature = "logging")]
            tracing::debug!(ticker, "surface cache hit");
            return Ok(hit);
        }
        #[cfg(feature = "logging")]
        tracing::debug!(ticker, "surface cache miss");
        let value = build()?;
        self.insert_at(ticker, value.clone(), now);
        Ok(value)
    }

    /// Remove `ticker`; returns whether an entry existed.
    pub fn invalidate(&self, ticker: &str) -> bool {
        self.lock().remove(&key(ticker)).is_some()
    }

    /// Drop stale entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    /// Drop entries stale as of `now`; returns how many were removed.
    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, e| now.saturating_duration_since(e.inserted_at) < self.ttl);
        before - map.len()
    }

    /// Number of entries, stale ones included until purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no entry is held.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
