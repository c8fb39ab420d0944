//! # Credential Cache
//!
//! Time-bounded, in-memory copy of a credential blob owned by a single
//! [`AkashClient`](crate::client::AkashClient).
//!
//! A read is served only while `now - last_refreshed <= ttl`. The blob, its
//! timestamp and the ttl live behind one `RwLock`, so readers never observe a
//! half-written entry. Refreshes are serialized by a separate mutex: a refresh
//! in flight does not block readers of a still-fresh entry, and concurrent
//! `get` calls that all found the entry stale collapse into one loader call.
//!
//! Every lookup (`read` or `get`) counts exactly one hit or one miss. A miss
//! is a lookup that found the entry empty or stale. A `get` that misses also
//! counts one refresh for each loader call it makes, so misses and refreshes
//! diverge only when concurrent callers share a single load.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;
use zeroize::Zeroizing;

use crate::constants::DEFAULT_CREDENTIAL_CACHE_TTL;
use crate::observability::metrics;

/// Secret bytes, wiped when dropped
pub type CredentialBlob = Zeroizing<Vec<u8>>;

#[derive(Debug)]
struct Entry {
    blob: CredentialBlob,
    refreshed_at: Option<Instant>,
    ttl: Duration,
}

impl Entry {
    fn fresh_blob(&self, now: Instant) -> Option<CredentialBlob> {
        let refreshed_at = self.refreshed_at?;
        (now.saturating_duration_since(refreshed_at) <= self.ttl).then(|| self.blob.clone())
    }
}

/// Lookup counters of one cache, also exported process-wide as metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub refreshes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    refreshes: AtomicU64,
}

pub struct CredentialCache {
    entry: RwLock<Entry>,
    refresh_guard: Mutex<()>,
    counters: Counters,
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the blob
        f.debug_struct("CredentialCache").finish_non_exhaustive()
    }
}

impl Default for CredentialCache {
    fn default() -> Self {
        Self::new(DEFAULT_CREDENTIAL_CACHE_TTL)
    }
}

impl CredentialCache {
    /// An empty cache; the first `read` misses
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(Entry {
                blob: Zeroizing::new(Vec::new()),
                refreshed_at: None,
                ttl,
            }),
            refresh_guard: Mutex::new(()),
            counters: Counters::default(),
        }
    }

    /// Returns the cached blob if it is still fresh. Never calls a loader.
    pub async fn read(&self) -> Option<CredentialBlob> {
        let blob = self.fresh().await;
        self.count_lookup(blob.is_some());
        blob
    }

    /// Counters of this cache since it was created.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
        }
    }

    /// Serve a fresh blob, loading it at most once per staleness window.
    pub async fn get<F, Fut, E>(&self, loader: F) -> Result<CredentialBlob, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let cached = self.fresh().await;
        self.count_lookup(cached.is_some());
        if let Some(blob) = cached {
            return Ok(blob);
        }

        let _guard = self.refresh_guard.lock().await;
        // Another caller may have refreshed while we waited for the guard
        if let Some(blob) = self.fresh().await {
            debug!("credential refreshed by a concurrent caller");
            return Ok(blob);
        }
        self.load_and_store(loader).await
    }

    /// Invoke `loader` and replace the entry on success. On failure the
    /// existing entry is left untouched and the error is returned.
    pub async fn refresh<F, Fut, E>(&self, loader: F) -> Result<CredentialBlob, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let _guard = self.refresh_guard.lock().await;
        self.load_and_store(loader).await
    }

    /// Refresh regardless of freshness, for an explicit refresh request.
    pub async fn force_refresh<F, Fut, E>(&self, loader: F) -> Result<CredentialBlob, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        debug!("forced credential refresh");
        self.refresh(loader).await
    }

    /// Populate the cache with a blob that was loaded elsewhere.
    pub async fn store(&self, blob: Vec<u8>) {
        let mut entry = self.entry.write().await;
        entry.blob = Zeroizing::new(blob);
        entry.refreshed_at = Some(Instant::now());
    }

    /// Change the ttl. An entry already cached simply expires against the new value.
    pub async fn set_ttl(&self, ttl: Duration) {
        self.entry.write().await.ttl = ttl;
    }

    pub async fn ttl(&self) -> Duration {
        self.entry.read().await.ttl
    }

    /// The last blob stored, ignoring freshness. Used for credentials that have
    /// no refresh path.
    pub(crate) async fn last_loaded(&self) -> CredentialBlob {
        self.entry.read().await.blob.clone()
    }

    async fn fresh(&self) -> Option<CredentialBlob> {
        self.entry.read().await.fresh_blob(Instant::now())
    }

    fn count_lookup(&self, hit: bool) {
        if hit {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            metrics::increment_credential_cache_hits();
        } else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            metrics::increment_credential_cache_misses();
        }
    }

    async fn load_and_store<F, Fut, E>(&self, loader: F) -> Result<CredentialBlob, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
        metrics::increment_credential_refreshes();
        let blob = Zeroizing::new(loader().await?);

        let mut entry = self.entry.write().await;
        entry.blob = blob.clone();
        entry.refreshed_at = Some(Instant::now());
        Ok(blob)
    }
}
