// src/cache/mod.rs
//! Provider snapshot cache: the storage seam plus the handle the loader talks to.

pub mod file;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;
use tokio::sync::Mutex;

use crate::loader::types::CacheEntry;

pub use file::FileCacheStore;

pub type CacheMap = HashMap<String, CacheEntry>;

/// Async key-value store holding the last good snapshot per provider id.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self) -> Result<CacheMap>;
    async fn set(&self, entries: CacheMap) -> Result<()>;
}

/// Process-local store. Also the default for tests.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    inner: std::sync::Mutex<CacheMap>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: CacheMap) -> Self {
        Self {
            inner: std::sync::Mutex::new(entries),
        }
    }

    pub fn snapshot(&self) -> CacheMap {
        self.inner.lock().expect("cache mutex poisoned").clone()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self) -> Result<CacheMap> {
        Ok(self.snapshot())
    }

    async fn set(&self, entries: CacheMap) -> Result<()> {
        *self.inner.lock().expect("cache mutex poisoned") = entries;
        Ok(())
    }
}

/// Shared handle over a `CacheStore`.
///
/// Reads never fail (a store error reads as "no entry"). Writes re-read the map,
/// replace one provider's entry and store it back, all under one async lock, so
/// concurrent loads of different providers keep each other's entries. A write
/// whose re-read fails is dropped.
#[derive(Clone)]
pub struct CacheHandle {
    store: Arc<dyn CacheStore>,
    write_lock: Arc<Mutex<()>>,
}

impl CacheHandle {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn entry(&self, provider_id: &str) -> Option<CacheEntry> {
        match self.store.get().await {
            Ok(mut map) => map.remove(provider_id),
            Err(e) => {
                tracing::warn!(
                    target: "loader",
                    provider = provider_id,
                    error = ?e,
                    "cache read failed"
                );
                counter!("loader_cache_read_errors_total").increment(1);
                None
            }
        }
    }

    /// Best-effort write; failures are logged and counted, never returned.
    pub async fn store(&self, provider_id: &str, entry: CacheEntry) {
        let _guard = self.write_lock.lock().await;
        let mut map = match self.store.get().await {
            Ok(m) => m,
            Err(e) => {
                // `set` replaces the whole map, so writing without the current
                // contents would drop every other provider's entry.
                tracing::warn!(
                    target: "loader",
                    provider = provider_id,
                    error = ?e,
                    "cache unreadable, skipping write"
                );
                counter!("loader_cache_write_errors_total").increment(1);
                return;
            }
        };
        map.insert(provider_id.to_string(), entry);
        if let Err(e) = self.store.set(map).await {
            tracing::warn!(
                target: "loader",
                provider = provider_id,
                error = ?e,
                "cache write failed"
            );
            counter!("loader_cache_write_errors_total").increment(1);
        }
    }
}
