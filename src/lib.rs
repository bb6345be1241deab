// src/lib.rs
// Public library surface for the server binary and integration tests.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod fetch;
pub mod loader;
pub mod metrics;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router as router;
pub use crate::cache::{CacheHandle, CacheStore, FileCacheStore, MemoryCacheStore};
pub use crate::catalog::MessageCatalog;
pub use crate::clock::{Clock, SystemClock};
pub use crate::fetch::{HttpFetcher, RemoteFetcher, RemoteResponse};
pub use crate::loader::types::{CacheEntry, LoadResult, Message, Provider, ProviderKind};
pub use crate::loader::{should_provider_update, ProviderLoader};
