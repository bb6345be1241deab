// src/loader/mod.rs
pub mod config;
pub mod outcome;
pub mod scheduler;
pub mod staleness;
pub mod types;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::cache::CacheHandle;
use crate::clock::Clock;
use crate::fetch::RemoteFetcher;
use crate::loader::outcome::FetchOutcome;
use crate::loader::types::{
    CacheEntry, LoadResult, Message, Provider, ProviderKind, CACHE_ENTRY_VERSION,
};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "loader_cache_hits_total",
            "Remote loads served from a fresh cache entry."
        );
        describe_counter!(
            "loader_fetch_total",
            "Remote requests issued, labelled by outcome."
        );
        describe_counter!(
            "loader_cache_read_errors_total",
            "Cache store reads that failed and were treated as a miss."
        );
        describe_counter!(
            "loader_cache_write_errors_total",
            "Cache store writes that failed."
        );
        describe_gauge!(
            "catalog_last_refresh_ts",
            "Unix ts (ms) when the catalog last finished a refresh."
        );
    });
}

/// Public alias: is `provider` due for a refresh, given when it was last loaded?
pub fn should_provider_update(
    provider: &Provider,
    last_updated: Option<u64>,
    clock: &dyn Clock,
) -> bool {
    staleness::should_update(last_updated, provider.update_cycle_in_ms, clock.now_ms())
}

/// Loads one provider at a time: cache read, staleness, conditional fetch, cache write.
pub struct ProviderLoader {
    cache: CacheHandle,
    fetcher: Arc<dyn RemoteFetcher>,
    clock: Arc<dyn Clock>,
}

impl ProviderLoader {
    pub fn new(
        cache: CacheHandle,
        fetcher: Arc<dyn RemoteFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            cache,
            fetcher,
            clock,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Never fails: every error path degrades to an empty message list.
    pub async fn load_messages_for_provider(&self, provider: &Provider) -> LoadResult {
        match &provider.kind {
            ProviderKind::Local { messages } => LoadResult {
                messages: tag_all(messages.iter().cloned(), &provider.id, None),
                last_updated: None,
            },
            ProviderKind::Remote { url } => self.load_remote(provider, url).await,
        }
    }

    async fn load_remote(&self, provider: &Provider, url: &str) -> LoadResult {
        if url.is_empty() {
            return LoadResult::empty();
        }

        let cached = self.cache.entry(&provider.id).await.filter(|e| {
            let same = e.url == url;
            if !same {
                tracing::debug!(
                    target: "loader",
                    provider = %provider.id,
                    cached_url = %e.url,
                    url,
                    "ignoring cache entry for a different url"
                );
            }
            same
        });

        if let Some(entry) = &cached {
            let now = self.clock.now_ms();
            let cycle = provider.update_cycle_in_ms;
            let due = staleness::should_update(Some(entry.last_updated), cycle, now);
            if !due {
                counter!("loader_cache_hits_total").increment(1);
                return LoadResult {
                    messages: tag_all(entry.messages.iter().cloned(), &provider.id, Some(url)),
                    last_updated: Some(entry.last_updated),
                };
            }
        }

        let validator = cached.as_ref().and_then(|e| e.etag.as_deref());
        let outcome = match self.fetcher.request(url, validator).await {
            Ok(resp) => FetchOutcome::from_response(resp).await,
            Err(e) => {
                tracing::warn!(
                    target: "loader",
                    provider = %provider.id,
                    error = ?e,
                    "provider request failed"
                );
                FetchOutcome::TransportFailure
            }
        };
        // Taken after the body is fully read, not when the request went out.
        let received_at = self.clock.now_ms();
        counter!("loader_fetch_total", "outcome" => outcome.label()).increment(1);

        let raw = match outcome {
            FetchOutcome::Fresh { messages, etag, .. } => {
                let entry = CacheEntry {
                    version: CACHE_ENTRY_VERSION,
                    url: url.to_string(),
                    messages,
                    etag,
                    last_updated: received_at,
                };
                self.cache.store(&provider.id, entry.clone()).await;
                entry.messages
            }
            FetchOutcome::NotModified => match cached {
                Some(mut entry) => {
                    entry.last_updated = received_at;
                    let messages = entry.messages.clone();
                    self.cache.store(&provider.id, entry).await;
                    messages
                }
                None => {
                    tracing::debug!(
                        target: "loader",
                        provider = %provider.id,
                        "304 without a cache entry"
                    );
                    Vec::new()
                }
            },
            FetchOutcome::Unusable { status } => {
                tracing::debug!(
                    target: "loader",
                    provider = %provider.id,
                    status,
                    "no usable body"
                );
                Vec::new()
            }
            FetchOutcome::TransportFailure => Vec::new(),
        };

        LoadResult {
            messages: tag_all(raw, &provider.id, Some(url)),
            last_updated: Some(received_at),
        }
    }
}

fn tag_all(
    raw: impl IntoIterator<Item = Value>,
    provider_id: &str,
    provider_url: Option<&str>,
) -> Vec<Message> {
    raw.into_iter()
        .map(|m| Message::tagged(m, provider_id, provider_url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::clock::ManualClock;
    use crate::fetch::MockFetcher;
    use serde_json::json;

    #[tokio::test]
    async fn local_provider_touches_nothing() {
        let fetcher = Arc::new(MockFetcher::new());
        let mem = Arc::new(MemoryCacheStore::new());
        let loader = ProviderLoader::new(
            CacheHandle::new(mem.clone()),
            fetcher.clone(),
            Arc::new(ManualClock::new(5)),
        );
        let p = Provider::local("onboarding", vec![json!({"id": "a"}), json!({"id": "b"})]);
        let out = loader.load_messages_for_provider(&p).await;
        assert_eq!(out.messages.len(), 2);
        assert!(out.messages.iter().all(|m| m.provider() == "onboarding"));
        assert!(out.messages.iter().all(|m| m.provider_url().is_none()));
        assert_eq!(out.last_updated, None);
        assert_eq!(fetcher.call_count(), 0);
        assert!(mem.snapshot().is_empty());
    }

    #[test]
    fn alias_reads_the_given_clock() {
        let clock = ManualClock::new(301);
        let p = Provider::remote("p1", "https://x").with_update_cycle(300);
        assert!(!should_provider_update(&p, Some(1), &clock));
        clock.advance(1);
        assert!(should_provider_update(&p, Some(1), &clock));
        assert!(should_provider_update(&p, None, &clock));
    }
}
