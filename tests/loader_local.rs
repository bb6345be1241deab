// tests/loader_local.rs
use std::sync::Arc;

use message_loader::cache::{CacheHandle, MemoryCacheStore};
use message_loader::clock::ManualClock;
use message_loader::fetch::MockFetcher;
use message_loader::loader::types::Provider;
use message_loader::loader::ProviderLoader;
use serde_json::json;

#[tokio::test]
async fn local_messages_are_copied_with_provenance() {
    let fetcher = Arc::new(MockFetcher::new());
    let cache = Arc::new(MemoryCacheStore::new());
    let loader = ProviderLoader::new(
        CacheHandle::new(cache.clone()),
        fetcher.clone(),
        Arc::new(ManualClock::new(42)),
    );
    let input = vec![
        json!({"id": "welcome", "template": "simple_snippet"}),
        json!({"id": "tour", "provider": "ignored"}),
        json!("not an object"),
    ];
    let provider = Provider::local("onboarding", input.clone());

    let out = loader.load_messages_for_provider(&provider).await;

    assert_eq!(out.messages.len(), input.len());
    assert!(out.messages.iter().all(|m| m.provider() == "onboarding"));
    assert!(out.messages.iter().all(|m| m.provider_url().is_none()));
    assert_eq!(out.messages[0].get("template"), Some(&json!("simple_snippet")));
    assert_eq!(out.last_updated, None);
    assert_eq!(fetcher.call_count(), 0);
    assert!(cache.snapshot().is_empty());
}

#[tokio::test]
async fn empty_local_provider_is_empty() {
    let loader = ProviderLoader::new(
        CacheHandle::new(Arc::new(MemoryCacheStore::new())),
        Arc::new(MockFetcher::new()),
        Arc::new(ManualClock::new(0)),
    );
    let out = loader
        .load_messages_for_provider(&Provider::local("none", vec![]))
        .await;
    assert!(out.messages.is_empty());
}
