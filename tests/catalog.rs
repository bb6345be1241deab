// tests/catalog.rs
//
// Multi-provider refresh: aggregation order, staleness gating, disabled
// providers and single-flight per provider id.

use std::sync::Arc;

use message_loader::cache::{CacheHandle, MemoryCacheStore};
use message_loader::catalog::MessageCatalog;
use message_loader::clock::ManualClock;
use message_loader::fetch::{MockFetcher, MockReply, MockResponse};
use message_loader::loader::types::Provider;
use message_loader::loader::ProviderLoader;
use serde_json::json;
use tokio::sync::Notify;

fn catalog_with(
    providers: Vec<Provider>,
    fetcher: Arc<MockFetcher>,
    clock: Arc<ManualClock>,
) -> MessageCatalog {
    let loader = ProviderLoader::new(
        CacheHandle::new(Arc::new(MemoryCacheStore::new())),
        fetcher,
        clock,
    );
    MessageCatalog::new(providers, loader)
}

#[tokio::test]
async fn refresh_aggregates_in_provider_order() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.respond(
        "https://a",
        MockResponse::json(200, &json!({"messages": [{"id": "r1"}, {"id": "r2"}]})),
    );
    fetcher.reply("https://down", MockReply::Fail("dns".into()));
    let providers = vec![
        Provider::local("local", vec![json!({"id": "l1"})]),
        Provider::remote("remote", "https://a").with_update_cycle(1_000),
        Provider::remote("broken", "https://down"),
        Provider::remote("off", "https://never").disabled(),
    ];
    let catalog = catalog_with(providers, fetcher.clone(), Arc::new(ManualClock::new(10)));

    let summary = catalog.refresh().await;

    assert_eq!(summary.loaded, 3);
    assert_eq!(summary.skipped, 1);
    let ids: Vec<_> = catalog
        .messages()
        .iter()
        .map(|m| m.id().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["l1", "r1", "r2"]);
    assert!(catalog.messages_for("broken").is_empty());
    assert_eq!(fetcher.call_count(), 2);

    let status = catalog.status();
    assert_eq!(status[1].message_count, 2);
    assert_eq!(status[1].last_updated, Some(10));
    assert_eq!(status[1].kind, "remote");
    assert!(!status[3].enabled);
    assert!(status.iter().all(|s| !s.loading));
}

#[tokio::test]
async fn remote_provider_waits_for_its_cycle() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.respond(
        "https://a",
        MockResponse::json(200, &json!({"messages": [{"id": "r1"}]})),
    );
    let clock = Arc::new(ManualClock::new(0));
    let catalog = catalog_with(
        vec![Provider::remote("remote", "https://a").with_update_cycle(300)],
        fetcher.clone(),
        clock.clone(),
    );

    catalog.refresh().await;
    clock.advance(300);
    let second = catalog.refresh().await;
    assert_eq!(second.skipped, 1);
    assert_eq!(fetcher.call_count(), 1);

    clock.advance(1);
    let third = catalog.refresh().await;
    assert_eq!(third.loaded, 1);
    // Cache entry is stale too, so the network is hit again.
    assert_eq!(fetcher.call_count(), 2);
}

#[tokio::test]
async fn overlapping_refresh_does_not_reload_in_flight_provider() {
    let gate = Arc::new(Notify::new());
    let fetcher = Arc::new(MockFetcher::gated(gate.clone()));
    fetcher.respond(
        "https://a",
        MockResponse::json(200, &json!({"messages": [{"id": "r1"}]})),
    );
    let catalog = catalog_with(
        vec![Provider::remote("remote", "https://a").with_update_cycle(300)],
        fetcher.clone(),
        Arc::new(ManualClock::new(0)),
    );

    let (first, second) = tokio::join!(catalog.refresh(), async {
        let s = catalog.refresh().await;
        gate.notify_one();
        s
    });

    assert_eq!(first.loaded, 1);
    assert_eq!(second.loaded, 0);
    assert_eq!(second.in_flight, 1);
    assert_eq!(fetcher.call_count(), 1);
    assert_eq!(catalog.messages().len(), 1);
    assert!(!catalog.status()[0].loading);
}
