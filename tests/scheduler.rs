// tests/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use message_loader::cache::{CacheHandle, MemoryCacheStore};
use message_loader::catalog::MessageCatalog;
use message_loader::clock::ManualClock;
use message_loader::fetch::MockFetcher;
use message_loader::loader::scheduler::spawn_refresh_task;
use message_loader::loader::types::Provider;
use message_loader::loader::ProviderLoader;
use serde_json::json;

#[tokio::test]
async fn first_tick_fills_the_catalog() {
    let loader = ProviderLoader::new(
        CacheHandle::new(Arc::new(MemoryCacheStore::new())),
        Arc::new(MockFetcher::new()),
        Arc::new(ManualClock::new(0)),
    );
    let catalog = Arc::new(MessageCatalog::new(
        vec![Provider::local("onboarding", vec![json!({"id": "welcome"})])],
        loader,
    ));

    let handle = spawn_refresh_task(catalog.clone(), Duration::from_secs(3600));
    for _ in 0..50 {
        if !catalog.messages().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.abort();

    assert_eq!(catalog.messages().len(), 1);
    assert_eq!(catalog.messages()[0].provider(), "onboarding");
}
