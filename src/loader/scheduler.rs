// src/loader/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::catalog::MessageCatalog;

/// Spawn a background task that refreshes the catalog every `interval`.
/// The first tick fires immediately.
pub fn spawn_refresh_task(catalog: Arc<MessageCatalog>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let summary = catalog.refresh().await;
            counter!("catalog_refresh_runs_total").increment(1);
            tracing::info!(
                target: "catalog",
                loaded = summary.loaded,
                in_flight = summary.in_flight,
                skipped = summary.skipped,
                messages = catalog.messages().len(),
                "scheduled refresh tick"
            );
        }
    })
}
