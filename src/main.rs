//! Message loader — binary entrypoint.
//! Loads the provider list, wires the cache/fetcher/catalog, starts the refresh
//! task and serves the HTTP API.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use message_loader::api::{self, AppState};
use message_loader::config::ServerConfig;
use message_loader::loader::{config::load_providers_default, scheduler::spawn_refresh_task};
use message_loader::metrics::Metrics;
use message_loader::{
    CacheHandle, FileCacheStore, HttpFetcher, MessageCatalog, ProviderLoader, SystemClock,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("message_loader=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    // Recorder first so metric descriptions registered below are kept.
    let metrics = Metrics::init()?;

    let cfg = ServerConfig::from_env();
    let providers = load_providers_default().context("loading provider config")?;
    tracing::info!(
        providers = providers.len(),
        cache = %cfg.cache_path.display(),
        "starting message loader"
    );

    let cache = CacheHandle::new(Arc::new(FileCacheStore::new(&cfg.cache_path)));
    let fetcher = HttpFetcher::new(cfg.http_connect_timeout, cfg.http_timeout)?;
    let loader = ProviderLoader::new(cache, Arc::new(fetcher), Arc::new(SystemClock));
    let catalog = Arc::new(MessageCatalog::new(providers, loader));

    let _refresh = spawn_refresh_task(catalog.clone(), cfg.refresh_interval);

    let router = api::create_router(AppState::new(catalog)).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "listening");
    axum::serve(listener, router).await.context("server error")?;
    Ok(())
}
