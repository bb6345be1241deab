// src/catalog.rs
//! Multi-provider refresh cycle on top of `ProviderLoader`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use metrics::gauge;
use serde::Serialize;
use tokio::task::JoinSet;

use crate::loader::types::{LoadResult, Message, Provider};
use crate::loader::{should_provider_update, ProviderLoader};

#[derive(Debug, Clone, Default)]
struct ProviderState {
    last_updated: Option<u64>,
    messages: Vec<Message>,
}

/// Per-provider status, as exposed on `/providers`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub enabled: bool,
    pub last_updated: Option<u64>,
    pub message_count: usize,
    pub loading: bool,
}

/// Summary of one `refresh` call.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Providers loaded by this call.
    pub loaded: usize,
    /// Providers skipped because a load was already in flight.
    pub in_flight: usize,
    /// Providers skipped because they are disabled or not due.
    pub skipped: usize,
}

/// Holds the latest messages of every configured provider.
///
/// A provider is never loaded twice at once: `refresh` skips ids that still have
/// a load outstanding from an earlier call.
pub struct MessageCatalog {
    providers: Vec<Provider>,
    loader: Arc<ProviderLoader>,
    state: Mutex<HashMap<String, ProviderState>>,
    in_flight: Mutex<HashSet<String>>,
}

impl MessageCatalog {
    pub fn new(providers: Vec<Provider>, loader: ProviderLoader) -> Self {
        Self {
            providers,
            loader: Arc::new(loader),
            state: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Load every enabled provider that is due, concurrently.
    pub async fn refresh(&self) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        let mut claim = Claim {
            in_flight: &self.in_flight,
            ids: Vec::new(),
        };
        let due: Vec<Provider> = {
            let state = self.state.lock().expect("catalog state poisoned");
            let mut in_flight = self.in_flight.lock().expect("catalog in-flight poisoned");
            let mut due = Vec::new();
            for p in &self.providers {
                let last = state.get(&p.id).and_then(|s| s.last_updated);
                if !p.enabled || !should_provider_update(p, last, self.loader.clock()) {
                    summary.skipped += 1;
                } else if !in_flight.insert(p.id.clone()) {
                    summary.in_flight += 1;
                } else {
                    claim.ids.push(p.id.clone());
                    due.push(p.clone());
                }
            }
            due
        };

        let mut set = JoinSet::new();
        for p in due {
            let loader = Arc::clone(&self.loader);
            set.spawn(async move {
                let result = loader.load_messages_for_provider(&p).await;
                (p.id, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((id, result)) => {
                    self.finish(&id, result);
                    summary.loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(target: "catalog", error = ?e, "provider load task failed");
                }
            }
        }
        drop(claim);

        gauge!("catalog_last_refresh_ts").set(self.loader.clock().now_ms() as f64);
        tracing::debug!(
            target: "catalog",
            loaded = summary.loaded,
            in_flight = summary.in_flight,
            skipped = summary.skipped,
            "refresh finished"
        );
        summary
    }

    fn finish(&self, id: &str, result: LoadResult) {
        let mut state = self.state.lock().expect("catalog state poisoned");
        let entry = state.entry(id.to_string()).or_default();
        entry.last_updated = result.last_updated;
        entry.messages = result.messages;
    }

    /// All messages, in provider order.
    pub fn messages(&self) -> Vec<Message> {
        let state = self.state.lock().expect("catalog state poisoned");
        self.providers
            .iter()
            .filter_map(|p| state.get(&p.id))
            .flat_map(|s| s.messages.iter().cloned())
            .collect()
    }

    pub fn messages_for(&self, provider_id: &str) -> Vec<Message> {
        let state = self.state.lock().expect("catalog state poisoned");
        state
            .get(provider_id)
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    pub fn status(&self) -> Vec<ProviderStatus> {
        let state = self.state.lock().expect("catalog state poisoned");
        let in_flight = self.in_flight.lock().expect("catalog in-flight poisoned");
        self.providers
            .iter()
            .map(|p| {
                let s = state.get(&p.id);
                ProviderStatus {
                    id: p.id.clone(),
                    kind: p.kind.label(),
                    enabled: p.enabled,
                    last_updated: s.and_then(|s| s.last_updated),
                    message_count: s.map(|s| s.messages.len()).unwrap_or(0),
                    loading: in_flight.contains(&p.id),
                }
            })
            .collect()
    }
}

/// In-flight marks taken by one `refresh` call; released on drop, including when
/// the call is cancelled mid-way.
struct Claim<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    ids: Vec<String>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut in_flight = match self.in_flight.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        for id in &self.ids {
            in_flight.remove(id);
        }
    }
}
