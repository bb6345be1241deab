use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::catalog::{MessageCatalog, ProviderStatus, RefreshSummary};
use crate::loader::types::Message;

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<MessageCatalog>,
}

impl AppState {
    pub fn new(catalog: Arc<MessageCatalog>) -> Self {
        Self { catalog }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/messages", get(list_messages))
        .route("/providers", get(list_providers))
        .route("/refresh", post(refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `GET /messages[?provider=<id>]`
async fn list_messages(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Vec<Message>> {
    let out = match q.get("provider") {
        Some(id) => state.catalog.messages_for(id),
        None => state.catalog.messages(),
    };
    Json(out)
}

async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderStatus>> {
    Json(state.catalog.status())
}

async fn refresh(State(state): State<AppState>) -> Json<RefreshSummary> {
    Json(state.catalog.refresh().await)
}
