// src/loader/outcome.rs
//! Interpretation of a conditional GET into what the loader should do with it.

use serde_json::Value;

use crate::fetch::RemoteResponse;

const NOT_MODIFIED: u16 = 304;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Body parsed; replace the cache entry. Any status but 304 can land here.
    Fresh {
        status: u16,
        messages: Vec<Value>,
        etag: Option<String>,
    },
    /// Validator matched; reuse the cached messages.
    NotModified,
    /// Empty or malformed body.
    Unusable { status: u16 },
    /// The request never completed.
    TransportFailure,
}

impl FetchOutcome {
    /// Classify a response. The body is only read when it can matter (not on 304).
    pub async fn from_response(mut resp: Box<dyn RemoteResponse>) -> Self {
        let status = resp.status();
        if status == NOT_MODIFIED {
            return FetchOutcome::NotModified;
        }
        let etag = resp.validator();
        let body = match resp.body().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(target: "loader", status, error = %e, "unusable response body");
                None
            }
        };
        Self::from_parts(status, body, etag)
    }

    pub fn from_parts(status: u16, body: Option<Value>, etag: Option<String>) -> Self {
        if status == NOT_MODIFIED {
            return FetchOutcome::NotModified;
        }
        let success = (200..300).contains(&status);
        match body.and_then(|b| extract_messages(b, success)) {
            Some(messages) => FetchOutcome::Fresh {
                status,
                messages,
                etag,
            },
            None => FetchOutcome::Unusable { status },
        }
    }

    /// Metrics/log label.
    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Fresh { .. } => "fresh",
            FetchOutcome::NotModified => "not_modified",
            FetchOutcome::Unusable { .. } => "unusable",
            FetchOutcome::TransportFailure => "transport_failure",
        }
    }
}

/// `{"messages": [...]}` → the array. An object without `messages` reads as
/// empty on 2xx; on any other status it is an error payload, not a catalog.
/// Anything else does not count as a parsed body.
fn extract_messages(body: Value, success: bool) -> Option<Vec<Value>> {
    let Value::Object(mut obj) = body else {
        return None;
    };
    match obj.remove("messages") {
        None | Some(Value::Null) if success => Some(Vec::new()),
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items),
        Some(_) => None,
    }
}
