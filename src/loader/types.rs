// src/loader/types.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version tag written with every cache entry. Not validated on read.
pub const CACHE_ENTRY_VERSION: u32 = 1;

fn default_enabled() -> bool {
    true
}

/// A configured source of messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    pub id: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// `None` means "never stale once loaded".
    #[serde(
        rename = "updateCycleInMs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub update_cycle_in_ms: Option<u64>,
    #[serde(flatten)]
    pub kind: ProviderKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderKind {
    /// Messages embedded in the provider definition itself.
    Local {
        #[serde(default)]
        messages: Vec<Value>,
    },
    /// Messages hosted at `url`. An empty url disables the provider.
    Remote {
        #[serde(default)]
        url: String,
    },
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Local { .. } => "local",
            ProviderKind::Remote { .. } => "remote",
        }
    }
}

impl Provider {
    pub fn local(id: impl Into<String>, messages: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            update_cycle_in_ms: None,
            kind: ProviderKind::Local { messages },
        }
    }

    pub fn remote(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            update_cycle_in_ms: None,
            kind: ProviderKind::Remote { url: url.into() },
        }
    }

    pub fn with_update_cycle(mut self, ms: u64) -> Self {
        self.update_cycle_in_ms = Some(ms);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Last successful snapshot for one provider, as persisted by a `CacheStore`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub version: u32,
    pub url: String,
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub last_updated: u64,
}

/// A message payload with provenance (`provider`, `provider_url`) attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    /// Attach provenance to a raw message. Provenance wins over same-named payload
    /// keys; a non-object payload becomes an object holding only provenance.
    pub fn tagged(raw: Value, provider: &str, provider_url: Option<&str>) -> Self {
        let mut fields = match raw {
            Value::Object(m) => m,
            _ => Map::new(),
        };
        fields.insert("provider".into(), Value::String(provider.to_string()));
        if let Some(url) = provider_url {
            fields.insert("provider_url".into(), Value::String(url.to_string()));
        }
        Self(fields)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn provider(&self) -> &str {
        self.0
            .get("provider")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn provider_url(&self) -> Option<&str> {
        self.0.get("provider_url").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Output of one provider load.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoadResult {
    pub messages: Vec<Message>,
    pub last_updated: Option<u64>,
}

impl LoadResult {
    pub fn empty() -> Self {
        Self::default()
    }
}
