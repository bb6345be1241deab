// src/fetch.rs
//! Remote transport seam: a conditional GET and a lazily-read JSON body.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use serde_json::Value;
use tokio::sync::Notify;

use crate::clock::ManualClock;

#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Issue a GET to `url`, sending `validator` as `If-None-Match` when present.
    /// An `Err` means the request never completed (transport failure).
    async fn request(
        &self,
        url: &str,
        validator: Option<&str>,
    ) -> Result<Box<dyn RemoteResponse>>;
}

#[async_trait]
pub trait RemoteResponse: Send {
    fn status(&self) -> u16;

    /// Validator token (ETag) returned by the server, if any.
    fn validator(&self) -> Option<String>;

    /// Read the body. `Ok(None)` for an empty body, `Err` if it is not valid JSON.
    async fn body(&mut self) -> Result<Option<Value>>;
}

/// Largest response body `HttpFetcher` reads by default.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// `RemoteFetcher` over reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("message-loader/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("building reqwest client")?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Bodies over `limit` bytes fail to read.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn request(
        &self,
        url: &str,
        validator: Option<&str>,
    ) -> Result<Box<dyn RemoteResponse>> {
        let mut req = self.client.get(url);
        if let Some(etag) = validator {
            req = req.header(IF_NONE_MATCH, etag);
        }
        let resp = req.send().await.with_context(|| format!("GET {url}"))?;
        Ok(Box::new(HttpResponse {
            inner: Some(resp),
            max_body_bytes: self.max_body_bytes,
        }))
    }
}

struct HttpResponse {
    inner: Option<reqwest::Response>,
    max_body_bytes: usize,
}

#[async_trait]
impl RemoteResponse for HttpResponse {
    fn status(&self) -> u16 {
        self.inner.as_ref().map(|r| r.status().as_u16()).unwrap_or(0)
    }

    fn validator(&self) -> Option<String> {
        self.inner
            .as_ref()?
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    async fn body(&mut self) -> Result<Option<Value>> {
        let mut resp = self
            .inner
            .take()
            .ok_or_else(|| anyhow!("response body already consumed"))?;
        let limit = self.max_body_bytes;
        if let Some(len) = resp.content_length() {
            if len > limit as u64 {
                bail!("response body of {len} bytes exceeds {limit}");
            }
        }
        // Content-Length may be absent (chunked), so the cap also applies while reading.
        let mut buf = Vec::new();
        while let Some(chunk) = resp.chunk().await.context("reading response body")? {
            if buf.len() + chunk.len() > limit {
                bail!("response body exceeds {limit} bytes");
            }
            buf.extend_from_slice(&chunk);
        }
        parse_body(&buf)
    }
}

fn parse_body(bytes: &[u8]) -> Result<Option<Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let v = serde_json::from_slice(bytes).context("parsing response JSON")?;
    Ok(Some(v))
}

// --- Test helper ---

/// Scripted reply for `MockFetcher`.
#[derive(Clone, Debug)]
pub enum MockReply {
    Response(MockResponse),
    /// Request fails before any response arrives.
    Fail(String),
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub etag: Option<String>,
    pub body: String,
    read_delay: Option<(Arc<ManualClock>, u64)>,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            etag: None,
            body: body.into(),
            read_delay: None,
        }
    }

    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn not_modified() -> Self {
        Self::new(304, "")
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Advance `clock` by `ms` while the body is being read.
    pub fn with_read_delay(mut self, clock: Arc<ManualClock>, ms: u64) -> Self {
        self.read_delay = Some((clock, ms));
        self
    }
}

/// In-memory `RemoteFetcher` that replays scripted replies per url and records calls.
#[derive(Default)]
pub struct MockFetcher {
    replies: Mutex<HashMap<String, MockReply>>,
    pub calls: Mutex<Vec<(String, Option<String>)>>,
    gate: Option<Arc<Notify>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request waits for one `notify_one()` on `gate` before replying.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn reply(&self, url: &str, reply: MockReply) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), reply);
    }

    pub fn respond(&self, url: &str, resp: MockResponse) {
        self.reply(url, MockReply::Response(resp));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteFetcher for MockFetcher {
    async fn request(
        &self,
        url: &str,
        validator: Option<&str>,
    ) -> Result<Box<dyn RemoteResponse>> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), validator.map(str::to_string)));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let reply = self.replies.lock().unwrap().get(url).cloned();
        match reply {
            Some(MockReply::Response(r)) => Ok(Box::new(r)),
            Some(MockReply::Fail(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("no scripted reply for {url}")),
        }
    }
}

#[async_trait]
impl RemoteResponse for MockResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn validator(&self) -> Option<String> {
        self.etag.clone()
    }

    async fn body(&mut self) -> Result<Option<Value>> {
        if let Some((clock, ms)) = &self.read_delay {
            clock.advance(*ms);
        }
        parse_body(self.body.as_bytes())
    }
}
