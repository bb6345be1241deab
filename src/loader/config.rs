// src/loader/config.rs
use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::loader::types::Provider;

pub const ENV_PROVIDERS_PATH: &str = "MESSAGE_PROVIDERS_PATH";

/// Load providers from an explicit path. Supports TOML or JSON formats.
pub fn load_providers_from(path: &Path) -> Result<Vec<Provider>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading providers from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_providers(&content, ext.as_str())
        .with_context(|| format!("parsing providers from {}", path.display()))
}

/// Load providers using env var + fallbacks:
/// 1) $MESSAGE_PROVIDERS_PATH
/// 2) config/providers.toml
/// 3) config/providers.json
pub fn load_providers_default() -> Result<Vec<Provider>> {
    if let Ok(p) = std::env::var(ENV_PROVIDERS_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_providers_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PROVIDERS_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/providers.toml");
    if toml_p.exists() {
        return load_providers_from(&toml_p);
    }
    let json_p = PathBuf::from("config/providers.json");
    if json_p.exists() {
        return load_providers_from(&json_p);
    }
    Ok(Vec::new())
}

#[derive(serde::Deserialize)]
struct ProvidersFile {
    #[serde(default)]
    providers: Vec<Provider>,
}

fn parse_providers(s: &str, hint_ext: &str) -> Result<Vec<Provider>> {
    if hint_ext == "toml" {
        let f: ProvidersFile = toml::from_str(s)?;
        return Ok(dedup_ids(f.providers));
    }
    if hint_ext == "json" {
        return parse_json(s);
    }
    // No usable extension: JSON first, then TOML.
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if let Ok(f) = toml::from_str::<ProvidersFile>(s) {
        return Ok(dedup_ids(f.providers));
    }
    Err(anyhow!("unsupported providers format"))
}

fn parse_json(s: &str) -> Result<Vec<Provider>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum JsonProviders {
        Wrapped(ProvidersFile),
        Bare(Vec<Provider>),
    }
    let v = match serde_json::from_str(s)? {
        JsonProviders::Wrapped(f) => f.providers,
        JsonProviders::Bare(v) => v,
    };
    Ok(dedup_ids(v))
}

/// Ids are unique; the first definition wins.
fn dedup_ids(items: Vec<Provider>) -> Vec<Provider> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for p in items {
        if seen.insert(p.id.clone()) {
            out.push(p);
        } else {
            tracing::warn!(target: "loader", provider = %p.id, "duplicate provider id dropped");
        }
    }
    out
}
