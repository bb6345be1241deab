// src/config/server.rs
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_CACHE_PATH: &str = "state/provider_cache.json";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 4;

/// Runtime settings for the server binary. Read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub cache_path: PathBuf,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,
    pub http_connect_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            http_connect_timeout: Duration::from_secs(DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Unset or unparsable values fall back to the defaults (with a warning for the latter).
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            bind_addr: env_parse("BIND_ADDR").unwrap_or(d.bind_addr),
            cache_path: std::env::var("MESSAGE_CACHE_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(d.cache_path),
            refresh_interval: env_parse("REFRESH_INTERVAL_SECS")
                .filter(|s: &u64| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(d.refresh_interval),
            http_timeout: env_parse("HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.http_timeout),
            http_connect_timeout: env_parse("HTTP_CONNECT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(d.http_connect_timeout),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable env value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const KEYS: [&str; 5] = [
        "BIND_ADDR",
        "MESSAGE_CACHE_PATH",
        "REFRESH_INTERVAL_SECS",
        "HTTP_TIMEOUT_SECS",
        "HTTP_CONNECT_TIMEOUT_SECS",
    ];

    #[serial_test::serial]
    #[test]
    fn defaults_when_env_is_empty() {
        for k in KEYS {
            env::remove_var(k);
        }
        let cfg = ServerConfig::from_env();
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_and_bad_values_fall_back() {
        env::set_var("BIND_ADDR", "0.0.0.0:9090");
        env::set_var("REFRESH_INTERVAL_SECS", "0");
        env::set_var("HTTP_TIMEOUT_SECS", "abc");
        env::set_var("MESSAGE_CACHE_PATH", "/tmp/c.json");
        let cfg = ServerConfig::from_env();
        assert_eq!(cfg.bind_addr.port(), 9090);
        assert_eq!(cfg.refresh_interval, Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS));
        assert_eq!(cfg.http_timeout, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
        assert_eq!(cfg.cache_path, PathBuf::from("/tmp/c.json"));
        for k in KEYS {
            env::remove_var(k);
        }
    }
}
