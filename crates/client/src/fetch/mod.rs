//! Network seam for the worker.
//!
//! The router never talks to reqwest directly. It goes through [`Network`],
//! so the same routing logic runs against the real transport or a stub.
//!
//! ### Cache modes
//! - `Default`: plain request, intermediaries may answer from their caches
//! - `NoStore`: `Cache-Control: no-store`, used for routed same-origin GETs
//! - `NoCache`: `Cache-Control: no-cache` + `Pragma: no-cache`, used for
//!   manifest refreshes so intermediaries revalidate
//!
//! Non-2xx statuses are returned as responses, not errors. Only transport
//! failures (connect, timeout, oversized body) reject.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, cache_key, resolve, same_origin};

use swcache_core::{Error, Request, Response, WorkerConfig};

/// Transport-level caching behaviour requested for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Default,
    NoStore,
    NoCache,
}

impl CacheMode {
    fn headers(self) -> &'static [(&'static str, &'static str)] {
        match self {
            CacheMode::Default => &[],
            CacheMode::NoStore => &[("Cache-Control", "no-store")],
            CacheMode::NoCache => &[("Cache-Control", "no-cache"), ("Pragma", "no-cache")],
        }
    }

    /// Outgoing headers for `headers` under this mode. Any header the mode
    /// sets itself replaces the request's own value.
    fn merge(self, headers: &[(String, String)]) -> Vec<(&str, &str)> {
        let own = self.headers();
        let mut merged = headers
            .iter()
            .filter(|(name, _)| !own.iter().any(|(own_name, _)| own_name.eq_ignore_ascii_case(name)))
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect::<Vec<_>>();
        merged.extend_from_slice(own);
        merged
    }
}

/// Something that can perform a network fetch.
#[async_trait]
pub trait Network: Send + Sync {
    /// Fetch `request` from the network.
    ///
    /// # Errors
    ///
    /// Rejects only when no response was received.
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&WorkerConfig> for FetchConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn transport_error(&self, url: &str, e: &reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::FetchTimeout(format!("{url} after {}ms", self.config.timeout.as_millis()))
        } else {
            Error::Network(format!("{url}: {e}"))
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request, mode: CacheMode) -> Result<Response, Error> {
        let start = Instant::now();
        let url = request.url.as_str();

        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in mode.merge(&request.headers) {
            builder = builder.header(name, value);
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| self.transport_error(url, &e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect::<Vec<_>>();

        let bytes: Bytes = response.bytes().await.map_err(|e| self.transport_error(url, &e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_worker_config() {
        let worker = WorkerConfig { user_agent: "test/1".into(), timeout_ms: 1500, ..Default::default() };
        let config = FetchConfig::from(&worker);
        assert_eq!(config.user_agent, "test/1");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_bytes, worker.max_bytes);
    }

    #[test]
    fn test_cache_mode_headers() {
        assert!(CacheMode::Default.headers().is_empty());
        assert_eq!(CacheMode::NoStore.headers(), &[("Cache-Control", "no-store")]);
        assert!(CacheMode::NoCache.headers().contains(&("Pragma", "no-cache")));
    }

    #[test]
    fn test_cache_mode_replaces_request_directives() {
        let headers = vec![
            ("cache-control".to_string(), "max-age=60".to_string()),
            ("Accept".to_string(), "text/html".to_string()),
            ("Pragma".to_string(), "no-cache".to_string()),
        ];

        let merged = CacheMode::NoStore.merge(&headers);
        assert_eq!(merged, vec![("Accept", "text/html"), ("Pragma", "no-cache"), ("Cache-Control", "no-store")]);

        let merged = CacheMode::NoCache.merge(&headers);
        assert_eq!(merged, vec![("Accept", "text/html"), ("Cache-Control", "no-cache"), ("Pragma", "no-cache")]);
    }

    #[test]
    fn test_default_mode_keeps_request_headers() {
        let headers = vec![("Cache-Control".to_string(), "max-age=60".to_string())];
        assert_eq!(CacheMode::Default.merge(&headers), vec![("Cache-Control", "max-age=60")]);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_rejects() {
        let config = FetchConfig { timeout: Duration::from_millis(500), ..Default::default() };
        let client = FetchClient::new(config).unwrap();
        // Port 9 on loopback (discard) is closed on test machines.
        let request = Request::get("http://127.0.0.1:9/").unwrap();
        let result = client.fetch(&request, CacheMode::NoStore).await;
        assert!(matches!(result, Err(Error::Network(_)) | Err(Error::FetchTimeout(_))));
    }
}
