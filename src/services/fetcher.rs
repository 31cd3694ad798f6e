//! Raw data fetcher: HTTP GET with a read-through / write-through cache.
//!
//! Policy: a fresh cache entry short-circuits the network. A transport
//! failure falls back to a stale cache entry if one exists. A non-success
//! HTTP status is always an error.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ApiError;
use crate::services::cache::ResponseCache;

/// Timeout for a single provider request.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Browser User-Agent for pages the provider refuses to serve to bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/97.0.4692.99 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl Fetcher {
    pub fn new(client: reqwest::Client, cache: Option<Arc<dyn ResponseCache>>) -> Self {
        Self { client, cache }
    }

    /// Build the default HTTP client used for provider requests.
    pub fn default_client() -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Request(format!("failed to build HTTP client: {}", e)))
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Headers that make a request look like it came from a desktop browser.
    pub fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers
    }

    /// Fetch `url` as text.
    ///
    /// With a `cache_key`, a fresh entry (per `max_age`, or the cache default)
    /// is returned without a request, and a successful non-empty body is
    /// written back before returning.
    pub async fn fetch(
        &self,
        url: &str,
        cache_key: Option<&str>,
        max_age: Option<Duration>,
        headers: HeaderMap,
    ) -> Result<String, ApiError> {
        tracing::debug!("Requesting URL {}", url);

        let cache = match (&self.cache, cache_key) {
            (Some(cache), Some(key)) => Some((cache, key)),
            _ => None,
        };

        if let Some((cache, key)) = cache {
            if let Some(cached) = cache.read(key, max_age) {
                tracing::debug!("Cached response used for {}", key);
                return Ok(cached);
            }
        }

        let body = match self.get_text(url, headers).await {
            Ok(body) => body,
            Err(ApiError::Request(reason)) => {
                if let Some(stale) = cache.and_then(|(cache, key)| cache.read_stale(key)) {
                    tracing::warn!(
                        "Request to {} failed ({}), using stale cached response",
                        url,
                        reason
                    );
                    return Ok(stale);
                }
                return Err(ApiError::Request(reason));
            }
            Err(e) => return Err(e),
        };

        if let Some((cache, key)) = cache {
            if !body.is_empty() {
                cache.write(key, &body);
            }
        }

        Ok(body)
    }

    async fn get_text(&self, url: &str, headers: HeaderMap) -> Result<String, ApiError> {
        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        tracing::debug!("Data retrieved from {}, status: {}", url, status);

        response
            .text()
            .await
            .map_err(|e| ApiError::Request(format!("failed to read body: {}", e)))
    }
}
