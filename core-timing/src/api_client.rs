//! # Remote API Client
//!
//! Thin JSON client for the remote timing API with a time-to-live response
//! cache.
//!
//! Responses are cached as raw bytes keyed by the fully resolved request URL
//! (path plus query) and decoded on every read. Expiry is checked lazily when
//! an entry is read; [`ApiClient::purge_expired`] is available for hosts that
//! want to reclaim memory explicitly. Failures are never cached.
//!
//! Concurrent identical requests are not coalesced here; the index service
//! deduplicates at chapter granularity.

use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::time::Clock;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_runtime::config::TimingConfig;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Result, TimingError};

/// Default lifetime of a cached response.
pub const DEFAULT_RESPONSE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
struct CachedResponse {
    data: Bytes,
    expires_at: DateTime<Utc>,
}

pub struct ApiClient {
    base_url: Url,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    api_key: Option<String>,
    request_timeout: Option<Duration>,
    cache: Mutex<HashMap<String, CachedResponse>>,
}

impl ApiClient {
    /// `base_url` should end with `/` so relative paths are appended to it.
    pub fn new(base_url: Url, http_client: Arc<dyn HttpClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_url,
            http_client,
            clock,
            ttl: DEFAULT_RESPONSE_TTL,
            api_key: None,
            request_timeout: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &TimingConfig) -> Self {
        Self::new(
            config.api_base_url.clone(),
            Arc::clone(&config.http_client),
            Arc::clone(&config.clock),
        )
        .with_ttl(config.response_ttl)
        .with_api_key(config.api_key.clone())
        .with_request_timeout(config.request_timeout)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, CachedResponse>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves `path` against the base URL and appends the query pairs in order.
    pub fn build_url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TimingError::InvalidUrl(format!("{}{}: {}", self.base_url, path, e)))?;

        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }

    /// Fetches and decodes `path` with `query`, serving from cache while fresh.
    ///
    /// # Errors
    ///
    /// - [`TimingError::InvalidUrl`] if the URL cannot be built
    /// - [`TimingError::InvalidResponse`] on transport failure or a non-2xx status
    /// - [`TimingError::UnsupportedSchema`] if the body does not decode as `T`
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.build_url(path, query)?;
        let key = url.to_string();

        if let Some(data) = self.cached(&key) {
            debug!(url = %key, "API response served from cache");
            return decode(&key, &data);
        }

        let data = self.fetch(url).await?;
        let value = decode(&key, &data)?;
        self.store(key, data);
        Ok(value)
    }

    async fn fetch(&self, url: Url) -> Result<Bytes> {
        let mut request = HttpRequest::get(url.as_str()).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_token(key.as_str());
        }
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        debug!(url = %url, "Requesting remote timing API");

        let response = self.http_client.execute(request).await.map_err(|e| {
            warn!(url = %url, error = %e, "Remote timing API request failed");
            TimingError::InvalidResponse(format!("{}: {}", url, e))
        })?;

        if !response.is_success() {
            warn!(url = %url, status = response.status, "Remote timing API returned error status");
            return Err(TimingError::InvalidResponse(format!(
                "{} returned HTTP {}",
                url, response.status
            )));
        }

        Ok(response.body)
    }

    fn cached(&self, key: &str) -> Option<Bytes> {
        let now = self.clock.now();
        let mut cache = self.lock_cache();
        match cache.get(key) {
            Some(entry) if now < entry.expires_at => Some(entry.data.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: String, data: Bytes) {
        let now = self.clock.now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        let expires_at = now
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        self.lock_cache()
            .insert(key, CachedResponse { data, expires_at });
    }

    /// Number of cached responses, including expired ones not yet read.
    pub fn cached_entries(&self) -> usize {
        self.lock_cache().len()
    }

    /// Drops expired responses and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut cache = self.lock_cache();
        let before = cache.len();
        cache.retain(|_, entry| now < entry.expires_at);
        before - cache.len()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }
}

fn decode<T: DeserializeOwned>(url: &str, data: &[u8]) -> Result<T> {
    serde_json::from_slice(data)
        .map_err(|e| TimingError::UnsupportedSchema(format!("{}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{HttpResponse, SystemClock};
    use mockall::mock;

    mock! {
        pub Http {}

        #[async_trait::async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn client() -> ApiClient {
        ApiClient::new(
            Url::parse("https://api.example.com/api/v1/").unwrap(),
            Arc::new(MockHttp::new()),
            Arc::new(SystemClock),
        )
    }

    #[test]
    fn test_build_url_appends_path_and_query() {
        let url = client()
            .build_url(
                "/assets/11/tracks/",
                &[("page", "2".to_string()), ("page_size", "100".to_string())],
            )
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/v1/assets/11/tracks/?page=2&page_size=100"
        );
    }

    #[test]
    fn test_build_url_without_query() {
        let url = client().build_url("assets/3/", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/assets/3/");
        assert_eq!(url.query(), None);
    }

    #[tokio::test]
    async fn test_request_sends_auth_and_accept_headers() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|request| {
                request.headers.get("Authorization").map(String::as_str) == Some("Bearer k-1")
                    && request.headers.get("Accept").map(String::as_str)
                        == Some("application/json")
                    && request.timeout == Some(Duration::from_secs(5))
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"count":0}"#)));

        let client = ApiClient::new(
            Url::parse("https://api.example.com/").unwrap(),
            Arc::new(http),
            Arc::new(SystemClock),
        )
        .with_api_key(Some("k-1".to_string()))
        .with_request_timeout(Duration::from_secs(5));

        let value: serde_json::Value = client.request("assets/1/tracks/", &[]).await.unwrap();
        assert_eq!(value["count"], 0);
        assert_eq!(client.cached_entries(), 1);
    }
}
