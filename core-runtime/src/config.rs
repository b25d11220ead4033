//! # Timing Configuration Module
//!
//! Provides configuration management for the recitation timing core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `TimingConfig` holding every bridge and setting the timing services need.
//! It enforces fail-fast validation so that a bad base URL or a missing
//! capability is reported at startup instead of on the first playback query.
//!
//! ## Bridges (with platform defaults)
//!
//! - `HttpClient` - Remote timing API (desktop default: reqwest)
//! - `ResourceStore` - Bundled timing files (desktop default: tokio fs rooted at `resource_dir`)
//! - `Clock` - TTL bookkeeping (default: system clock)
//!
//! When the `desktop-shims` feature is disabled, the HTTP client and the
//! resource store must be injected explicitly.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::TimingConfig;
//!
//! let config = TimingConfig::builder()
//!     .resource_dir("/usr/share/recitation/resources")
//!     .api_key("itqan-key")
//!     .from_env()?
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::redact_if_sensitive;
use bridge_traits::{Clock, HttpClient, ResourceStore, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default base URL of the remote timing API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.itqan.dev/api/v1/";

const DEFAULT_RESPONSE_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 500;
const DEFAULT_BUNDLED_CACHE_CAPACITY: usize = 8;
const DEFAULT_REMOTE_CACHE_CAPACITY: usize = 256;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_API_BASE_URL: &str = "RECITATION_API_BASE_URL";
pub const ENV_API_KEY: &str = "RECITATION_API_KEY";
pub const ENV_RESOURCE_DIR: &str = "RECITATION_RESOURCE_DIR";
pub const ENV_RESPONSE_TTL_SECS: &str = "RECITATION_RESPONSE_TTL_SECS";

/// Configuration for the timing services.
///
/// Use [`TimingConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct TimingConfig {
    /// Base URL of the remote timing API. Always ends with `/`.
    pub api_base_url: Url,

    /// Bearer token sent with remote API requests
    pub api_key: Option<String>,

    /// How long decoded API responses stay fresh in the client cache
    pub response_ttl: Duration,

    /// Page size for paginated remote calls
    pub page_size: u32,

    /// Parsed bundled reciter files kept in memory
    pub bundled_cache_capacity: usize,

    /// Per-chapter remote results kept in memory
    pub remote_cache_capacity: usize,

    pub request_timeout: Duration,

    /// Root of the bundled resources when the desktop store is used
    pub resource_dir: Option<PathBuf>,

    pub http_client: Arc<dyn HttpClient>,

    pub resource_store: Arc<dyn ResourceStore>,

    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TimingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingConfig")
            .field("api_base_url", &self.api_base_url.as_str())
            .field(
                "api_key",
                &self
                    .api_key
                    .as_deref()
                    .map(|key| redact_if_sensitive("api_key", key)),
            )
            .field("response_ttl", &self.response_ttl)
            .field("page_size", &self.page_size)
            .field("bundled_cache_capacity", &self.bundled_cache_capacity)
            .field("remote_cache_capacity", &self.remote_cache_capacity)
            .field("request_timeout", &self.request_timeout)
            .field("resource_dir", &self.resource_dir)
            .field("http_client", &"HttpClient { ... }")
            .field("resource_store", &"ResourceStore { ... }")
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

impl TimingConfig {
    pub fn builder() -> TimingConfigBuilder {
        TimingConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL is absolute http(s)
    /// - TTL and timeout are non-zero
    /// - Page size is within 1..=500
    /// - Cache capacities are non-zero
    pub fn validate(&self) -> Result<()> {
        validate_base_url(&self.api_base_url)?;

        if self.response_ttl.is_zero() {
            return Err(Error::invalid(
                "response_ttl",
                "must be greater than zero",
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::invalid(
                "request_timeout",
                "must be greater than zero",
            ));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::invalid(
                "page_size",
                format!("must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }

        if self.bundled_cache_capacity == 0 {
            return Err(Error::invalid(
                "bundled_cache_capacity",
                "must be greater than zero",
            ));
        }

        if self.remote_cache_capacity == 0 {
            return Err(Error::invalid(
                "remote_cache_capacity",
                "must be greater than zero",
            ));
        }

        if matches!(&self.api_key, Some(key) if key.trim().is_empty()) {
            return Err(Error::invalid("api_key", "cannot be blank when set"));
        }

        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    // Url::join drops the last segment unless the base ends with a slash
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    let url = Url::parse(&normalized)
        .map_err(|e| Error::invalid("api_base_url", format!("'{}': {}", raw, e)))?;
    validate_base_url(&url)?;
    Ok(url)
}

fn validate_base_url(url: &Url) -> Result<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid(
            "api_base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(Error::invalid("api_base_url", "must be an absolute URL"));
    }
    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for remote timing refresh. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject a platform-native HTTP client."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn resource_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "ResourceStore".to_string(),
        message: "ResourceStore implementation is required for bundled timing files. \
                 Desktop: enable the 'desktop-shims' feature and set resource_dir. \
                 Other hosts: inject a store over the packaged resources, or an \
                 InMemoryResourceStore built from embedded files."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(timeout)?);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_resource_store(resource_dir: Option<&PathBuf>) -> Result<Arc<dyn ResourceStore>> {
    use bridge_desktop::DirectoryResourceStore;

    let root = resource_dir.ok_or_else(|| {
        Error::Config(
            "Resource directory is required when no ResourceStore is injected. \
             Use .resource_dir() or set RECITATION_RESOURCE_DIR."
                .to_string(),
        )
    })?;
    let store: Arc<dyn ResourceStore> = Arc::new(DirectoryResourceStore::new(root.clone()));
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_resource_store(
    _resource_dir: Option<&PathBuf>,
) -> Result<Arc<dyn ResourceStore>> {
    Err(resource_store_missing_error())
}

/// Builder for constructing [`TimingConfig`] instances.
///
/// Set options incrementally, then call [`build()`](TimingConfigBuilder::build).
#[derive(Default)]
pub struct TimingConfigBuilder {
    api_base_url: Option<String>,
    api_key: Option<String>,
    response_ttl: Option<Duration>,
    page_size: Option<u32>,
    bundled_cache_capacity: Option<usize>,
    remote_cache_capacity: Option<usize>,
    request_timeout: Option<Duration>,
    resource_dir: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    resource_store: Option<Arc<dyn ResourceStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl TimingConfigBuilder {
    /// Sets the base URL of the remote timing API.
    ///
    /// Default: `https://api.itqan.dev/api/v1/`
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the bearer token sent with remote requests.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets how long decoded API responses are served from cache.
    ///
    /// Default: 30 minutes
    pub fn response_ttl(mut self, ttl: Duration) -> Self {
        self.response_ttl = Some(ttl);
        self
    }

    /// Sets the page size for paginated remote calls.
    ///
    /// Default: 100, allowed range 1..=500
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Sets how many parsed bundled reciter files stay in memory.
    ///
    /// Default: 8
    pub fn bundled_cache_capacity(mut self, capacity: usize) -> Self {
        self.bundled_cache_capacity = Some(capacity);
        self
    }

    /// Sets how many per-chapter remote results stay in memory.
    ///
    /// Default: 256
    pub fn remote_cache_capacity(mut self, capacity: usize) -> Self {
        self.remote_cache_capacity = Some(capacity);
        self
    }

    /// Sets the timeout applied to each outbound request.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the root directory of bundled resources.
    ///
    /// Only used when no `ResourceStore` is injected and the desktop default applies.
    pub fn resource_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.resource_dir = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the resource store implementation.
    pub fn resource_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.resource_store = Some(store);
        self
    }

    /// Sets the clock. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Layers overrides from the process environment on top of the builder.
    ///
    /// Reads `RECITATION_API_BASE_URL`, `RECITATION_API_KEY`,
    /// `RECITATION_RESOURCE_DIR` and `RECITATION_RESPONSE_TTL_SECS`.
    /// Unset or empty variables leave the builder untouched.
    pub fn from_env(self) -> Result<Self> {
        self.with_env_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable lookup.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_API_BASE_URL) {
            self.api_base_url = Some(url);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(dir) = get(ENV_RESOURCE_DIR) {
            self.resource_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = get(ENV_RESPONSE_TTL_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_RESPONSE_TTL_SECS, raw
                ))
            })?;
            self.response_ttl = Some(Duration::from_secs(secs));
        }

        Ok(self)
    }

    /// Builds the final `TimingConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(TimingConfig)` on success, or an error if:
    /// - A value is out of range or the base URL is malformed
    /// - A required bridge is missing and no platform default is available
    pub fn build(self) -> Result<TimingConfig> {
        let api_base_url =
            parse_base_url(self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL))?;
        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let resource_store = match self.resource_store {
            Some(store) => store,
            None => provide_default_resource_store(self.resource_dir.as_ref())?,
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let config = TimingConfig {
            api_base_url,
            api_key: self.api_key,
            response_ttl: self.response_ttl.unwrap_or(DEFAULT_RESPONSE_TTL),
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            bundled_cache_capacity: self
                .bundled_cache_capacity
                .unwrap_or(DEFAULT_BUNDLED_CACHE_CAPACITY),
            remote_cache_capacity: self
                .remote_cache_capacity
                .unwrap_or(DEFAULT_REMOTE_CACHE_CAPACITY),
            request_timeout,
            resource_dir: self.resource_dir,
            http_client,
            resource_store,
            clock,
        };

        config.validate()?;

        Ok(config)
    }
}
