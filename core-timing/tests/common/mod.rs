//! Shared fixtures for the timing integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::{Clock, HttpClient, HttpRequest, HttpResponse, InMemoryResourceStore};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use core_runtime::config::TimingConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://api.example.com/v1/";

/// Answers requests from a fixed URL -> (status, body) table.
///
/// Unknown URLs get a 404 and every request URL is recorded.
#[derive(Default)]
pub struct RoutedHttp {
    routes: Mutex<HashMap<String, (u16, String)>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
}

impl RoutedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn route(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.into(), (status, body.into()));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpClient for RoutedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let route = self.routes.lock().unwrap().get(&request.url).cloned();
        match route {
            Some((status, body)) => Ok(HttpResponse::new(status, body)),
            None => Ok(HttpResponse::new(404, "{\"detail\":\"Not found.\"}")),
        }
    }
}

/// HTTP client whose transport always fails.
#[derive(Default)]
pub struct OfflineHttp {
    pub calls: AtomicUsize,
}

#[async_trait]
impl HttpClient for OfflineHttp {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BridgeError::OperationFailed("connection refused".to_string()))
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += ChronoDuration::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn tracks_url(asset_id: u32, page: u32) -> String {
    format!(
        "{}assets/{}/tracks/?page={}&page_size=100",
        BASE_URL, asset_id, page
    )
}

/// Bundled file for reciter 5 with chapters 1 and 2 only.
pub const RECITER_5_BUNDLED: &str = r#"{
    "reciter": { "id": 5, "name": "Bundled Reciter" },
    "chapters": [
        { "chapter": 1, "verses": [
            { "verse": 1, "start_ms": 0, "end_ms": 6120 },
            { "verse": 2, "start_ms": 6120, "end_ms": 11000 },
            { "verse": 3, "start_ms": 11000, "end_ms": 15500 }
        ] },
        { "chapter": 2, "verses": [
            { "verse": 1, "start_ms": 1000, "end_ms": 4000 }
        ] }
    ]
}"#;

/// Last page of asset 11: chapter 114 only.
pub const ASSET_11_PAGE_1: &str = r#"{
    "count": 1,
    "next": null,
    "results": [
        {
            "surah_number": 114,
            "audio_url": "https://cdn.example.com/11/114.mp3",
            "ayahs_timings": [
                { "ayah_key": "114:1", "start_ms": 0, "end_ms": 4000 },
                { "ayah_key": "114:2", "start_ms": 4000, "end_ms": 7500 }
            ]
        }
    ]
}"#;

/// Reciters used across the tests:
/// 5 bundled + remote fallback, 7 remote only, 8 bundled only, 9 unsupported.
pub const CATALOG_JSON: &str = r#"[
    { "id": 5, "name": "Hybrid", "timing_source": { "type": "both", "itqan_asset_id": 11 } },
    { "id": 7, "name": "Remote", "timing_source": { "type": "itqan", "asset_id": 11 } },
    { "id": 8, "name": "Bundled", "timing_source": { "type": "mp3quran" },
      "audio_base_url": "https://server.example.com/reciter8" },
    { "id": 9, "name": "Unsupported", "timing_source": { "type": "none" } }
]"#;

pub fn resources() -> InMemoryResourceStore {
    InMemoryResourceStore::new()
        .with_resource("timings/reciter_5.json", RECITER_5_BUNDLED)
        .with_resource("timings/reciter_8.json", RECITER_5_BUNDLED.replace("\"id\": 5", "\"id\": 8"))
}

pub fn config(http: Arc<dyn HttpClient>) -> TimingConfig {
    TimingConfig::builder()
        .api_base_url(BASE_URL)
        .http_client(http)
        .resource_store(Arc::new(resources()))
        .build()
        .unwrap()
}
