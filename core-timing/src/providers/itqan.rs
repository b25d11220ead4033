//! Itqan remote timing provider
//!
//! Timings come from the paginated tracks endpoint of an Itqan asset:
//!
//! ```text
//! GET {base}/assets/{asset_id}/tracks/?page={n}&page_size={m}
//! { "count": 114, "next": "...|null",
//!   "results": [ { "surah_number": 1, "audio_url": "...",
//!                  "ayahs_timings": [ { "ayah_key": "1:1", "start_ms": 0, "end_ms": 6120 } ] } ] }
//! ```
//!
//! Pages are walked in order until the requested chapter shows up. Every
//! track seen along the way is memoized, so the next chapter of the same
//! asset is usually answered without touching the network.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use super::TimingProvider;
use crate::api_client::ApiClient;
use crate::cache::{CacheStatistics, LruCache};
use crate::catalog::ReciterCatalog;
use crate::error::{Result, TimingError};
use crate::models::{ChapterTimingData, VerseTiming};

const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_PAGE_SIZE: u32 = 100;
// Upper bound on pages walked for one lookup, in case `next` never ends
const MAX_PAGES: u32 = 64;

#[derive(Debug, Deserialize)]
struct TracksPage {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    next: Option<String>,
    results: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Track {
    surah_number: u32,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    ayahs_timings: Vec<AyahTiming>,
}

#[derive(Debug, Deserialize)]
struct AyahTiming {
    ayah_key: String,
    start_ms: u64,
    end_ms: u64,
}

/// Parses a `"chapter:verse"` key.
fn parse_ayah_key(key: &str) -> Option<(u32, u32)> {
    let (chapter, verse) = key.split_once(':')?;
    Some((chapter.trim().parse().ok()?, verse.trim().parse().ok()?))
}

/// Fetches verse timings from the Itqan API.
///
/// Results are memoized per `"{asset_id}-{chapter_id}"`, including misses,
/// which are stored as an empty result.
pub struct ItqanTimingProvider {
    api: Arc<ApiClient>,
    catalog: Arc<ReciterCatalog>,
    cache: LruCache<String, ChapterTimingData>,
    page_size: u32,
}

impl ItqanTimingProvider {
    pub fn new(api: Arc<ApiClient>, catalog: Arc<ReciterCatalog>) -> Self {
        Self {
            api,
            catalog,
            cache: LruCache::new(DEFAULT_CACHE_CAPACITY),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = LruCache::new(capacity);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    fn cache_key(asset_id: u32, chapter_id: u32) -> String {
        format!("{}-{}", asset_id, chapter_id)
    }

    fn convert_track(asset_id: u32, track: Track) -> ChapterTimingData {
        let chapter_id = track.surah_number;
        let mut verses = BTreeMap::new();

        for ayah in track.ayahs_timings {
            let verse_id = match parse_ayah_key(&ayah.ayah_key) {
                Some((chapter, verse)) if chapter == chapter_id => verse,
                _ => {
                    debug!(
                        asset_id,
                        chapter_id,
                        ayah_key = %ayah.ayah_key,
                        "Skipping malformed ayah key"
                    );
                    continue;
                }
            };

            match VerseTiming::from_millis(chapter_id, verse_id, ayah.start_ms, ayah.end_ms) {
                Some(timing) => {
                    verses.insert(verse_id, timing);
                }
                None => debug!(asset_id, chapter_id, verse_id, "Skipping inverted ayah timing"),
            }
        }

        let audio_url = track
            .audio_url
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| match Url::parse(&raw) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(asset_id, chapter_id, audio_url = %raw, error = %e, "Ignoring invalid track audio URL");
                    None
                }
            });

        ChapterTimingData::new(verses.into_values().collect(), audio_url)
    }

    async fn walk_tracks(&self, asset_id: u32, chapter_id: u32) -> Result<ChapterTimingData> {
        let path = format!("assets/{}/tracks/", asset_id);

        for page in 1..=MAX_PAGES {
            let response: TracksPage = self
                .api
                .request(
                    &path,
                    &[
                        ("page", page.to_string()),
                        ("page_size", self.page_size.to_string()),
                    ],
                )
                .await?;

            debug!(
                asset_id,
                page,
                tracks = response.results.len(),
                total = ?response.count,
                "Fetched Itqan tracks page"
            );

            let mut found = None;
            for track in response.results {
                let surah = track.surah_number;
                let data = Self::convert_track(asset_id, track);
                if surah == chapter_id {
                    found = Some(data.clone());
                }
                self.cache.set(Self::cache_key(asset_id, surah), data);
            }

            if let Some(data) = found {
                return Ok(data);
            }

            if response.next.is_none() {
                break;
            }
        }

        Ok(ChapterTimingData::default())
    }
}

#[async_trait]
impl TimingProvider for ItqanTimingProvider {
    async fn fetch_chapter_data(
        &self,
        reciter_id: u32,
        chapter_id: u32,
    ) -> Result<ChapterTimingData> {
        let asset_id = self
            .catalog
            .itqan_asset_id(reciter_id)
            .ok_or(TimingError::UnsupportedTimingSource { reciter_id })?;

        let key = Self::cache_key(asset_id, chapter_id);
        let data = match self.cache.get(&key) {
            Some(data) => data,
            None => {
                let data = self.walk_tracks(asset_id, chapter_id).await?;
                if data.is_empty() {
                    // Remember the miss
                    self.cache.set(key, data.clone());
                } else {
                    info!(
                        reciter_id,
                        asset_id,
                        chapter_id,
                        verses = data.timings.len(),
                        "Fetched remote chapter timings"
                    );
                }
                data
            }
        };

        if data.is_empty() {
            return Err(TimingError::MissingData(format!(
                "asset {} has no timings for chapter {}",
                asset_id, chapter_id
            )));
        }

        Ok(data)
    }

    fn name(&self) -> &'static str {
        "itqan"
    }
}
