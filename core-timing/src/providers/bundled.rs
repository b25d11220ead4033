//! Bundled timing files
//!
//! One JSON file per reciter at `timings/reciter_{id}.json`:
//!
//! ```json
//! { "reciter": { "id": 5, "name": "..." },
//!   "chapters": [ { "chapter": 1,
//!                   "verses": [ { "verse": 1, "start_ms": 0, "end_ms": 6120 } ] } ] }
//! ```
//!
//! `start_time`/`end_time` are accepted in place of `start_ms`/`end_ms`.

use async_trait::async_trait;
use bridge_traits::resources::ResourceStore;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::TimingProvider;
use crate::cache::{CacheStatistics, LruCache};
use crate::error::{Result, TimingError};
use crate::models::{ChapterTimingData, ReciterTimings, VerseTiming};

/// Directory holding the per-reciter timing files.
pub const BUNDLED_TIMINGS_DIR: &str = "timings";

const DEFAULT_CACHE_CAPACITY: usize = 8;

#[derive(Debug, Deserialize)]
struct BundledFile {
    #[serde(default)]
    reciter: Option<BundledReciter>,
    chapters: Vec<BundledChapter>,
}

#[derive(Debug, Deserialize)]
struct BundledReciter {
    id: u32,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BundledChapter {
    chapter: u32,
    #[serde(default)]
    verses: Vec<BundledVerse>,
}

#[derive(Debug, Deserialize)]
struct BundledVerse {
    verse: u32,
    #[serde(alias = "start_time")]
    start_ms: u64,
    #[serde(alias = "end_time")]
    end_ms: u64,
}

/// Reads timings packaged with the application.
///
/// Parsed files are kept in an LRU keyed by reciter id so switching chapters
/// of the same reciter does not reread or reparse the file. Never returns an
/// audio URL; bundled audio is addressed through the reciter catalog.
pub struct BundledTimingProvider {
    resources: Arc<dyn ResourceStore>,
    cache: LruCache<u32, Arc<ReciterTimings>>,
}

impl BundledTimingProvider {
    pub fn new(resources: Arc<dyn ResourceStore>) -> Self {
        Self::with_capacity(resources, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(resources: Arc<dyn ResourceStore>, capacity: usize) -> Self {
        Self {
            resources,
            cache: LruCache::new(capacity),
        }
    }

    /// Canonical resource path of a reciter's timing file.
    pub fn resource_path(reciter_id: u32) -> String {
        format!("{}/reciter_{}.json", BUNDLED_TIMINGS_DIR, reciter_id)
    }

    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    async fn reciter(&self, reciter_id: u32) -> Result<Arc<ReciterTimings>> {
        if let Some(timings) = self.cache.get(&reciter_id) {
            return Ok(timings);
        }

        let path = Self::resource_path(reciter_id);
        let data = match self.resources.read(&path).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() => {
                debug!(reciter_id, path = %path, "No bundled timing file");
                return Err(TimingError::MissingData(format!(
                    "no bundled timing file for reciter {}",
                    reciter_id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let timings = Arc::new(parse_reciter_file(reciter_id, &data)?);
        info!(
            reciter_id,
            chapters = timings.chapters.len(),
            "Loaded bundled timing file"
        );
        self.cache.set(reciter_id, Arc::clone(&timings));
        Ok(timings)
    }
}

fn parse_reciter_file(reciter_id: u32, data: &[u8]) -> Result<ReciterTimings> {
    let file: BundledFile = serde_json::from_slice(data).map_err(|e| {
        TimingError::UnsupportedSchema(format!(
            "bundled timing file for reciter {}: {}",
            reciter_id, e
        ))
    })?;

    if let Some(declared) = file.reciter.as_ref().filter(|r| r.id != reciter_id) {
        warn!(
            reciter_id,
            declared_id = declared.id,
            "Bundled timing file declares a different reciter id"
        );
    }

    // Later duplicates of a chapter or verse replace earlier ones
    let mut chapters: HashMap<u32, BTreeMap<u32, VerseTiming>> = HashMap::new();
    for chapter in file.chapters {
        let verses = chapters.entry(chapter.chapter).or_default();
        for verse in chapter.verses {
            match VerseTiming::from_millis(chapter.chapter, verse.verse, verse.start_ms, verse.end_ms)
            {
                Some(timing) => {
                    verses.insert(verse.verse, timing);
                }
                None => debug!(
                    reciter_id,
                    chapter_id = chapter.chapter,
                    verse_id = verse.verse,
                    "Skipping verse with end before start"
                ),
            }
        }
    }

    Ok(ReciterTimings {
        reciter_id,
        name: file.reciter.and_then(|r| r.name),
        chapters: chapters
            .into_iter()
            .map(|(chapter, verses)| (chapter, verses.into_values().collect()))
            .collect(),
    })
}

#[async_trait]
impl TimingProvider for BundledTimingProvider {
    async fn fetch_chapter_data(
        &self,
        reciter_id: u32,
        chapter_id: u32,
    ) -> Result<ChapterTimingData> {
        let reciter = self.reciter(reciter_id).await?;
        match reciter.chapter(chapter_id) {
            Some(verses) if !verses.is_empty() => {
                Ok(ChapterTimingData::new(verses.to_vec(), None))
            }
            _ => Err(TimingError::missing_chapter(reciter_id, chapter_id)),
        }
    }

    async fn load_reciter(&self, reciter_id: u32) -> Result<Arc<ReciterTimings>> {
        self.reciter(reciter_id).await
    }

    fn name(&self) -> &'static str {
        "bundled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::InMemoryResourceStore;

    const RECITER_5: &str = r#"{
        "reciter": { "id": 5, "name": "Test Reciter" },
        "chapters": [
            { "chapter": 1, "verses": [
                { "verse": 2, "start_ms": 6120, "end_ms": 11000 },
                { "verse": 1, "start_ms": 0, "end_ms": 6120 }
            ] },
            { "chapter": 2, "verses": [] },
            { "chapter": 3, "verses": [
                { "verse": 1, "start_time": 500, "end_time": 1500 },
                { "verse": 2, "start_ms": 3000, "end_ms": 2000 }
            ] }
        ]
    }"#;

    fn provider() -> BundledTimingProvider {
        let store = InMemoryResourceStore::new().with_resource("timings/reciter_5.json", RECITER_5);
        BundledTimingProvider::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_fetch_chapter_converts_and_sorts() {
        let data = provider().fetch_chapter_data(5, 1).await.unwrap();

        assert_eq!(
            data.timings,
            vec![
                VerseTiming::new(1, 1, 0.0, 6.12),
                VerseTiming::new(1, 2, 6.12, 11.0),
            ]
        );
        assert_eq!(data.audio_url, None);
    }

    #[tokio::test]
    async fn test_aliases_and_inverted_ranges() {
        let data = provider().fetch_chapter_data(5, 3).await.unwrap();
        assert_eq!(data.timings, vec![VerseTiming::new(3, 1, 0.5, 1.5)]);
    }

    #[tokio::test]
    async fn test_missing_cases() {
        let provider = provider();

        // Empty chapter, absent chapter, absent reciter file
        for (reciter, chapter) in [(5, 2), (5, 114), (6, 1)] {
            let err = provider.fetch_chapter_data(reciter, chapter).await.unwrap_err();
            assert!(err.is_missing_data(), "{reciter}:{chapter} gave {err:?}");
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_is_unsupported_schema() {
        let store = InMemoryResourceStore::new().with_resource("timings/reciter_9.json", "[1,2");
        let provider = BundledTimingProvider::new(Arc::new(store));

        assert!(matches!(
            provider.fetch_chapter_data(9, 1).await,
            Err(TimingError::UnsupportedSchema(_))
        ));
    }

    #[tokio::test]
    async fn test_parsed_file_is_cached() {
        let provider = provider();
        provider.fetch_chapter_data(5, 1).await.unwrap();
        provider.fetch_chapter_data(5, 3).await.unwrap();

        let stats = provider.cache_statistics();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.current_size, 1);
    }

    #[tokio::test]
    async fn test_load_reciter_returns_all_chapters() {
        let reciter = provider().load_reciter(5).await.unwrap();

        assert_eq!(reciter.reciter_id, 5);
        assert_eq!(reciter.name.as_deref(), Some("Test Reciter"));
        assert_eq!(reciter.chapters.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(reciter.chapter(2).unwrap().is_empty());
    }

    #[test]
    fn test_resource_path() {
        assert_eq!(
            BundledTimingProvider::resource_path(12),
            "timings/reciter_12.json"
        );
    }
}
