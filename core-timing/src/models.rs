//! Timing data model shared by providers, the manager and the index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Converts a second offset to whole milliseconds, rounding to nearest.
pub fn seconds_to_millis(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

/// Converts a millisecond offset to seconds.
pub fn millis_to_seconds(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

/// Start and end offsets of a single verse within its chapter audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerseTiming {
    pub chapter_id: u32,
    pub verse_id: u32,
    /// Offset in seconds
    pub start_time: f64,
    /// Offset in seconds, never before `start_time`
    pub end_time: f64,
}

impl VerseTiming {
    pub fn new(chapter_id: u32, verse_id: u32, start_time: f64, end_time: f64) -> Self {
        Self {
            chapter_id,
            verse_id,
            start_time,
            end_time,
        }
    }

    /// Builds a timing from millisecond offsets as stored by both data sources.
    ///
    /// Returns `None` when the range is inverted.
    pub fn from_millis(chapter_id: u32, verse_id: u32, start_ms: u64, end_ms: u64) -> Option<Self> {
        (start_ms <= end_ms).then(|| {
            Self::new(
                chapter_id,
                verse_id,
                millis_to_seconds(start_ms),
                millis_to_seconds(end_ms),
            )
        })
    }

    pub fn range(&self) -> VerseRange {
        VerseRange::new(
            seconds_to_millis(self.start_time),
            seconds_to_millis(self.end_time),
        )
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Everything playback needs for one chapter.
///
/// Providers never hand out an empty `timings` list; an empty result is
/// reported as [`TimingError::MissingData`](crate::TimingError::MissingData).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChapterTimingData {
    pub timings: Vec<VerseTiming>,
    pub audio_url: Option<Url>,
}

impl ChapterTimingData {
    pub fn new(timings: Vec<VerseTiming>, audio_url: Option<Url>) -> Self {
        Self { timings, audio_url }
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    pub fn verse(&self, verse_id: u32) -> Option<&VerseTiming> {
        self.timings.iter().find(|t| t.verse_id == verse_id)
    }

    /// Verse id to millisecond range, the shape the index stores.
    pub fn to_verse_ranges(&self) -> BTreeMap<u32, VerseRange> {
        self.timings
            .iter()
            .map(|t| (t.verse_id, t.range()))
            .collect()
    }
}

/// Which provider(s) serve timings for a reciter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimingSource {
    /// Bundled dataset only
    #[serde(rename = "mp3quran")]
    MP3Quran,
    /// Remote API only
    Itqan { asset_id: u32 },
    /// Bundled first, remote as fallback
    Both { itqan_asset_id: u32 },
    /// No timing support
    None,
}

impl TimingSource {
    pub fn itqan_asset_id(&self) -> Option<u32> {
        match self {
            Self::Itqan { asset_id } => Some(*asset_id),
            Self::Both { itqan_asset_id } => Some(*itqan_asset_id),
            Self::MP3Quran | Self::None => None,
        }
    }

    pub fn uses_bundled(&self) -> bool {
        matches!(self, Self::MP3Quran | Self::Both { .. })
    }

    pub fn uses_remote(&self) -> bool {
        self.itqan_asset_id().is_some()
    }
}

/// Millisecond range of a verse as held by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseRange {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl VerseRange {
    pub fn new(start_ms: u64, end_ms: u64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn contains(&self, time_ms: u64) -> bool {
        self.start_ms <= time_ms && time_ms <= self.end_ms
    }
}

/// All bundled chapters of one reciter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReciterTimings {
    pub reciter_id: u32,
    pub name: Option<String>,
    pub chapters: BTreeMap<u32, Vec<VerseTiming>>,
}

impl ReciterTimings {
    pub fn chapter(&self, chapter_id: u32) -> Option<&[VerseTiming]> {
        self.chapters.get(&chapter_id).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_conversion_rounds() {
        assert_eq!(seconds_to_millis(4.0), 4000);
        assert_eq!(seconds_to_millis(7.5), 7500);
        assert_eq!(seconds_to_millis(1.2345), 1235);
        assert_eq!(seconds_to_millis(-1.0), 0);
        assert_eq!(seconds_to_millis(f64::NAN), 0);
    }

    #[test]
    fn test_from_millis_rejects_inverted_range() {
        let timing = VerseTiming::from_millis(114, 1, 0, 4000).unwrap();
        assert_eq!(timing, VerseTiming::new(114, 1, 0.0, 4.0));
        assert_eq!(timing.range(), VerseRange::new(0, 4000));
        assert_eq!(timing.duration(), 4.0);

        assert!(VerseTiming::from_millis(114, 2, 5000, 4000).is_none());
    }

    #[test]
    fn test_timing_source_accessors() {
        assert_eq!(TimingSource::Itqan { asset_id: 3 }.itqan_asset_id(), Some(3));
        assert_eq!(
            TimingSource::Both { itqan_asset_id: 11 }.itqan_asset_id(),
            Some(11)
        );
        assert!(TimingSource::Both { itqan_asset_id: 11 }.uses_bundled());
        assert!(TimingSource::MP3Quran.uses_bundled());
        assert!(!TimingSource::MP3Quran.uses_remote());
        assert!(!TimingSource::None.uses_bundled());
    }

    #[test]
    fn test_timing_source_serde_shape() {
        let source: TimingSource =
            serde_json::from_str(r#"{"type":"both","itqan_asset_id":11}"#).unwrap();
        assert_eq!(source, TimingSource::Both { itqan_asset_id: 11 });

        let source: TimingSource = serde_json::from_str(r#"{"type":"mp3quran"}"#).unwrap();
        assert_eq!(source, TimingSource::MP3Quran);

        assert_eq!(
            serde_json::to_string(&TimingSource::Itqan { asset_id: 2 }).unwrap(),
            r#"{"type":"itqan","asset_id":2}"#
        );
    }

    #[test]
    fn test_chapter_data_verse_ranges() {
        let data = ChapterTimingData::new(
            vec![
                VerseTiming::new(1, 2, 6.12, 11.0),
                VerseTiming::new(1, 1, 0.0, 6.12),
            ],
            None,
        );

        let ranges = data.to_verse_ranges();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[&1], VerseRange::new(0, 6120));
        assert_eq!(ranges[&2], VerseRange::new(6120, 11000));
        assert_eq!(data.verse(2).map(|t| t.end_time), Some(11.0));
    }
}
