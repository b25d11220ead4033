//! Current-verse lookup over a chapter's verse ranges.

use std::collections::BTreeMap;

use crate::models::VerseRange;

/// Recorded verse starts run about this many milliseconds late.
pub const START_CORRECTION_MS: u64 = 10;

/// Verse playing at `time_ms`.
///
/// Each start is pulled `START_CORRECTION_MS` earlier (floored at zero) and
/// ranges are inclusive on both ends. Among containing ranges the latest
/// start wins, so on a shared boundary the later verse wins. Past the last end
/// the verse with the greatest end is returned; before the first start or
/// inside a gap the result is `None`.
pub fn current_verse(verses: &BTreeMap<u32, VerseRange>, time_ms: u64) -> Option<u32> {
    // Single pass; this runs on every playback tick
    let mut playing: Option<(u64, u32)> = None;
    let mut last: Option<(u64, u32)> = None;

    for (&verse, range) in verses {
        let start = range.start_ms.saturating_sub(START_CORRECTION_MS);
        if start <= time_ms && time_ms <= range.end_ms && playing <= Some((start, verse)) {
            playing = Some((start, verse));
        }
        if last <= Some((range.end_ms, verse)) {
            last = Some((range.end_ms, verse));
        }
    }

    if let Some((_, verse)) = playing {
        return Some(verse);
    }

    let (last_end, last_verse) = last?;
    (time_ms > last_end).then_some(last_verse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(ranges: &[(u32, u64, u64)]) -> BTreeMap<u32, VerseRange> {
        ranges
            .iter()
            .map(|&(verse, start, end)| (verse, VerseRange::new(start, end)))
            .collect()
    }

    #[test]
    fn test_empty_chapter() {
        assert_eq!(current_verse(&BTreeMap::new(), 0), None);
    }

    #[test]
    fn test_time_inside_verse() {
        let verses = chapter(&[(1, 0, 4000), (2, 4000, 7500), (3, 7500, 9000)]);
        assert_eq!(current_verse(&verses, 2000), Some(1));
        assert_eq!(current_verse(&verses, 5000), Some(2));
        assert_eq!(current_verse(&verses, 9000), Some(3));
    }

    #[test]
    fn test_shared_boundary_goes_to_later_verse() {
        let verses = chapter(&[(1, 0, 4000), (2, 4000, 7500)]);
        assert_eq!(current_verse(&verses, 4000), Some(2));
    }

    #[test]
    fn test_start_correction_applies() {
        let verses = chapter(&[(1, 100, 4000), (2, 4010, 7500)]);

        // Inside verse 2 only thanks to the 10ms correction
        assert_eq!(current_verse(&verses, 4000), Some(2));
        assert_eq!(current_verse(&verses, 90), Some(1));
        assert_eq!(current_verse(&verses, 89), None);
    }

    #[test]
    fn test_correction_floors_at_zero() {
        let verses = chapter(&[(1, 5, 1000)]);
        assert_eq!(current_verse(&verses, 0), Some(1));
    }

    #[test]
    fn test_past_end_returns_verse_with_max_end() {
        let verses = chapter(&[(1, 0, 4000), (2, 4000, 7500)]);
        assert_eq!(current_verse(&verses, 7501), Some(2));
        assert_eq!(current_verse(&verses, u64::MAX), Some(2));
    }

    #[test]
    fn test_past_end_tie_prefers_higher_verse() {
        let verses = chapter(&[(1, 0, 5000), (2, 3000, 5000)]);
        assert_eq!(current_verse(&verses, 6000), Some(2));
    }

    #[test]
    fn test_before_first_verse() {
        let verses = chapter(&[(1, 1000, 4000), (2, 4000, 7500)]);
        assert_eq!(current_verse(&verses, 500), None);
    }

    #[test]
    fn test_gap_between_verses() {
        let verses = chapter(&[(1, 0, 3000), (2, 5000, 7500)]);
        assert_eq!(current_verse(&verses, 4000), None);
    }

    #[test]
    fn test_latest_start_wins_regardless_of_verse_order() {
        // Verse 3 starts before verse 2 and both contain 2500
        let verses = chapter(&[(1, 0, 1000), (2, 2000, 4000), (3, 1500, 3000)]);
        assert_eq!(current_verse(&verses, 2500), Some(2));
        assert_eq!(current_verse(&verses, 1800), Some(3));
    }

    #[test]
    fn test_overlap_prefers_latest_start() {
        let verses = chapter(&[(1, 0, 5000), (2, 3000, 8000)]);
        assert_eq!(current_verse(&verses, 4000), Some(2));
    }
}
