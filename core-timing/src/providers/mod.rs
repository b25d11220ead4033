//! Timing Providers
//!
//! A provider turns `(reciter, chapter)` into verse timings. Two sources
//! exist: timing files bundled with the application and the remote Itqan
//! API. The [`TimingManager`](crate::TimingManager) decides which one to ask.

mod bundled;
mod itqan;

pub use bundled::{BundledTimingProvider, BUNDLED_TIMINGS_DIR};
pub use itqan::ItqanTimingProvider;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Result, TimingError};
use crate::models::{ChapterTimingData, ReciterTimings};

/// Source of verse timings for a reciter's chapter.
///
/// # Errors
///
/// Implementations report:
/// - [`TimingError::MissingData`] when the reciter or chapter has no timings
///   (an empty verse list counts as missing)
/// - [`TimingError::UnsupportedTimingSource`] when the reciter is not served
///   by this provider
/// - [`TimingError::InvalidUrl`], [`TimingError::InvalidResponse`] or
///   [`TimingError::UnsupportedSchema`] for transport and decode failures
#[async_trait]
pub trait TimingProvider: Send + Sync {
    /// Timings of one chapter, ordered by verse.
    async fn fetch_chapter_data(&self, reciter_id: u32, chapter_id: u32)
        -> Result<ChapterTimingData>;

    /// Every chapter this provider holds for a reciter.
    ///
    /// Only sources that can enumerate a reciter cheaply implement this.
    async fn load_reciter(&self, reciter_id: u32) -> Result<Arc<ReciterTimings>> {
        Err(TimingError::UnsupportedTimingSource { reciter_id })
    }

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
