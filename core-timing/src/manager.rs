//! # Timing Manager
//!
//! Picks the provider(s) for a reciter according to its [`TimingSource`]
//! and exposes one call for playback.
//!
//! | Source    | Behavior                                               |
//! |-----------|--------------------------------------------------------|
//! | `MP3Quran`| bundled provider, errors propagate                     |
//! | `Itqan`   | remote provider, errors propagate                      |
//! | `Both`    | bundled first; on any failure the remote result wins   |
//! | `None`    | `UnsupportedTimingSource`                              |

use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::ReciterCatalog;
use crate::error::{Result, TimingError};
use crate::models::{ChapterTimingData, ReciterTimings, TimingSource};
use crate::providers::TimingProvider;

pub struct TimingManager {
    catalog: Arc<ReciterCatalog>,
    bundled: Arc<dyn TimingProvider>,
    remote: Arc<dyn TimingProvider>,
}

impl TimingManager {
    pub fn new(
        catalog: Arc<ReciterCatalog>,
        bundled: Arc<dyn TimingProvider>,
        remote: Arc<dyn TimingProvider>,
    ) -> Self {
        Self {
            catalog,
            bundled,
            remote,
        }
    }

    pub fn catalog(&self) -> &Arc<ReciterCatalog> {
        &self.catalog
    }

    pub fn resolve_source(&self, reciter_id: u32) -> TimingSource {
        self.catalog.resolve_source(reciter_id)
    }

    /// Verse timings and audio URL for a chapter about to be played.
    pub async fn get_chapter_data_for_playback(
        &self,
        reciter_id: u32,
        chapter_id: u32,
    ) -> Result<ChapterTimingData> {
        let source = self.resolve_source(reciter_id);
        debug!(reciter_id, chapter_id, ?source, "Resolving chapter timings");

        match source {
            TimingSource::MP3Quran => {
                self.bundled
                    .fetch_chapter_data(reciter_id, chapter_id)
                    .await
            }
            TimingSource::Itqan { .. } => {
                self.remote
                    .fetch_chapter_data(reciter_id, chapter_id)
                    .await
            }
            TimingSource::Both { .. } => {
                match self.bundled.fetch_chapter_data(reciter_id, chapter_id).await {
                    Ok(data) => Ok(data),
                    Err(e) => {
                        warn!(
                            reciter_id,
                            chapter_id,
                            provider = self.bundled.name(),
                            missing = e.is_missing_data(),
                            error = %e,
                            "Bundled timings unavailable, falling back to {}",
                            self.remote.name()
                        );
                        self.remote
                            .fetch_chapter_data(reciter_id, chapter_id)
                            .await
                    }
                }
            }
            TimingSource::None => Err(TimingError::UnsupportedTimingSource { reciter_id }),
        }
    }

    /// Remote timings for reciters that have a remote source.
    ///
    /// Returns `Ok(None)` for bundled-only and unsupported reciters.
    pub async fn refresh_remote_timing_if_available(
        &self,
        reciter_id: u32,
        chapter_id: u32,
    ) -> Result<Option<ChapterTimingData>> {
        if !self.resolve_source(reciter_id).uses_remote() {
            return Ok(None);
        }

        self.remote
            .fetch_chapter_data(reciter_id, chapter_id)
            .await
            .map(Some)
    }

    /// Every bundled chapter of a reciter, used to seed the index.
    pub async fn load_bundled_reciter(&self, reciter_id: u32) -> Result<Arc<ReciterTimings>> {
        self.bundled.load_reciter(reciter_id).await
    }
}
