//! # Timing Index & Position Lookup
//!
//! Long-lived in-memory index of `reciter -> chapter -> verse -> range`
//! consumed directly by playback.
//!
//! ## Population
//!
//! - Bundled data is loaded lazily, once per reciter, on the first query
//!   that touches the reciter. A missing or corrupt file is not retried.
//! - Remote refreshes merge one chapter at a time and never disturb the
//!   other chapters of the reciter.
//!
//! ## Locking
//!
//! One async mutex guards the index. It is never held while reading a
//! bundled file or talking to the network: slow work runs in its own task
//! and only takes the lock to merge a finished result, so a first-time load
//! of one reciter does not stall position queries for another.
//!
//! ## Deduplication
//!
//! Bundled loads are keyed by reciter and remote refreshes by
//! `"{reciter}-{chapter}"`. At most one of each is in flight; later callers
//! await the same shared future. The work is applied to the index exactly
//! once and then deregistered on every exit path, panics included, so a
//! caller giving up early neither cancels the work nor loses its result.
//!
//! ## Failure handling
//!
//! Lookups never fail; they return `None` when nothing is indexed. A failed
//! refresh is logged and treated as "no update".

mod lookup;

pub use lookup::{current_verse, START_CORRECTION_MS};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::manager::TimingManager;
use crate::models::{TimingSource, VerseRange};

/// Verse id to range for one chapter.
pub type ChapterRanges = BTreeMap<u32, VerseRange>;

#[derive(Debug, Clone, Default)]
struct RemoteChapter {
    verses: ChapterRanges,
    audio_url: Option<Url>,
}

type RefreshFuture = Shared<BoxFuture<'static, RemoteChapter>>;
type LoadFuture = Shared<BoxFuture<'static, ()>>;

struct PendingRefresh {
    id: u64,
    future: RefreshFuture,
}

fn chapter_key(reciter_id: u32, chapter_id: u32) -> String {
    format!("{}-{}", reciter_id, chapter_id)
}

/// Counters describing what the index currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Reciters with at least one indexed chapter
    pub reciters_loaded: usize,
    pub chapters_indexed: usize,
    pub remote_chapters_cached: usize,
    pub refreshes_in_flight: usize,
    pub bundled_loads_in_flight: usize,
}

#[derive(Default)]
struct IndexState {
    index: HashMap<u32, HashMap<u32, ChapterRanges>>,
    /// Reciters whose bundled file has been tried
    attempted: HashSet<u32>,
    bundled_loads: HashMap<u32, LoadFuture>,
    remote_cache: HashMap<String, RemoteChapter>,
    remote_audio_urls: HashMap<String, Url>,
    in_flight: HashMap<String, PendingRefresh>,
    next_refresh_id: u64,
}

impl IndexState {
    fn chapter(&self, reciter_id: u32, chapter_id: u32) -> Option<&ChapterRanges> {
        self.index
            .get(&reciter_id)
            .and_then(|chapters| chapters.get(&chapter_id))
            .filter(|verses| !verses.is_empty())
    }

    /// Adds bundled chapters, leaving chapters already indexed untouched.
    fn merge_bundled(&mut self, reciter_id: u32, chapters: Vec<(u32, ChapterRanges)>) -> usize {
        if chapters.is_empty() {
            return 0;
        }

        let indexed = self.index.entry(reciter_id).or_default();
        let mut added = 0;
        for (chapter_id, verses) in chapters {
            if verses.is_empty() || indexed.contains_key(&chapter_id) {
                continue;
            }
            indexed.insert(chapter_id, verses);
            added += 1;
        }
        added
    }

    /// Merges a non-empty remote chapter.
    ///
    /// Under `Both` an already indexed bundled chapter stays authoritative;
    /// the remote map is only used when the bundled data lacks the chapter.
    fn apply_remote(
        &mut self,
        reciter_id: u32,
        chapter_id: u32,
        source: TimingSource,
        remote: &RemoteChapter,
    ) {
        if remote.verses.is_empty() {
            return;
        }

        let key = chapter_key(reciter_id, chapter_id);
        if let Some(url) = &remote.audio_url {
            self.remote_audio_urls.insert(key, url.clone());
        }

        let keep_bundled =
            source.uses_bundled() && self.chapter(reciter_id, chapter_id).is_some();
        if keep_bundled {
            debug!(
                reciter_id,
                chapter_id, "Bundled chapter kept, remote refresh only cached"
            );
            return;
        }

        self.index
            .entry(reciter_id)
            .or_default()
            .insert(chapter_id, remote.verses.clone());
    }

    /// Deregisters a refresh unless a newer one already replaced it.
    fn finish_refresh(&mut self, key: &str, id: u64) {
        if self.in_flight.get(key).is_some_and(|pending| pending.id == id) {
            self.in_flight.remove(key);
        }
    }
}

struct Inner {
    manager: Arc<TimingManager>,
    state: Mutex<IndexState>,
}

impl Inner {
    /// Reads and converts a reciter's bundled chapters without touching the index.
    async fn read_bundled(&self, reciter_id: u32) -> Vec<(u32, ChapterRanges)> {
        match self.manager.load_bundled_reciter(reciter_id).await {
            Ok(timings) => timings
                .chapters
                .iter()
                .map(|(&chapter_id, verses)| {
                    (
                        chapter_id,
                        verses.iter().map(|t| (t.verse_id, t.range())).collect(),
                    )
                })
                .collect(),
            Err(e) if e.is_missing_data() => {
                debug!(reciter_id, "No bundled timings to index");
                Vec::new()
            }
            Err(e) => {
                warn!(reciter_id, error = %e, "Failed to load bundled timings");
                Vec::new()
            }
        }
    }

    async fn fetch_remote(&self, reciter_id: u32, chapter_id: u32) -> RemoteChapter {
        match self
            .manager
            .refresh_remote_timing_if_available(reciter_id, chapter_id)
            .await
        {
            Ok(Some(data)) if !data.is_empty() => RemoteChapter {
                verses: data.to_verse_ranges(),
                audio_url: data.audio_url,
            },
            Ok(_) => {
                debug!(reciter_id, chapter_id, "Remote refresh returned no timings");
                RemoteChapter::default()
            }
            Err(e) => {
                warn!(reciter_id, chapter_id, error = %e, "Remote timing refresh failed");
                RemoteChapter::default()
            }
        }
    }
}

/// Waits until the reciter's bundled file has been tried, starting the load
/// if nobody has yet.
async fn ensure_bundled_loaded(inner: &Arc<Inner>, reciter_id: u32) {
    let pending = {
        let mut state = inner.state.lock().await;
        let running = state.bundled_loads.get(&reciter_id).cloned();
        match running {
            Some(load) => load,
            None if !state.attempted.insert(reciter_id) => return,
            None => {
                let load = spawn_bundled_load(Arc::clone(inner), reciter_id);
                state.bundled_loads.insert(reciter_id, load.clone());
                load
            }
        }
    };

    pending.await;
}

// The read runs in a task of its own so a panic there still reaches the
// merge step below and the entry is always deregistered.
fn spawn_bundled_load(inner: Arc<Inner>, reciter_id: u32) -> LoadFuture {
    let read = {
        let inner = Arc::clone(&inner);
        tokio::spawn(async move { inner.read_bundled(reciter_id).await })
    };
    let cleanup = Arc::downgrade(&inner);

    let task = tokio::spawn(async move {
        let chapters = read.await.unwrap_or_else(|e| {
            warn!(reciter_id, error = %e, "Bundled timing load aborted");
            Vec::new()
        });

        let mut state = inner.state.lock().await;
        let added = state.merge_bundled(reciter_id, chapters);
        state.bundled_loads.remove(&reciter_id);
        if added > 0 {
            info!(reciter_id, chapters = added, "Indexed bundled timings");
        }
    });

    async move {
        if let Err(e) = task.await {
            warn!(reciter_id, error = %e, "Bundled timing merge aborted");
            if let Some(inner) = cleanup.upgrade() {
                inner.state.lock().await.bundled_loads.remove(&reciter_id);
            }
        }
    }
    .boxed()
    .shared()
}

fn spawn_refresh(
    inner: Arc<Inner>,
    reciter_id: u32,
    chapter_id: u32,
    source: TimingSource,
    id: u64,
) -> RefreshFuture {
    let key = chapter_key(reciter_id, chapter_id);
    let fetch = {
        let inner = Arc::clone(&inner);
        tokio::spawn(async move { inner.fetch_remote(reciter_id, chapter_id).await })
    };
    let cleanup: Weak<Inner> = Arc::downgrade(&inner);
    let cleanup_key = key.clone();

    let task = tokio::spawn(async move {
        let remote = fetch.await.unwrap_or_else(|e| {
            warn!(reciter_id, chapter_id, error = %e, "Remote refresh task aborted");
            RemoteChapter::default()
        });

        let mut state = inner.state.lock().await;
        if !remote.verses.is_empty() {
            state.remote_cache.insert(key.clone(), remote.clone());
            state.apply_remote(reciter_id, chapter_id, source, &remote);
            info!(
                reciter_id,
                chapter_id,
                verses = remote.verses.len(),
                "Applied remote chapter timings"
            );
        }
        state.finish_refresh(&key, id);
        remote
    });

    async move {
        match task.await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(reciter_id, chapter_id, error = %e, "Remote refresh merge aborted");
                if let Some(inner) = cleanup.upgrade() {
                    inner.state.lock().await.finish_refresh(&cleanup_key, id);
                }
                RemoteChapter::default()
            }
        }
    }
    .boxed()
    .shared()
}

/// Shared handle to the timing index. Cloning is cheap.
#[derive(Clone)]
pub struct TimingIndexService {
    inner: Arc<Inner>,
}

impl TimingIndexService {
    pub fn new(manager: Arc<TimingManager>) -> Self {
        Self {
            inner: Arc::new(Inner {
                manager,
                state: Mutex::new(IndexState::default()),
            }),
        }
    }

    pub fn manager(&self) -> &Arc<TimingManager> {
        &self.inner.manager
    }

    /// Range of one verse, loading the reciter's bundled data on first use.
    pub async fn get_timing(
        &self,
        reciter_id: u32,
        chapter_id: u32,
        verse_id: u32,
    ) -> Option<VerseRange> {
        ensure_bundled_loaded(&self.inner, reciter_id).await;
        let state = self.inner.state.lock().await;
        state
            .chapter(reciter_id, chapter_id)
            .and_then(|verses| verses.get(&verse_id))
            .copied()
    }

    /// All verses of a chapter ordered by verse id.
    pub async fn get_chapter_timings(
        &self,
        reciter_id: u32,
        chapter_id: u32,
    ) -> Option<Vec<(u32, VerseRange)>> {
        ensure_bundled_loaded(&self.inner, reciter_id).await;
        let state = self.inner.state.lock().await;
        state
            .chapter(reciter_id, chapter_id)
            .map(|verses| verses.iter().map(|(&v, &r)| (v, r)).collect())
    }

    /// Verse playing at `current_time_ms`; see [`current_verse`] for the rules.
    pub async fn get_current_verse(
        &self,
        reciter_id: u32,
        chapter_id: u32,
        current_time_ms: u64,
    ) -> Option<u32> {
        ensure_bundled_loaded(&self.inner, reciter_id).await;
        let state = self.inner.state.lock().await;
        state
            .chapter(reciter_id, chapter_id)
            .and_then(|verses| current_verse(verses, current_time_ms))
    }

    /// Audio URL discovered by a successful remote refresh.
    pub async fn get_remote_audio_url(&self, reciter_id: u32, chapter_id: u32) -> Option<Url> {
        let state = self.inner.state.lock().await;
        state
            .remote_audio_urls
            .get(&chapter_key(reciter_id, chapter_id))
            .cloned()
    }

    /// Pulls remote timings for a chapter when the reciter has a remote source.
    ///
    /// - `MP3Quran` / `None`: loads bundled data, returns `None`
    /// - `Itqan`: refreshes and returns the track's audio URL, if any
    /// - `Both`: refreshes (caching the result and the audio URL) but returns
    ///   `None`; bundled timings remain authoritative for lookups
    pub async fn refresh_chapter_timings(&self, reciter_id: u32, chapter_id: u32) -> Option<Url> {
        let source = self.inner.manager.resolve_source(reciter_id);

        if !source.uses_remote() {
            ensure_bundled_loaded(&self.inner, reciter_id).await;
            return None;
        }

        let remote = self.refresh_remote(reciter_id, chapter_id, source).await;

        match source {
            TimingSource::Itqan { .. } => remote.audio_url,
            _ => None,
        }
    }

    async fn refresh_remote(
        &self,
        reciter_id: u32,
        chapter_id: u32,
        source: TimingSource,
    ) -> RemoteChapter {
        // Bundled chapters must be in place before deciding what a remote result may replace
        if source.uses_bundled() {
            ensure_bundled_loaded(&self.inner, reciter_id).await;
        }

        let key = chapter_key(reciter_id, chapter_id);
        let pending = {
            let mut state = self.inner.state.lock().await;

            if let Some(cached) = state.remote_cache.get(&key).cloned() {
                debug!(reciter_id, chapter_id, "Remote chapter served from cache");
                state.apply_remote(reciter_id, chapter_id, source, &cached);
                return cached;
            }

            let running = state.in_flight.get(&key).map(|pending| pending.future.clone());
            match running {
                Some(existing) => {
                    debug!(reciter_id, chapter_id, "Joining in-flight remote refresh");
                    existing
                }
                None => {
                    // Registered under the same lock the task needs to deregister
                    let id = state.next_refresh_id;
                    state.next_refresh_id += 1;
                    let future =
                        spawn_refresh(Arc::clone(&self.inner), reciter_id, chapter_id, source, id);
                    state.in_flight.insert(
                        key,
                        PendingRefresh {
                            id,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };

        pending.await
    }

    pub async fn snapshot(&self) -> IndexSnapshot {
        let state = self.inner.state.lock().await;
        IndexSnapshot {
            reciters_loaded: state
                .index
                .values()
                .filter(|chapters| !chapters.is_empty())
                .count(),
            chapters_indexed: state.index.values().map(HashMap::len).sum(),
            remote_chapters_cached: state.remote_cache.len(),
            refreshes_in_flight: state.in_flight.len(),
            bundled_loads_in_flight: state.bundled_loads.len(),
        }
    }
}
