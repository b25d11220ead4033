//! Static reciter catalog
//!
//! Maps each reciter id to its timing source and, for bundled reciters, the
//! base URL their chapter audio is served from. Hosts usually ship the
//! catalog as JSON alongside the bundled timing files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::error::{Result, TimingError};
use crate::models::TimingSource;

/// One reciter as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReciterEntry {
    pub id: u32,
    pub name: String,
    pub timing_source: TimingSource,
    /// Base URL of bundled-source audio, e.g. `https://server8.mp3quran.net/afs`
    #[serde(default)]
    pub audio_base_url: Option<String>,
}

impl ReciterEntry {
    pub fn new(id: u32, name: impl Into<String>, timing_source: TimingSource) -> Self {
        Self {
            id,
            name: name.into(),
            timing_source,
            audio_base_url: None,
        }
    }

    pub fn with_audio_base_url(mut self, url: impl Into<String>) -> Self {
        self.audio_base_url = Some(url.into());
        self
    }
}

/// Immutable lookup table built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ReciterCatalog {
    entries: HashMap<u32, ReciterEntry>,
}

impl ReciterCatalog {
    /// Builds a catalog. A later entry with the same id replaces an earlier one.
    pub fn new(entries: impl IntoIterator<Item = ReciterEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Parses a JSON array of [`ReciterEntry`].
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let entries: Vec<ReciterEntry> = serde_json::from_slice(json)
            .map_err(|e| TimingError::UnsupportedSchema(format!("reciter catalog: {}", e)))?;
        Ok(Self::new(entries))
    }

    /// Timing source of a reciter; unknown reciters are unsupported.
    pub fn resolve_source(&self, reciter_id: u32) -> TimingSource {
        self.entries
            .get(&reciter_id)
            .map(|e| e.timing_source)
            .unwrap_or(TimingSource::None)
    }

    pub fn itqan_asset_id(&self, reciter_id: u32) -> Option<u32> {
        self.resolve_source(reciter_id).itqan_asset_id()
    }

    pub fn get(&self, reciter_id: u32) -> Option<&ReciterEntry> {
        self.entries.get(&reciter_id)
    }

    /// Audio URL of a bundled-source chapter: `{base}/{chapter:03}.mp3`.
    ///
    /// Returns `Ok(None)` when the reciter has no audio base URL.
    pub fn bundled_audio_url(&self, reciter_id: u32, chapter_id: u32) -> Result<Option<Url>> {
        let Some(base) = self
            .entries
            .get(&reciter_id)
            .and_then(|e| e.audio_base_url.as_deref())
        else {
            return Ok(None);
        };

        let raw = format!("{}/{:03}.mp3", base.trim_end_matches('/'), chapter_id);
        Url::parse(&raw)
            .map(Some)
            .map_err(|e| TimingError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reciters(&self) -> impl Iterator<Item = &ReciterEntry> {
        self.entries.values()
    }
}
