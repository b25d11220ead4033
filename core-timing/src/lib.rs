//! # Verse Timing Core
//!
//! Resolves per-verse start/end offsets inside a reciter's chapter audio and
//! answers "which verse is playing now?" during playback.
//!
//! ## Overview
//!
//! - Bundled timing files read through a [`ResourceStore`](bridge_traits::ResourceStore)
//! - Remote timings from the paginated Itqan API, behind a TTL response cache
//! - Per-reciter source policy (bundled, remote, bundled with remote fallback)
//! - A shared in-memory index with lazy loading, deduplicated remote
//!   refreshes and tolerant current-verse lookup
//!
//! [`TimingServices`] wires all of it from a
//! [`TimingConfig`](core_runtime::config::TimingConfig).

pub mod api_client;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod index;
pub mod manager;
pub mod models;
pub mod providers;
pub mod services;

pub use api_client::ApiClient;
pub use cache::{CacheStatistics, LruCache};
pub use catalog::{ReciterCatalog, ReciterEntry};
pub use error::{Result, TimingError};
pub use index::{IndexSnapshot, TimingIndexService};
pub use manager::TimingManager;
pub use models::{ChapterTimingData, ReciterTimings, TimingSource, VerseRange, VerseTiming};
pub use providers::{BundledTimingProvider, ItqanTimingProvider, TimingProvider};
pub use services::TimingServices;
