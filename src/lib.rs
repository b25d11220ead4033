//! Workspace façade crate.
//!
//! Re-exports the individual workspace crates so a playback host can depend on
//! `recitation-timing` alone. The `desktop-shims` feature (enabled by default)
//! also pulls in the reqwest/tokio-fs adapters from `bridge-desktop`, which the
//! configuration builder uses as defaults when no bridge is injected.

pub use bridge_traits;
pub use core_runtime;
pub use core_timing;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

pub use core_runtime::config::TimingConfig;
pub use core_timing::{
    ChapterTimingData, IndexSnapshot, ReciterCatalog, ReciterEntry, TimingError,
    TimingIndexService, TimingManager, TimingServices, TimingSource, VerseRange, VerseTiming,
};
