use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimingError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing timing data: {0}")]
    MissingData(String),

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("Unsupported timing source for reciter {reciter_id}")]
    UnsupportedTimingSource { reciter_id: u32 },

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl TimingError {
    pub(crate) fn missing_chapter(reciter_id: u32, chapter_id: u32) -> Self {
        Self::MissingData(format!(
            "no timings for reciter {} chapter {}",
            reciter_id, chapter_id
        ))
    }

    /// True when the source was reachable but holds nothing for the request.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingData(_))
    }
}

pub type Result<T> = std::result::Result<T, TimingError>;
