//! Integration tests for the `Both` source policy of `TimingManager`

use core_timing::{
    ChapterTimingData, ReciterCatalog, ReciterEntry, TimingError, TimingManager, TimingProvider,
    TimingSource, VerseTiming,
};
use mockall::mock;
use std::sync::Arc;
use url::Url;

mock! {
    pub Provider {}

    #[async_trait::async_trait]
    impl TimingProvider for Provider {
        async fn fetch_chapter_data(&self, reciter_id: u32, chapter_id: u32) -> core_timing::Result<ChapterTimingData>;
        fn name(&self) -> &'static str;
    }
}

fn hybrid_catalog() -> Arc<ReciterCatalog> {
    Arc::new(ReciterCatalog::new([ReciterEntry::new(
        5,
        "Hybrid",
        TimingSource::Both { itqan_asset_id: 11 },
    )]))
}

fn failing_bundled() -> MockProvider {
    let mut bundled = MockProvider::new();
    bundled
        .expect_fetch_chapter_data()
        .times(1)
        .returning(|r, c| {
            Err(TimingError::MissingData(format!(
                "no timings for reciter {} chapter {}",
                r, c
            )))
        });
    bundled.expect_name().return_const("bundled");
    bundled
}

#[tokio::test]
async fn test_fallback_returns_remote_result_unmodified() {
    let remote_data = ChapterTimingData::new(
        vec![
            VerseTiming::new(114, 1, 0.0, 4.0),
            VerseTiming::new(114, 2, 4.0, 7.5),
        ],
        Some(Url::parse("https://cdn.example.com/11/114.mp3").unwrap()),
    );
    let expected = remote_data.clone();

    let mut remote = MockProvider::new();
    remote
        .expect_fetch_chapter_data()
        .withf(|r, c| *r == 5 && *c == 114)
        .times(1)
        .returning(move |_, _| Ok(remote_data.clone()));
    remote.expect_name().return_const("itqan");

    let manager = TimingManager::new(
        hybrid_catalog(),
        Arc::new(failing_bundled()),
        Arc::new(remote),
    );

    let data = manager.get_chapter_data_for_playback(5, 114).await.unwrap();
    assert_eq!(data, expected);
}

#[tokio::test]
async fn test_remote_error_surfaces_when_both_fail() {
    let mut remote = MockProvider::new();
    remote
        .expect_fetch_chapter_data()
        .times(1)
        .returning(|_, _| Err(TimingError::InvalidResponse("HTTP 502".into())));
    remote.expect_name().return_const("itqan");

    let manager = TimingManager::new(
        hybrid_catalog(),
        Arc::new(failing_bundled()),
        Arc::new(remote),
    );

    match manager.get_chapter_data_for_playback(5, 114).await {
        Err(TimingError::InvalidResponse(message)) => assert_eq!(message, "HTTP 502"),
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_only_asks_remote() {
    let mut bundled = MockProvider::new();
    bundled.expect_fetch_chapter_data().never();
    bundled.expect_name().return_const("bundled");

    let mut remote = MockProvider::new();
    remote
        .expect_fetch_chapter_data()
        .times(1)
        .returning(|_, c| Ok(ChapterTimingData::new(vec![VerseTiming::new(c, 1, 0.0, 1.0)], None)));
    remote.expect_name().return_const("itqan");

    let manager = TimingManager::new(hybrid_catalog(), Arc::new(bundled), Arc::new(remote));

    let refreshed = manager.refresh_remote_timing_if_available(5, 3).await.unwrap();
    assert_eq!(refreshed.map(|d| d.timings.len()), Some(1));
}
