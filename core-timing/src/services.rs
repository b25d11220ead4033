//! Bootstrap wiring the timing stack from a [`TimingConfig`].

use core_runtime::config::TimingConfig;
use std::sync::Arc;
use tracing::info;

use crate::api_client::ApiClient;
use crate::cache::CacheStatistics;
use crate::catalog::ReciterCatalog;
use crate::error::Result;
use crate::index::TimingIndexService;
use crate::manager::TimingManager;
use crate::providers::{BundledTimingProvider, ItqanTimingProvider};

/// Everything playback needs, sharing one HTTP client, resource store and
/// clock.
///
/// ```ignore
/// let config = TimingConfig::builder().resource_dir("./resources").build()?;
/// let catalog = ReciterCatalog::from_json(&catalog_json)?;
/// let services = TimingServices::new(&config, catalog)?;
///
/// services.index().refresh_chapter_timings(5, 1).await;
/// let verse = services.index().get_current_verse(5, 1, 12_000).await;
/// ```
pub struct TimingServices {
    api: Arc<ApiClient>,
    bundled: Arc<BundledTimingProvider>,
    remote: Arc<ItqanTimingProvider>,
    manager: Arc<TimingManager>,
    index: TimingIndexService,
}

impl TimingServices {
    pub fn new(config: &TimingConfig, catalog: ReciterCatalog) -> Result<Self> {
        config.validate()?;

        let catalog = Arc::new(catalog);
        let api = Arc::new(ApiClient::from_config(config));

        let bundled = Arc::new(BundledTimingProvider::with_capacity(
            Arc::clone(&config.resource_store),
            config.bundled_cache_capacity,
        ));
        let remote = Arc::new(
            ItqanTimingProvider::new(Arc::clone(&api), Arc::clone(&catalog))
                .with_cache_capacity(config.remote_cache_capacity)
                .with_page_size(config.page_size),
        );

        let manager = Arc::new(TimingManager::new(
            Arc::clone(&catalog),
            bundled.clone(),
            remote.clone(),
        ));
        let index = TimingIndexService::new(Arc::clone(&manager));

        info!(
            reciters = catalog.len(),
            api_base_url = %config.api_base_url,
            "Timing services initialized"
        );

        Ok(Self {
            api,
            bundled,
            remote,
            manager,
            index,
        })
    }

    pub fn manager(&self) -> &Arc<TimingManager> {
        &self.manager
    }

    pub fn index(&self) -> &TimingIndexService {
        &self.index
    }

    pub fn api_client(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn bundled_cache_statistics(&self) -> CacheStatistics {
        self.bundled.cache_statistics()
    }

    pub fn remote_cache_statistics(&self) -> CacheStatistics {
        self.remote.cache_statistics()
    }
}
