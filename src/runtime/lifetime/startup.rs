use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::analytics::{AnalyticsService, ReportCache};
use crate::config::StaticConfig;
use crate::selection::SelectionEngine;
use crate::storage::{AnalyticsRepository, EventStore, SeaOrmStorage, StorageFactory};
use crate::tracking::{EventIngestor, RandomSource, ThreadRandom};

/// 服务器运行所需的全部组件
#[derive(Clone)]
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub ingestor: Arc<EventIngestor>,
    pub selection: Arc<SelectionEngine>,
    pub analytics: Arc<AnalyticsService>,
}

impl StartupContext {
    /// 基于已连接的存储组装服务
    pub fn assemble(
        storage: Arc<SeaOrmStorage>,
        config: &StaticConfig,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let event_store: Arc<dyn EventStore> = storage.clone();
        let repository: Arc<dyn AnalyticsRepository> = storage.clone();

        let cache = ReportCache::new(
            Duration::from_secs(config.analytics.cache_ttl_secs),
            config.analytics.cache_capacity,
        );

        let ingestor = Arc::new(EventIngestor::new(
            event_store.clone(),
            random.clone(),
            cache.clone(),
            config.tracking.clone(),
        ));
        let selection = Arc::new(SelectionEngine::new(
            event_store,
            random,
            config.selection.top_k,
        ));
        let analytics = Arc::new(AnalyticsService::new(
            repository,
            cache,
            config.analytics.clone(),
            config.revenue.clone(),
        ));

        Self {
            storage,
            ingestor,
            selection,
            analytics,
        }
    }
}

/// 准备服务器启动的上下文
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!(
        "Using storage backend: {}",
        storage.get_backend_name()
    );

    let config = crate::config::get_config();
    check_config(&config);

    let context = StartupContext::assemble(storage, &config, Arc::new(ThreadRandom));

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(context)
}

fn check_config(config: &StaticConfig) {
    if config.revenue.privileged_roles.is_empty() {
        warn!("revenue.privileged_roles is empty, the revenue dashboard is unreachable");
    }
    if config.server.cors_allowed_origins.iter().any(|o| o == "*") {
        info!("CORS: any origin may post tracking events");
    }
    for tier in ["FREE", "PREMIUM", "PRO"] {
        if !config.revenue.tier_prices.contains_key(tier) {
            warn!("No price configured for subscription tier {}", tier);
        }
    }
}
