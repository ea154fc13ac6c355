use std::sync::Arc;

use tracing::{info, warn};

use fleetstats::api::{ApiServer, ApiServerConfig, AppState};
use fleetstats::cache::MetadataCache;
use fleetstats::config::AppConfig;
use fleetstats::database::{
    self,
    repositories::{SqlxGeoCacheRepository, SqlxServerRepository},
};
use fleetstats::fanout::FanoutAggregator;
use fleetstats::geo::{GeoDatabase, GeoResolver, MaxMindGeoDatabase};
use fleetstats::images::ImageCacheProxy;
use fleetstats::logging::init_logging;
use fleetstats::registry::ServerRegistry;
use fleetstats::services::AggregationService;
use upstream_api::{UpstreamClient, install_rustls_provider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    // Keep the guard alive so buffered file logs are flushed on exit
    let (logging_config, _log_guard) = init_logging(&config.log_dir)?;
    install_rustls_provider();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting fleetstats");

    let pool = database::init_pool(&config.database_url).await?;
    database::run_migrations(&pool).await?;

    let metadata_cache = MetadataCache::new();
    let registry = Arc::new(ServerRegistry::new(
        Arc::new(SqlxServerRepository::new(pool.clone())),
        metadata_cache.clone(),
    ));

    let geo_database: Option<Arc<dyn GeoDatabase>> = match &config.geoip_db_path {
        Some(path) => match MaxMindGeoDatabase::open(path) {
            Ok(db) => Some(Arc::new(db)),
            Err(e) => {
                warn!(error = %e, "Offline geo database unavailable, using cache only");
                None
            }
        },
        None => None,
    };
    let geo = Arc::new(GeoResolver::new(
        Arc::new(SqlxGeoCacheRepository::new(pool.clone())),
        geo_database,
    ));

    let fanout = FanoutAggregator::new(UpstreamClient::new());
    let image_proxy = Arc::new(ImageCacheProxy::new(
        config.image_cache_dir.clone(),
        registry.clone(),
        fanout.client().clone(),
    ));
    let aggregation = Arc::new(
        AggregationService::new(registry.clone(), fanout, metadata_cache, geo)
            .with_metadata_ttl(config.metadata_ttl),
    );

    tokio::fs::create_dir_all(image_proxy.cache_dir()).await?;

    let state = AppState::new()
        .with_registry(registry)
        .with_aggregation(aggregation)
        .with_image_proxy(image_proxy)
        .with_logging_config(logging_config.clone());

    let server = ApiServer::with_state(ApiServerConfig::from(&config), state);
    let cancel_token = server.cancel_token();
    logging_config.start_retention_cleanup(cancel_token.clone());

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Shutdown signal received");
        cancel_token.cancel();
    });

    server.run().await?;

    info!("fleetstats stopped");
    Ok(())
}
