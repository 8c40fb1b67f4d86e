//! Server assembly: store selection, cache prewarm, graceful serve.

use crate::config::Config;
use crate::gate::PathMatcher;
use crate::http::{self, AppState};
use crate::jwt::{KeySetCache, TokenValidator};
use anyhow::Context;
use identity_common::shutdown::{self, ShutdownCoordinator};
use identity_common::{InMemoryRevocationStore, RedisRevocationStore, RevocationStore};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const MEMORY_STORE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the gateway until a shutdown signal arrives.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let mut coordinator = ShutdownCoordinator::new();
    let store = build_store(&config, &mut coordinator).await?;

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()
        .context("building outbound HTTP client")?;

    let cache = Arc::new(KeySetCache::new(&config, http_client.clone()));
    if config.jwks_prewarm {
        cache.prewarm().await.context("key set prewarm failed")?;
    } else {
        info!("key set prewarm disabled, first validation pays the fetch");
    }

    let validator = Arc::new(TokenValidator::new(Arc::clone(&cache), store, &config));
    let matcher = PathMatcher::new(&config.public_paths);

    let bind_addr = config.bind_addr();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_seconds);

    let state = Arc::new(AppState {
        config,
        matcher,
        validator,
        cache,
        http_client,
    });

    let app = http::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .context("server error")?;

    coordinator.shutdown(shutdown_timeout).await;
    info!("gateway stopped");
    Ok(())
}

async fn build_store(
    config: &Config,
    coordinator: &mut ShutdownCoordinator,
) -> anyhow::Result<Arc<dyn RevocationStore>> {
    match config.redis_url.as_deref() {
        Some(url) => {
            let store = RedisRevocationStore::new(url)
                .await
                .context("redis connection failed")?;
            info!("using redis revocation store");
            Ok(Arc::new(store))
        }
        None => {
            warn!("REDIS_URL not set, falling back to in-process revocation store");
            let store = Arc::new(InMemoryRevocationStore::new());
            coordinator.spawn(
                "revocation-sweeper",
                Arc::clone(&store).sweep_loop(MEMORY_STORE_SWEEP_INTERVAL),
            );
            Ok(store)
        }
    }
}
