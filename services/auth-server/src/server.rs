//! Server assembly: store selection, state wiring, graceful serve.

use crate::config::Config;
use crate::directory::SeededDirectory;
use crate::http::{self, AppState};
use crate::issuer::TokenIssuer;
use crate::keys::SigningKeyStore;
use anyhow::Context;
use identity_common::shutdown::{self, ShutdownCoordinator};
use identity_common::{InMemoryRevocationStore, RedisRevocationStore, RevocationStore};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const MEMORY_STORE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the service until a shutdown signal arrives.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let mut coordinator = ShutdownCoordinator::new();
    let store = build_store(&config, &mut coordinator).await?;
    let keystore = Arc::new(SigningKeyStore::new().context("signing key generation failed")?);
    let issuer = TokenIssuer::new(Arc::clone(&keystore), &config);
    let directory = Arc::new(SeededDirectory::with_default_users());

    let bind_addr = config.bind_addr();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_seconds);

    let state = Arc::new(AppState {
        config,
        keystore,
        issuer,
        directory,
        store,
    });

    let app = http::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "auth server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::wait_for_signal())
        .await
        .context("server error")?;

    coordinator.shutdown(shutdown_timeout).await;
    info!("auth server stopped");
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
