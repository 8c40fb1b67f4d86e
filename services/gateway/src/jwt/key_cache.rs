//! Key set cache with single-flight refresh.
//!
//! The cache holds at most one immutable snapshot of the issuer's published
//! key set, swapped atomically on refresh. Concurrent refreshes collapse into
//! one upstream fetch: the first caller parks a shared future in the inflight
//! slot and every other caller awaits the same future. The future clears its
//! own slot after publishing, so a waiter cancelled mid-await leaves the
//! fetch parked for the next caller instead of poisoning the slot.
//!
//! Refresh failure keeps the previous snapshot: a stale key set still
//! validates tokens, an empty cache cannot.

use crate::config::Config;
use crate::error::GatewayError;
use crate::metrics::JWKS_FETCHES;
use arc_swap::ArcSwapOption;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use identity_common::KeySet;
use jsonwebtoken::DecodingKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Refresh failure shared by every single-flight waiter.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
struct RefreshError {
    reason: String,
}

/// One published key set, immutable once built.
pub struct KeySnapshot {
    keys: HashMap<String, Arc<DecodingKey>>,
    fetched_at: Instant,
}

// DecodingKey has no Debug; show the kids instead.
impl std::fmt::Debug for KeySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySnapshot")
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .field("fetched_at", &self.fetched_at)
            .finish()
    }
}

impl KeySnapshot {
    fn from_document(document: &KeySet) -> Self {
        let mut keys = HashMap::new();
        for jwk in &document.keys {
            match jwk.decoding_key() {
                Ok(key) => {
                    keys.insert(jwk.kid.clone(), Arc::new(key));
                }
                Err(e) => warn!(kid = %jwk.kid, error = %e, "skipping unusable published key"),
            }
        }
        KeySnapshot {
            keys,
            fetched_at: Instant::now(),
        }
    }

    /// Decoding key for a key id, if published.
    #[must_use]
    pub fn key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        self.keys.get(kid).cloned()
    }

    /// Number of usable keys in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the snapshot holds no usable keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }
}

type InflightFuture = Shared<BoxFuture<'static, Result<Arc<KeySnapshot>, RefreshError>>>;

/// State the inflight fetch future owns alongside the cache itself.
struct SharedState {
    snapshot: ArcSwapOption<KeySnapshot>,
    inflight: Mutex<Option<InflightFuture>>,
    last_miss_refresh: Mutex<Option<Instant>>,
    fetches: AtomicU64,
}

/// Cached view of the issuer's published key set.
pub struct KeySetCache {
    shared: Arc<SharedState>,
    http_client: reqwest::Client,
    jwks_url: Url,
    ttl: Duration,
    cooldown: Duration,
}

impl KeySetCache {
    /// Creates an empty cache; nothing is fetched until needed.
    #[must_use]
    pub fn new(config: &Config, http_client: reqwest::Client) -> Self {
        KeySetCache {
            shared: Arc::new(SharedState {
                snapshot: ArcSwapOption::empty(),
                inflight: Mutex::new(None),
                last_miss_refresh: Mutex::new(None),
                fetches: AtomicU64::new(0),
            }),
            http_client,
            jwks_url: config.jwks_url.clone(),
            ttl: config.jwks_cache_ttl(),
            cooldown: config.jwks_refresh_cooldown(),
        }
    }

    /// Current snapshot, refreshed when missing or older than the TTL.
    ///
    /// A failed refresh falls back to the stale snapshot when one exists;
    /// only an empty cache surfaces the failure.
    pub async fn get(&self) -> Result<Arc<KeySnapshot>, GatewayError> {
        if let Some(snapshot) = self.shared.snapshot.load_full() {
            if snapshot.age() < self.ttl {
                return Ok(snapshot);
            }
        }

        match self.refresh().await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => match self.shared.snapshot.load_full() {
                Some(stale) => {
                    warn!(error = %e, "serving stale key set after failed refresh");
                    Ok(stale)
                }
                None => Err(GatewayError::KeySetUnavailable {
                    reason: e.reason,
                }),
            },
        }
    }

    /// Resolves the decoding key for `kid`.
    ///
    /// An unknown kid triggers at most one refresh before the key is
    /// declared unknown; the refresh is cooldown-limited so a flood of bad
    /// kids cannot hammer the issuer.
    pub async fn key_for(&self, kid: &str) -> Result<Arc<DecodingKey>, GatewayError> {
        let snapshot = self.get().await?;
        if let Some(key) = snapshot.key(kid) {
            return Ok(key);
        }

        if self.claim_miss_refresh() {
            debug!(kid = %kid, "kid not in snapshot, refreshing key set");
            match self.refresh().await {
                Ok(fresh) => {
                    if let Some(key) = fresh.key(kid) {
                        return Ok(key);
                    }
                }
                Err(e) => debug!(error = %e, "unknown-kid refresh failed"),
            }
        }

        debug!(kid = %kid, "signing key not in published set");
        Err(GatewayError::InvalidSignature)
    }

    /// Fetches once at startup so the first request never pays the fetch.
    pub async fn prewarm(&self) -> Result<(), GatewayError> {
        self.refresh()
            .await
            .map(|snapshot| {
                info!(keys = snapshot.len(), "key set prewarmed");
            })
            .map_err(|e| GatewayError::KeySetUnavailable { reason: e.reason })
    }

    /// Number of upstream fetches performed so far.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.shared.fetches.load(Ordering::Relaxed)
    }

    /// Number of usable keys in the current snapshot.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.shared
            .snapshot
            .load_full()
            .map_or(0, |snapshot| snapshot.len())
    }

    async fn refresh(&self) -> Result<Arc<KeySnapshot>, RefreshError> {
        self.refresh_future().await
    }

    /// Clones the inflight fetch, or installs a new one.
    fn refresh_future(&self) -> InflightFuture {
        let mut slot = self.shared.inflight.lock();
        if let Some(inflight) = slot.as_ref() {
            return inflight.clone();
        }

        let shared = Arc::clone(&self.shared);
        let client = self.http_client.clone();
        let url = self.jwks_url.clone();

        let fut: BoxFuture<'static, Result<Arc<KeySnapshot>, RefreshError>> =
            Box::pin(async move {
                let result = fetch_key_set(&client, &url).await;
                shared.fetches.fetch_add(1, Ordering::Relaxed);

                let outcome = match result {
                    // A document whose keys are all unusable must not
                    // replace a working snapshot; it counts as a failed
                    // refresh and the stale fallback applies.
                    Ok(document) => {
                        let snapshot = Arc::new(KeySnapshot::from_document(&document));
                        if snapshot.is_empty() {
                            JWKS_FETCHES.with_label_values(&["failure"]).inc();
                            warn!("key set document contains no usable keys");
                            Err(RefreshError {
                                reason: "key set document contains no usable keys".to_string(),
                            })
                        } else {
                            shared.snapshot.store(Some(Arc::clone(&snapshot)));
                            JWKS_FETCHES.with_label_values(&["success"]).inc();
                            info!(keys = snapshot.len(), "key set refreshed");
                            Ok(snapshot)
                        }
                    }
                    Err(e) => {
                        JWKS_FETCHES.with_label_values(&["failure"]).inc();
                        warn!(error = %e, "key set fetch failed");
                        Err(e)
                    }
                };

                // Clear our own slot; waiters observe the result afterwards.
                *shared.inflight.lock() = None;
                outcome
            });

        let inflight = fut.shared();
        *slot = Some(inflight.clone());
        inflight
    }

    /// Claims the miss-refresh slot unless the cooldown is still running.
    fn claim_miss_refresh(&self) -> bool {
        let mut last = self.shared.last_miss_refresh.lock();
        match *last {
            Some(at) if at.elapsed() < self.cooldown => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}

async fn fetch_key_set(client: &reqwest::Client, url: &Url) -> Result<KeySet, RefreshError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| RefreshError {
            reason: format!("GET {url}: {e}"),
        })?;

    if !response.status().is_success() {
        return Err(RefreshError {
            reason: format!("GET {url}: status {}", response.status()),
        });
    }

    let document: KeySet = response.json().await.map_err(|e| RefreshError {
        reason: format!("invalid key set document: {e}"),
    })?;

    if document.keys.is_empty() {
        return Err(RefreshError {
            reason: "key set document contains no keys".to_string(),
        });
    }

    Ok(document)
}
