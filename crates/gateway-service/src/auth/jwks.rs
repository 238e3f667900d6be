//! JWKS client for fetching and caching the issuer's public keys.
//!
//! Keys are fetched from the configured JWKS URL and held as an immutable
//! snapshot behind an `Arc`. Readers clone the `Arc` and never block on a
//! refresh in progress; a refresh builds a new snapshot and swaps it in.
//!
//! # Security
//!
//! - Fetch failures fail closed: no key means no successful validation
//! - Expired snapshots are never used for validation
//! - A lookup triggers at most one refresh, so an attacker cycling unknown
//!   `kid` values cannot amplify traffic to the issuer per request
//! - Concurrent refreshes are coalesced into a single fetch, and callers
//!   queued behind a failed refresh share its failure

use crate::observability::metrics;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Number of fetch attempts per refresh (initial try plus one retry).
const FETCH_ATTEMPTS: u32 = 2;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type: "OKP", "RSA" or "EC".
    pub kty: String,

    /// Key ID, matched against the token header.
    #[serde(default)]
    pub kid: String,

    /// Curve name for OKP and EC keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key, or EC x coordinate (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm the key is intended for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" or "enc").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS response body.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// Errors from key lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyCacheError {
    /// The key set could not be fetched.
    #[error("Key set unavailable")]
    Unavailable,

    /// The key set was fetched but has no key with the requested ID.
    #[error("Unknown key ID")]
    UnknownKid,
}

/// Immutable key set snapshot.
struct CachedJwks {
    keys: HashMap<String, Jwk>,
    expires_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self) -> bool {
        self.expires_at > Instant::now()
    }
}

/// JWKS client for fetching and caching public keys.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,

    /// Current snapshot; replaced wholesale on refresh.
    cache: RwLock<Option<Arc<CachedJwks>>>,

    /// Held for the duration of a refresh so concurrent callers share it.
    refresh_lock: Mutex<()>,

    /// Count of successful refreshes. Bumped after the snapshot is swapped.
    generation: AtomicU64,

    /// Count of finished refresh attempts, failed ones included. Callers
    /// queued behind an attempt share its outcome instead of fetching again.
    attempts: AtomicU64,

    cache_ttl: Duration,
}

impl JwksClient {
    /// Create a new JWKS client.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the issuer's JWKS endpoint
    /// * `cache_ttl` - How long a fetched key set is trusted
    /// * `fetch_timeout` - Timeout for a single fetch attempt
    pub fn new(jwks_url: String, cache_ttl: Duration, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gateway.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            attempts: AtomicU64::new(0),
            cache_ttl,
        }
    }

    /// Look up a key by ID.
    ///
    /// Serves from a fresh snapshot when possible. A cold or expired cache,
    /// or a `kid` absent from a fresh snapshot, triggers one refresh.
    ///
    /// # Errors
    ///
    /// Returns `KeyCacheError::Unavailable` if the key set cannot be fetched.
    /// Returns `KeyCacheError::UnknownKid` if the key is absent after refresh.
    #[instrument(skip_all, name = "gateway.auth.jwks.get_key", fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, KeyCacheError> {
        let observed = self.attempts.load(Ordering::Acquire);

        if let Some(snapshot) = self.snapshot().await {
            if snapshot.is_fresh() {
                if let Some(key) = snapshot.keys.get(kid) {
                    tracing::debug!(target: "gateway.auth.jwks", kid = %kid, "JWKS cache hit");
                    return Ok(key.clone());
                }
                tracing::debug!(target: "gateway.auth.jwks", kid = %kid, "Key not in JWKS cache, refreshing");
            }
        }

        self.refresh_unless_newer(observed).await?;

        let snapshot = self.snapshot().await.ok_or(KeyCacheError::Unavailable)?;
        if !snapshot.is_fresh() {
            return Err(KeyCacheError::Unavailable);
        }

        snapshot.keys.get(kid).cloned().ok_or_else(|| {
            tracing::warn!(target: "gateway.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
            KeyCacheError::UnknownKid
        })
    }

    /// Make sure an unexpired key set is loaded, refreshing if needed.
    ///
    /// Used by the readiness probe.
    pub async fn ensure_loaded(&self) -> Result<(), KeyCacheError> {
        let observed = self.attempts.load(Ordering::Acquire);
        if self.snapshot().await.is_some_and(|s| s.is_fresh()) {
            return Ok(());
        }
        self.refresh_unless_newer(observed).await
    }

    /// Number of successful refreshes since startup.
    pub fn refresh_count(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    async fn snapshot(&self) -> Option<Arc<CachedJwks>> {
        self.cache.read().await.clone()
    }

    /// Refresh the key set unless another refresh attempt finished after
    /// `observed` was read, in which case its outcome is shared.
    ///
    /// A failed attempt is recorded like a successful one, so during an
    /// outage queued callers fail together instead of fetching in turn.
    async fn refresh_unless_newer(&self, observed: u64) -> Result<(), KeyCacheError> {
        let _guard = self.refresh_lock.lock().await;

        if self.attempts.load(Ordering::Acquire) != observed {
            tracing::debug!(target: "gateway.auth.jwks", "Sharing concurrent JWKS refresh outcome");
            return match self.snapshot().await {
                Some(snapshot) if snapshot.is_fresh() => Ok(()),
                _ => Err(KeyCacheError::Unavailable),
            };
        }

        let outcome = match self.fetch_with_retry().await {
            Ok(keys) => {
                metrics::record_jwks_refresh("success");
                tracing::info!(
                    target: "gateway.auth.jwks",
                    key_count = keys.len(),
                    "JWKS cache refreshed"
                );

                let snapshot = Arc::new(CachedJwks {
                    keys,
                    expires_at: Instant::now() + self.cache_ttl,
                });
                *self.cache.write().await = Some(snapshot);
                self.generation.fetch_add(1, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                metrics::record_jwks_refresh("error");
                Err(e)
            }
        };

        self.attempts.fetch_add(1, Ordering::Release);
        outcome
    }

    async fn fetch_with_retry(&self) -> Result<HashMap<String, Jwk>, KeyCacheError> {
        let mut attempt = 1;
        loop {
            match self.fetch().await {
                Ok(keys) => return Ok(keys),
                Err(e) if attempt >= FETCH_ATTEMPTS => return Err(e),
                Err(_) => {
                    tracing::debug!(target: "gateway.auth.jwks", attempt, "Retrying JWKS fetch");
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch(&self) -> Result<HashMap<String, Jwk>, KeyCacheError> {
        tracing::debug!(target: "gateway.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "gateway.auth.jwks", error = %e, "Failed to fetch JWKS");
                KeyCacheError::Unavailable
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "gateway.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(KeyCacheError::Unavailable);
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "gateway.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeyCacheError::Unavailable
        })?;

        Ok(index_signing_keys(jwks.keys))
    }
}

/// Index keys by ID, skipping encryption keys and keys without an ID.
fn index_signing_keys(keys: Vec<Jwk>) -> HashMap<String, Jwk> {
    keys.into_iter()
        .filter(|key| !key.kid.is_empty())
        .filter(|key| key.key_use.as_deref().map_or(true, |u| u == "sig"))
        .map(|key| (key.kid.clone(), key))
        .collect()
}
