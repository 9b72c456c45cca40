//! Memoization of one decoded rules container with single-flight refresh.
//!
//! Callers that verify many envelopes against the same governance rules fetch
//! and verify the container once, then hand the cached copy to the verifier so
//! it can skip the SuperAdmin signature and decode steps. The cache holds one
//! container with a TTL; concurrent `get()` calls during a refresh share the
//! in-flight fetch instead of launching their own, and all of them observe the
//! same result or the same error.
//!
//! The provider is awaited outside the state lock, so a slow fetch never
//! blocks `is_valid()` or a concurrent `clear()`.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::ConfigError;
use crate::rules::RulesContainer;

/// TTL applied when the caller does not configure one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Source of fresh rules containers, typically a platform API client that
/// fetches, signature-checks, and decodes the container.
#[async_trait::async_trait]
pub trait RulesProvider: Send + Sync {
    async fn fetch(&self) -> Result<RulesContainer, Box<dyn std::error::Error + Send + Sync>>;
}

/// Failure of a cache fetch, shared verbatim by every caller of the flight
/// that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rules container fetch failed: {0}")]
pub struct FetchError(pub String);

type Flight = Shared<BoxFuture<'static, Result<Arc<RulesContainer>, FetchError>>>;

struct CacheState {
    cached: Option<CachedContainer>,
    in_flight: Option<Flight>,
}

struct CachedContainer {
    container: Arc<RulesContainer>,
    expires_at: Instant,
}

/// A TTL cache holding one decoded rules container.
///
/// Cloning is cheap and clones share state; composing several independent
/// caches per process is equally valid.
#[derive(Clone)]
pub struct RulesContainerCache {
    provider: Arc<dyn RulesProvider>,
    ttl: Duration,
    state: Arc<Mutex<CacheState>>,
}

impl RulesContainerCache {
    /// A cache with the default five-minute TTL.
    pub fn new(provider: Arc<dyn RulesProvider>) -> Self {
        RulesContainerCache {
            provider,
            ttl: DEFAULT_TTL,
            state: Arc::new(Mutex::new(CacheState {
                cached: None,
                in_flight: None,
            })),
        }
    }

    /// A cache with an explicit TTL. A zero TTL is a construction error.
    pub fn with_ttl(provider: Arc<dyn RulesProvider>, ttl: Duration) -> Result<Self, ConfigError> {
        if ttl.is_zero() {
            return Err(ConfigError::NonPositiveTtl);
        }
        let mut cache = Self::new(provider);
        cache.ttl = ttl;
        Ok(cache)
    }

    /// The cached container, refreshed through the provider when missing or
    /// expired.
    ///
    /// When a refresh is already in flight the caller awaits that flight
    /// rather than starting a second fetch; every waiter of one flight
    /// receives the same container or the same error.
    pub async fn get(&self) -> Result<Arc<RulesContainer>, FetchError> {
        let flight = {
            let mut state = self.state.lock().await;
            if let Some(cached) = &state.cached {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.container.clone());
                }
            }
            self.join_or_start_flight(&mut state)
        };
        flight.await
    }

    /// Force a fetch regardless of TTL, subject to the same single-flight
    /// constraint as [`get`](Self::get).
    pub async fn refresh(&self) -> Result<Arc<RulesContainer>, FetchError> {
        let flight = {
            let mut state = self.state.lock().await;
            self.join_or_start_flight(&mut state)
        };
        flight.await
    }

    /// Drop the cached container. An in-flight refresh is unaffected and will
    /// repopulate the cache on completion.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.cached = None;
    }

    /// Whether an unexpired container is currently cached. Performs no I/O.
    pub async fn is_valid(&self) -> bool {
        let state = self.state.lock().await;
        state
            .cached
            .as_ref()
            .is_some_and(|cached| Instant::now() < cached.expires_at)
    }

    /// Expiry instant of the cached container, if one is present.
    pub async fn expires_at(&self) -> Option<Instant> {
        let state = self.state.lock().await;
        state.cached.as_ref().map(|cached| cached.expires_at)
    }

    fn join_or_start_flight(&self, state: &mut CacheState) -> Flight {
        if let Some(flight) = &state.in_flight {
            return flight.clone();
        }
        let flight = self.start_flight();
        state.in_flight = Some(flight.clone());
        flight
    }

    /// Build the shared fetch future. The state lock is reacquired only after
    /// the provider call completes; the result lands in the cache and the
    /// flight slot is cleared before any waiter observes the outcome. A failed
    /// fetch leaves a previously cached container untouched.
    fn start_flight(&self) -> Flight {
        let provider = self.provider.clone();
        let state = self.state.clone();
        let ttl = self.ttl;
        async move {
            let fetched = provider.fetch().await;
            let mut state = state.lock().await;
            state.in_flight = None;
            match fetched {
                Ok(container) => {
                    let container = Arc::new(container);
                    state.cached = Some(CachedContainer {
                        container: container.clone(),
                        expires_at: Instant::now() + ttl,
                    });
                    tracing::debug!("rules container cache refreshed");
                    Ok(container)
                }
                Err(err) => {
                    tracing::warn!(error = %err, "rules container fetch failed");
                    Err(FetchError(err.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }
}
