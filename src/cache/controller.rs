//! One refresh cycle: reuse, refetch, or fall back
//!
//! The controller consults the store, fetches only when the cached artifact
//! is missing or older than the freshness window, and degrades to the stale
//! copy when the fetch fails. It never inspects payload content.

use std::time::Duration;
use thiserror::Error;

use crate::cache::store::{Artifact, ArtifactStore, StoreError};
use crate::config::ResourceKey;
use crate::data::fetcher::{FetchError, Fetcher};

/// Why a cycle produced no artifact at all
#[derive(Debug, Error)]
pub enum CycleError {
    /// The fetch failed and nothing was cached
    #[error("Weather data unavailable: {0}")]
    Fetch(#[source] FetchError),

    /// The fetch succeeded but the result could not be stored
    #[error("Failed to store fetched data: {0}")]
    StoreWrite(#[source] StoreError),

    /// The fetch failed and the cached copy could not be read
    #[error("Failed to read cached data: {0}")]
    StoreRead(#[source] StoreError),
}

/// Result of a single cache cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// The cached artifact was fresh; no fetch happened
    UsedFresh(Artifact),
    /// A new artifact was fetched and stored
    Refreshed(Artifact),
    /// The fetch failed; the previous artifact is served as-is
    FallbackStale { artifact: Artifact, cause: FetchError },
    /// Nothing could be served
    Unavailable(CycleError),
}

impl CycleOutcome {
    /// The artifact to present, if any
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            CycleOutcome::UsedFresh(artifact)
            | CycleOutcome::Refreshed(artifact)
            | CycleOutcome::FallbackStale { artifact, .. } => Some(artifact),
            CycleOutcome::Unavailable(_) => None,
        }
    }

    /// Short name for logging
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::UsedFresh(_) => "used_fresh",
            CycleOutcome::Refreshed(_) => "refreshed",
            CycleOutcome::FallbackStale { .. } => "fallback_stale",
            CycleOutcome::Unavailable(_) => "unavailable",
        }
    }
}

/// Decides, for one invocation, whether to reuse or refetch the artifact
#[derive(Debug)]
pub struct CacheController<F> {
    store: ArtifactStore,
    fetcher: F,
    key: ResourceKey,
    freshness_window: Duration,
}

impl<F: Fetcher> CacheController<F> {
    pub fn new(
        store: ArtifactStore,
        fetcher: F,
        key: ResourceKey,
        freshness_window: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            key,
            freshness_window,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn freshness_window(&self) -> Duration {
        self.freshness_window
    }

    /// Runs one cycle
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.run_cycle_notify(|| {}).await
    }

    /// Runs one cycle, calling `on_fetch` right before a network fetch starts
    ///
    /// `on_fetch` is not called when the cached artifact is fresh.
    pub async fn run_cycle_notify(&self, on_fetch: impl FnOnce() + Send) -> CycleOutcome {
        let now = self.store.clock().now();

        match self.store.read() {
            Ok(Some(artifact)) if artifact.is_fresh_at(now, self.freshness_window) => {
                tracing::debug!(
                    age_ms = artifact.age_at(now).as_millis() as u64,
                    "cached artifact is fresh"
                );
                return CycleOutcome::UsedFresh(artifact);
            }
            Ok(Some(artifact)) => {
                tracing::debug!(
                    age_ms = artifact.age_at(now).as_millis() as u64,
                    "cached artifact is stale"
                );
            }
            Ok(None) => tracing::debug!("no cached artifact"),
            Err(e) => tracing::warn!(error = %e, "cached artifact unreadable, refetching"),
        }

        on_fetch();

        match self.fetcher.fetch(&self.key).await {
            Ok(payload) => match self.store.write(&payload) {
                Ok(artifact) => {
                    tracing::info!(bytes = artifact.payload.len(), "refreshed weather data");
                    CycleOutcome::Refreshed(artifact)
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to store fetched data");
                    CycleOutcome::Unavailable(CycleError::StoreWrite(e))
                }
            },
            Err(cause) => self.fall_back(cause),
        }
    }

    /// Serves whatever is cached after a failed fetch, without re-stamping it
    fn fall_back(&self, cause: FetchError) -> CycleOutcome {
        match self.store.read() {
            Ok(Some(artifact)) => {
                tracing::warn!(
                    error = %cause,
                    stored_at = %artifact.stored_at,
                    "fetch failed, serving stale data"
                );
                CycleOutcome::FallbackStale { artifact, cause }
            }
            Ok(None) => {
                tracing::warn!(error = %cause, "fetch failed and nothing is cached");
                CycleOutcome::Unavailable(CycleError::Fetch(cause))
            }
            Err(e) => {
                tracing::error!(
                    fetch_error = %cause,
                    error = %e,
                    "fetch failed and cache is unreadable"
                );
                CycleOutcome::Unavailable(CycleError::StoreRead(e))
            }
        }
    }
}
