// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! TTL cache over the upstream status source, with stale fallback.
//!
//! - Entry younger than the TTL: served as-is (hit).
//! - Otherwise refetch; on success the entry is replaced.
//! - Refetch failed but an entry exists: the old entry is served, marked
//!   stale, and the derived status becomes `degraded`.
//! - Refetch failed and nothing was ever cached: `StatusError::Unavailable`.
//!
//! The lock is never held across a fetch. Concurrent misses may all hit
//! upstream; the last one to finish wins the entry.

use crate::error::{FetchError, StatusError};
use crate::metrics::GatewayMetrics;
use crate::source::StatusSource;
use crate::status::{OverallStatus, StatusDocument, StatusView};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// The single cached document.
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Arc<StatusDocument>,
    fetched_at: Instant,
}

/// Where a served document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Entry was within the TTL.
    Hit,
    /// Fetched from upstream for this call.
    Fresh,
    /// Upstream failed; previous entry served.
    Stale,
}

/// A document together with how it was obtained.
#[derive(Debug, Clone)]
pub struct CachedStatus {
    pub document: Arc<StatusDocument>,
    pub freshness: Freshness,
    pub fetched_at: Instant,
}

impl CachedStatus {
    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }

    pub fn view(&self) -> StatusView<'_> {
        StatusView::new(&self.document, self.is_stale())
    }

    pub fn overall_status(&self) -> OverallStatus {
        self.view().status
    }
}

/// Cache configuration and shared state.
pub struct StatusCache {
    source: Arc<dyn StatusSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    entry: RwLock<Option<CacheEntry>>,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl StatusCache {
    pub fn new(source: Arc<dyn StatusSource>, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            source,
            ttl,
            fetch_timeout,
            entry: RwLock::new(None),
            metrics: None,
        }
    }

    /// Record hits, misses, fetch latency and the degraded gauge.
    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Serve the status document as of `now`.
    pub async fn get_status(&self, now: Instant) -> Result<CachedStatus, StatusError> {
        if let Some(hit) = self.lookup(now).await {
            debug!("Cache hit - returning cached status");
            if let Some(m) = &self.metrics {
                m.cache_hits.inc();
            }
            return Ok(self.observe(hit));
        }

        if let Some(m) = &self.metrics {
            m.cache_misses.inc();
        }
        debug!(source = %self.source.describe(), "Cache miss - fetching fresh data");

        match self.fetch().await {
            Ok(document) => {
                let payload = Arc::new(document);
                *self.entry.write().await = Some(CacheEntry {
                    payload: payload.clone(),
                    fetched_at: now,
                });
                info!(services = payload.services.len(), "Loaded and cached status data");
                Ok(self.observe(CachedStatus {
                    document: payload,
                    freshness: Freshness::Fresh,
                    fetched_at: now,
                }))
            }
            Err(err) => {
                let existing = self.entry.read().await.clone();
                match existing {
                    Some(entry) => {
                        warn!(error = %err, "Falling back to stale cache due to fetch error");
                        Ok(self.observe(CachedStatus {
                            document: entry.payload,
                            freshness: Freshness::Stale,
                            fetched_at: entry.fetched_at,
                        }))
                    }
                    None => {
                        error!(error = %err, "No cache available for fallback");
                        Err(StatusError::Unavailable(err))
                    }
                }
            }
        }
    }

    async fn lookup(&self, now: Instant) -> Option<CachedStatus> {
        let guard = self.entry.read().await;
        let entry = guard.as_ref()?;
        if now.saturating_duration_since(entry.fetched_at) < self.ttl {
            Some(CachedStatus {
                document: entry.payload.clone(),
                freshness: Freshness::Hit,
                fetched_at: entry.fetched_at,
            })
        } else {
            None
        }
    }

    async fn fetch(&self) -> Result<StatusDocument, FetchError> {
        let timer = self.metrics.as_ref().map(|m| m.status_fetch_seconds.start_timer());
        let result = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.fetch_timeout)),
        };
        if let Some(timer) = timer {
            timer.observe_duration();
        }
        result
    }

    fn observe(&self, status: CachedStatus) -> CachedStatus {
        let degraded = status.overall_status() == OverallStatus::Degraded;
        if degraded {
            debug!(stale = status.is_stale(), "Serving degraded status");
        }
        if let Some(m) = &self.metrics {
            m.degraded.set(i64::from(degraded));
        }
        status
    }

    /// Whether anything has been cached yet.
    pub async fn is_populated(&self) -> bool {
        self.entry.read().await.is_some()
    }
}
