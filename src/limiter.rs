// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter.
//!
//! Buckets are keyed by (client identity, route). Each bucket holds the
//! admit instants inside the current window; older instants are pruned on
//! every access to that key. At most `limit` admits are granted per
//! `window` per key.
//!
//! Webhook routes (the `hooks_prefix`) get the stricter `hooks_limit`;
//! everything else gets `default_limit`. A limit of 0 disables limiting.

use crate::config::RateLimitConfig;
use crate::metrics::GatewayMetrics;
use axum::http::HeaderMap;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Identity used when neither the identity header nor a peer address is
/// available.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Bucket key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub identity: String,
    pub route: String,
}

impl RateKey {
    pub fn new(identity: impl Into<String>, route: impl Into<String>) -> Self {
        let identity = identity.into();
        let identity = if identity.trim().is_empty() {
            UNKNOWN_IDENTITY.to_string()
        } else {
            identity
        };
        Self {
            identity,
            route: route.into(),
        }
    }
}

/// Derive the client identity for rate limiting.
///
/// With an identity header configured, its first comma-separated value
/// wins (so `X-Forwarded-For` works as-is). Otherwise the peer address is
/// used. Never returns an empty string.
pub fn client_identity(headers: &HeaderMap, peer: Option<IpAddr>, identity_header: &str) -> String {
    if !identity_header.is_empty() {
        let from_header = headers
            .get(identity_header)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(value) = from_header {
            return value.to_string();
        }
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string())
}

/// Result of an admit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Admitted and counted against the window.
    Allowed { limit: u32, remaining: u32 },
    /// Window is full.
    Limited { limit: u32, retry_after_secs: u64 },
    /// Limiting is disabled for this route.
    Unlimited,
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Admission::Limited { .. })
    }
}

/// Admit instants inside the current window, oldest first.
#[derive(Debug, Default)]
struct SlidingWindow {
    hits: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Drop instants at or before `now - window`.
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.hits.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }

    /// Whole seconds until the oldest hit leaves the window, at least 1.
    fn retry_after(&self, now: Instant, window: Duration) -> u64 {
        let Some(&oldest) = self.hits.front() else {
            return 1;
        };
        let wait = window.saturating_sub(now.saturating_duration_since(oldest));
        let secs = wait.as_secs().saturating_add(u64::from(wait.subsec_nanos() > 0));
        secs.max(1)
    }
}

/// Shared, lock-protected bucket store.
///
/// One coarse lock covers the whole store; the prune-check-append sequence
/// for a key runs entirely under it, so concurrent admits for the same key
/// never lose updates.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<RateKey, SlidingWindow>>>,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
            metrics: None,
        }
    }

    /// Count rejections in `gw_rate_limit_dropped_total`.
    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Limit that applies to `route`.
    pub fn limit_for(&self, route: &str) -> u32 {
        if route.starts_with(&self.config.hooks_prefix) {
            self.config.hooks_limit
        } else {
            self.config.default_limit
        }
    }

    /// Try to admit one request for `key` at `now`.
    pub async fn admit(&self, key: &RateKey, now: Instant) -> Admission {
        let limit = self.limit_for(&key.route);
        if limit == 0 {
            return Admission::Unlimited;
        }
        let window = self.config.window_duration();

        let admission = {
            let mut buckets = self.buckets.lock().await;
            let bucket = buckets.entry(key.clone()).or_default();
            bucket.prune(now, window);

            if bucket.hits.len() >= limit as usize {
                Admission::Limited {
                    limit,
                    retry_after_secs: bucket.retry_after(now, window),
                }
            } else {
                bucket.hits.push_back(now);
                Admission::Allowed {
                    limit,
                    remaining: limit.saturating_sub(bucket.hits.len() as u32),
                }
            }
        };

        match admission {
            Admission::Allowed { remaining, .. } => {
                debug!(identity = %key.identity, route = %key.route, remaining, "Request admitted");
            }
            Admission::Limited { retry_after_secs, .. } => {
                info!(
                    identity = %key.identity,
                    route = %key.route,
                    retry_after_secs,
                    "Rate limit exceeded"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.rate_limit_dropped.with_label_values(&[key.route.as_str()]).inc();
                }
            }
            Admission::Unlimited => {}
        }

        admission
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.buckets.lock().await.len()
    }

    /// Drop buckets with no hits left in the window.
    pub async fn cleanup(&self, now: Instant) {
        let window = self.config.window_duration();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            bucket.prune(now, window);
            !bucket.hits.is_empty()
        });
        let removed = before - buckets.len();
        if removed > 0 {
            debug!(removed, remaining = buckets.len(), "Evicted idle rate limit buckets");
        }
    }
}
