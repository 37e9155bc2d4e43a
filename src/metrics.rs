// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the gateway.
//!
//! Every `GatewayMetrics` owns its own registry, so two gateways in one
//! process (as in tests) never share counters.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

/// Counters, gauges and histograms exported on `/metrics`.
pub struct GatewayMetrics {
    registry: Registry,
    /// Pipeline rejections by stage and route.
    pub rejections: IntCounterVec,
    /// Requests dropped by the rate limiter, by route.
    pub rate_limit_dropped: IntCounterVec,
    /// Protected-route requests answered below 400, by route.
    pub hooks_ok: IntCounterVec,
    /// Protected-route handling time in milliseconds.
    pub hooks_duration_ms: Histogram,
    /// Upstream status fetch latency.
    pub status_fetch_seconds: Histogram,
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    /// 1 when the last served status view was degraded.
    pub degraded: IntGauge,
    pub build_info: IntGaugeVec,
}

impl GatewayMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let rejections = IntCounterVec::new(
            Opts::new("gw_pipeline_rejections_total", "Requests rejected by a pipeline stage"),
            &["stage", "route"],
        )?;
        let rate_limit_dropped = IntCounterVec::new(
            Opts::new("gw_rate_limit_dropped_total", "Requests dropped by rate limiter"),
            &["route"],
        )?;
        let hooks_ok = IntCounterVec::new(
            Opts::new("gw_hooks_ok_total", "Successful (HTTP<400) protected-route requests"),
            &["route"],
        )?;
        let hooks_duration_ms = Histogram::with_opts(
            HistogramOpts::new("gw_hooks_duration_ms", "Duration of protected-route requests in milliseconds")
                .buckets(vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]),
        )?;
        let status_fetch_seconds = Histogram::with_opts(HistogramOpts::new(
            "gw_status_fetch_seconds",
            "Time to fetch status data from upstream",
        ))?;
        let cache_hits = IntCounter::new("gw_status_cache_hits_total", "Cache hits for status data")?;
        let cache_misses =
            IntCounter::new("gw_status_cache_misses_total", "Cache misses for status data")?;
        let degraded = IntGauge::new(
            "gw_status_degraded",
            "Whether the served status is degraded (1=yes, 0=no)",
        )?;
        let build_info = IntGaugeVec::new(Opts::new("gw_build_info", "Build info"), &["version", "name"])?;

        registry.register(Box::new(rejections.clone()))?;
        registry.register(Box::new(rate_limit_dropped.clone()))?;
        registry.register(Box::new(hooks_ok.clone()))?;
        registry.register(Box::new(hooks_duration_ms.clone()))?;
        registry.register(Box::new(status_fetch_seconds.clone()))?;
        registry.register(Box::new(cache_hits.clone()))?;
        registry.register(Box::new(cache_misses.clone()))?;
        registry.register(Box::new(degraded.clone()))?;
        registry.register(Box::new(build_info.clone()))?;

        build_info
            .with_label_values(&[env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_NAME")])
            .set(1);

        Ok(Self {
            registry,
            rejections,
            rate_limit_dropped,
            hooks_ok,
            hooks_duration_ms,
            status_fetch_seconds,
            cache_hits,
            cache_misses,
            degraded,
            build_info,
        })
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Content-Type for [`render`](Self::render) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
