// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the status gateway.
//!
//! Handlers only see requests that already passed whatever middleware the
//! router put in front of them; see [`crate::app::router`].

use crate::cache::StatusCache;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::GatewayError;
use crate::limiter::RateLimiter;
use crate::metrics::GatewayMetrics;
use crate::pipeline::RequestPipeline;
use crate::signature::{canonical_payload, minify_json, HmacSecret};
use crate::source::StatusSource;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const SIGNER_TOKEN_HEADER: &str = "x-signer-token";

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub pipeline: RequestPipeline,
    pub cache: StatusCache,
    pub metrics: Arc<GatewayMetrics>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the pipeline and cache from validated configuration.
    pub fn new(
        config: Config,
        source: Arc<dyn StatusSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let metrics = Arc::new(GatewayMetrics::new()?);
        let limiter = Arc::new(
            RateLimiter::new(config.rate_limit.clone()).with_metrics(metrics.clone()),
        );
        let pipeline = RequestPipeline::new(&config, limiter, clock.clone(), metrics.clone())?;
        let cache = StatusCache::new(source, config.status.ttl(), config.status.fetch_timeout())
            .with_metrics(metrics.clone());

        Ok(Self {
            config,
            pipeline,
            cache,
            metrics,
            clock,
        })
    }
}

/// Generic `{ok:false, error}` body for handler-level failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: &'static str,
}

impl ErrorResponse {
    fn new(error: &'static str) -> Json<Self> {
        Json(Self { ok: false, error })
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Echo response for the webhook route.
#[derive(Debug, Serialize)]
pub struct HookResponse {
    pub ok: bool,
    pub data: Value,
}

/// Signing helper request.
#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub ts: String,
    /// A string is signed verbatim; any other JSON value is minified first.
    pub body: Value,
}

#[derive(Debug, Serialize)]
pub struct SignResponse {
    pub signature: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "status-gateway",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Cached status document with derived `status` and `stale` fields.
pub async fn front_status(State(state): State<Arc<AppState>>) -> Response {
    match state.cache.get_status(state.clock.now()).await {
        Ok(status) => {
            debug!(
                freshness = ?status.freshness,
                status = ?status.overall_status(),
                "Serving status"
            );
            Json(status.view()).into_response()
        }
        Err(err) => {
            error!(error = %err, "Status unavailable");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new("status_unavailable")).into_response()
        }
    }
}

/// Webhook sink. Reached only after the full pipeline has passed.
pub async fn hooks_ping(headers: HeaderMap, body: Bytes) -> Json<HookResponse> {
    let data = match serde_json::from_slice::<Value>(&body) {
        Ok(value) => value,
        Err(_) => {
            let content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            Value::String(canonical_payload(&body, content_type))
        }
    };
    Json(HookResponse { ok: true, data })
}

/// Compute a signature for a `(ts, body)` pair with the gateway secret.
///
/// Guarded by `X-Signer-Token` when a signer token is configured.
pub async fn hmac_sign(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SignRequest>,
) -> Response {
    if let Some(expected) = &state.config.security.signer_token {
        let provided = headers
            .get(SIGNER_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !token_matches(expected, provided) {
            warn!("Signer token rejected");
            return (StatusCode::FORBIDDEN, ErrorResponse::new("forbidden")).into_response();
        }
    }

    let Ok(ts) = req.ts.trim().parse::<i64>() else {
        return (StatusCode::BAD_REQUEST, ErrorResponse::new("bad timestamp")).into_response();
    };

    let payload = match &req.body {
        Value::String(raw) => raw.clone(),
        other => minify_json(other),
    };
    let signature = state.pipeline.verifier().sign(ts, &payload);
    Json(SignResponse { signature }).into_response()
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.metrics.content_type())],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new("metrics_unavailable")).into_response()
        }
    }
}

/// Compare digests so the check does not leak a matching prefix.
fn token_matches(expected: &HmacSecret, provided: &str) -> bool {
    !expected.is_empty() && Sha256::digest(expected.expose()) == Sha256::digest(provided.as_bytes())
}
