// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Router assembly.
//!
//! | route                 | guard                         |
//! |-----------------------|-------------------------------|
//! | `/health`, `/healthz` | none                          |
//! | `/metrics`            | none                          |
//! | `/front/status`       | rate limit (default class)    |
//! | `/internal/hmac-sign` | size, rate limit              |
//! | `/hooks/ping`         | size, rate, timestamp, HMAC   |

use crate::handlers::{front_status, health, hmac_sign, hooks_ping, metrics, AppState};
use crate::middleware::{max_body_bytes, protect, rate_limit, request_id, size_limit};
use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    // `protect` already buffers the body under the configured limit.
    let protected = Router::new()
        .route("/hooks/ping", post(hooks_ping))
        .route_layer(from_fn_with_state(state.clone(), protect))
        .layer(DefaultBodyLimit::disable());

    // Outermost route layer runs first: size, then rate.
    let limited = Router::new()
        .route("/front/status", get(front_status))
        .route("/internal/hmac-sign", post(hmac_sign))
        .route_layer(from_fn_with_state(state.clone(), rate_limit))
        .route_layer(from_fn_with_state(state.clone(), size_limit))
        .layer(DefaultBodyLimit::max(max_body_bytes(&state)));

    let mut open = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health));
    if state.config.metrics.enabled {
        open = open.route(&state.config.metrics.path, get(metrics));
    }

    Router::new()
        .merge(protected)
        .merge(limited)
        .merge(open)
        .layer(from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
