// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Axum middleware around the request pipeline.
//!
//! - [`protect`] runs all four stages, buffering the body between the
//!   header stages and the signature check.
//! - [`size_limit`] runs only the size stage.
//! - [`rate_limit`] runs only the rate stage, for public read routes.
//! - [`request_id`] tags every request and response with `X-Request-ID`.

use crate::handlers::AppState;
use crate::limiter::Admission;
use crate::pipeline::{RequestHead, RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER};
use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied request id that is echoed back.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Route template if the router matched one, else the raw path.
fn route_of(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

fn peer_ip(request: &Request) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

fn apply_rate_headers(response: &mut Response, admission: Admission) {
    if let Admission::Allowed { limit, remaining } = admission {
        let headers = response.headers_mut();
        headers.insert(HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER), HeaderValue::from(limit));
        headers.insert(
            HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
            HeaderValue::from(remaining),
        );
    }
}

/// Full pipeline for signed webhook routes.
///
/// Every request is timed into `gw_hooks_duration_ms`, rejected or not.
pub async fn protect(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let route = route_of(&request);

    let response = screen_and_run(&state, &route, request, next).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    state.metrics.hooks_duration_ms.observe(elapsed_ms);
    if response.status().as_u16() < 400 {
        state.metrics.hooks_ok.with_label_values(&[route.as_str()]).inc();
    }
    response
}

async fn screen_and_run(state: &AppState, route: &str, request: Request, next: Next) -> Response {
    let peer = peer_ip(&request);
    let (parts, body) = request.into_parts();
    let pipeline = &state.pipeline;

    let head = RequestHead {
        method: &parts.method,
        route,
        headers: &parts.headers,
        peer,
    };

    let screened = match pipeline.screen(&head).await {
        Ok(screened) => screened,
        Err(rejection) => return rejection.into_response(),
    };

    // The declared length may be absent or understated; cap what we read.
    let bytes = match axum::body::to_bytes(body, max_body_bytes(state)).await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(route, error = %err, "Body read failed or exceeded limit");
            return pipeline.body_too_large(route).into_response();
        }
    };

    if let Err(rejection) = pipeline.check_signature(&head, screened.timestamp, &bytes) {
        return rejection.into_response();
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let mut response = next.run(request).await;
    apply_rate_headers(&mut response, screened.admission);
    response
}

/// Configured body limit as a buffer size.
pub(crate) fn max_body_bytes(state: &AppState) -> usize {
    usize::try_from(state.pipeline.size_guard().max_bytes()).unwrap_or(usize::MAX)
}

/// Size stage only, for unsigned routes that still take a body.
pub async fn size_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let route = route_of(&request);
    let head = RequestHead {
        method: request.method(),
        route: &route,
        headers: request.headers(),
        peer: peer_ip(&request),
    };

    if let Err(rejection) = state.pipeline.check_size(&head) {
        return rejection.into_response();
    }
    next.run(request).await
}

/// Rate stage only, for routes that take no signed body.
pub async fn rate_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let route = route_of(&request);
    let head = RequestHead {
        method: request.method(),
        route: &route,
        headers: request.headers(),
        peer: peer_ip(&request),
    };

    let admission = match state.pipeline.check_rate(&head).await {
        Ok(admission) => admission,
        Err(rejection) => return rejection.into_response(),
    };

    let mut response = next.run(request).await;
    apply_rate_headers(&mut response, admission);
    response
}

/// Echo a sane caller-supplied `X-Request-ID` or mint one, and log the
/// completed request under it.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let value = HeaderValue::from_str(&id).unwrap_or_else(|_| HeaderValue::from_static("invalid"));
    request
        .headers_mut()
        .insert(HeaderName::from_static(REQUEST_ID_HEADER), value.clone());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = peer_ip(&request);

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);

    info!(
        request_id = %id,
        method = %method,
        path = %path,
        client = ?client,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );
    response
}
