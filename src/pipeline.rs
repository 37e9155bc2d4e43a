// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Protected-route request pipeline.
//!
//! Stages run in a fixed order and the first rejection wins:
//!
//! 1. size       - declared `Content-Length` against the body limit (413)
//! 2. rate limit - sliding window per (identity, route) (429 + Retry-After)
//! 3. timestamp  - drift against the gateway clock (401 `bad timestamp`)
//! 4. signature  - HMAC over the canonical body (401 `bad signature`)
//!
//! Cheap header checks come first so a flood of junk never reaches the
//! body read or the MAC. An admitted request is billed against the rate
//! window even when a later stage rejects it.

use crate::clock::Clock;
use crate::config::Config;
use crate::error::ConfigError;
use crate::limiter::{client_identity, Admission, RateKey, RateLimiter};
use crate::metrics::GatewayMetrics;
use crate::signature::SignatureVerifier;
use crate::size::{SizeCheck, SizeGuard};
use crate::timestamp::{DriftCheck, TimestampGuard};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Primary timestamp header.
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";
/// Legacy alias for [`TIMESTAMP_HEADER`].
pub const TIMESTAMP_HEADER_ALT: &str = "x-axv-timestamp";
/// Primary signature header.
pub const SIGNATURE_HEADER: &str = "x-signature";
/// Legacy alias for [`SIGNATURE_HEADER`].
pub const SIGNATURE_HEADER_ALT: &str = "x-axv-signature";

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Pipeline stage, used for metric labels and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Size,
    RateLimit,
    Timestamp,
    Signature,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Size => "size",
            Stage::RateLimit => "rate_limit",
            Stage::Timestamp => "timestamp",
            Stage::Signature => "signature",
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    BodyTooLarge { limit_kb: u64 },
    RateLimited { limit: u32, retry_after_secs: u64 },
    BadTimestamp,
    BadSignature,
}

impl Rejection {
    pub fn stage(&self) -> Stage {
        match self {
            Rejection::BodyTooLarge { .. } => Stage::Size,
            Rejection::RateLimited { .. } => Stage::RateLimit,
            Rejection::BadTimestamp => Stage::Timestamp,
            Rejection::BadSignature => Stage::Signature,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Rejection::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Rejection::BadTimestamp | Rejection::BadSignature => StatusCode::UNAUTHORIZED,
        }
    }

    /// Value of the `error` field in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::BodyTooLarge { .. } => "body_too_large",
            Rejection::RateLimited { .. } => "rate_limited",
            Rejection::BadTimestamp => "bad timestamp",
            Rejection::BadSignature => "bad signature",
        }
    }

    pub fn body(&self) -> RejectionBody {
        let (limit_kb, retry_after_s) = match *self {
            Rejection::BodyTooLarge { limit_kb } => (Some(limit_kb), None),
            Rejection::RateLimited { retry_after_secs, .. } => (None, Some(retry_after_secs)),
            _ => (None, None),
        };
        RejectionBody {
            ok: false,
            error: self.code(),
            limit_kb,
            retry_after_s,
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RejectionBody {
    pub ok: bool,
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_kb: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_s: Option<u64>,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        if let Rejection::RateLimited { limit, retry_after_secs } = self {
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            headers.insert(HeaderName::from_static(RATE_LIMIT_LIMIT_HEADER), HeaderValue::from(limit));
            headers.insert(
                HeaderName::from_static(RATE_LIMIT_REMAINING_HEADER),
                HeaderValue::from_static("0"),
            );
        }
        response
    }
}

/// Terminal result of running the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Allow,
    Reject(Rejection),
}

impl From<Result<(), Rejection>> for PipelineOutcome {
    fn from(result: Result<(), Rejection>) -> Self {
        match result {
            Ok(()) => PipelineOutcome::Allow,
            Err(rejection) => PipelineOutcome::Reject(rejection),
        }
    }
}

/// What the pipeline needs from a request before the body is read.
#[derive(Debug, Clone, Copy)]
pub struct RequestHead<'a> {
    pub method: &'a Method,
    pub route: &'a str,
    pub headers: &'a HeaderMap,
    pub peer: Option<IpAddr>,
}

impl<'a> RequestHead<'a> {
    fn header(&self, primary: &str, alternate: &str) -> Option<&'a str> {
        self.headers
            .get(primary)
            .or_else(|| self.headers.get(alternate))
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_length(&self) -> Option<&'a str> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&'a str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn timestamp(&self) -> Option<&'a str> {
        self.header(TIMESTAMP_HEADER, TIMESTAMP_HEADER_ALT)
    }

    pub fn signature(&self) -> Option<&'a str> {
        self.header(SIGNATURE_HEADER, SIGNATURE_HEADER_ALT)
    }
}

/// State carried from the header stages to the signature stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screened {
    pub timestamp: i64,
    pub admission: Admission,
}

/// The four guards, wired in order.
pub struct RequestPipeline {
    size: SizeGuard,
    limiter: Arc<RateLimiter>,
    timestamps: TimestampGuard,
    verifier: SignatureVerifier,
    clock: Arc<dyn Clock>,
    identity_header: String,
    metrics: Arc<GatewayMetrics>,
}

impl RequestPipeline {
    /// Build the pipeline. Refuses to exist without a secret.
    pub fn new(
        config: &Config,
        limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
        metrics: Arc<GatewayMetrics>,
    ) -> Result<Self, ConfigError> {
        if config.security.hmac_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(Self {
            size: SizeGuard::new(config.security.max_body_kb),
            limiter,
            timestamps: TimestampGuard::new(config.security.max_drift_secs),
            verifier: SignatureVerifier::new(config.security.hmac_secret.clone()),
            clock,
            identity_header: config.rate_limit.identity_header.clone(),
            metrics,
        })
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    pub fn size_guard(&self) -> &SizeGuard {
        &self.size
    }

    /// Stage 1.
    pub fn check_size(&self, head: &RequestHead<'_>) -> Result<(), Rejection> {
        match self.size.check(head.method, head.content_length()) {
            SizeCheck::Allowed => Ok(()),
            SizeCheck::TooLarge { declared, max_bytes } => {
                debug!(route = head.route, declared, max_bytes, "Declared body too large");
                Err(self.body_too_large(head.route))
            }
        }
    }

    /// Stage 2. Also used on its own for unprotected, rate-limited routes.
    pub async fn check_rate(&self, head: &RequestHead<'_>) -> Result<Admission, Rejection> {
        let identity = client_identity(head.headers, head.peer, &self.identity_header);
        let key = RateKey::new(identity, head.route);
        match self.limiter.admit(&key, self.clock.now()).await {
            Admission::Limited { limit, retry_after_secs } => {
                Err(self.record(head.route, Rejection::RateLimited { limit, retry_after_secs }))
            }
            admission => Ok(admission),
        }
    }

    /// Stage 3. Returns the parsed timestamp.
    pub fn check_timestamp(&self, head: &RequestHead<'_>) -> Result<i64, Rejection> {
        match self.timestamps.check(self.clock.unix_time(), head.timestamp()) {
            DriftCheck::Allowed(ts) => Ok(ts),
            DriftCheck::Rejected(reason) => {
                debug!(route = head.route, %reason, "Timestamp rejected");
                Err(self.record(head.route, Rejection::BadTimestamp))
            }
        }
    }

    /// Stage 4.
    pub fn check_signature(
        &self,
        head: &RequestHead<'_>,
        timestamp: i64,
        body: &[u8],
    ) -> Result<(), Rejection> {
        let Some(provided) = head.signature() else {
            debug!(route = head.route, "Signature header missing");
            return Err(self.record(head.route, Rejection::BadSignature));
        };

        if self.verifier.verify_body(timestamp, body, head.content_type(), provided) {
            Ok(())
        } else {
            Err(self.record(head.route, Rejection::BadSignature))
        }
    }

    /// Stages 1 to 3: everything that only needs headers.
    pub async fn screen(&self, head: &RequestHead<'_>) -> Result<Screened, Rejection> {
        self.check_size(head)?;
        let admission = self.check_rate(head).await?;
        let timestamp = self.check_timestamp(head)?;
        Ok(Screened { timestamp, admission })
    }

    /// All four stages over an already-buffered body.
    pub async fn evaluate(&self, head: &RequestHead<'_>, body: &[u8]) -> PipelineOutcome {
        let result = async {
            let screened = self.screen(head).await?;
            self.check_signature(head, screened.timestamp, body)
        }
        .await;
        result.into()
    }

    /// 413 for a body that turned out larger than declared while streaming.
    pub fn body_too_large(&self, route: &str) -> Rejection {
        self.record(
            route,
            Rejection::BodyTooLarge {
                limit_kb: self.size.limit_kb(),
            },
        )
    }

    fn record(&self, route: &str, rejection: Rejection) -> Rejection {
        let stage = rejection.stage();
        self.metrics
            .rejections
            .with_label_values(&[stage.as_str(), route])
            .inc();
        info!(
            route,
            stage = stage.as_str(),
            status = rejection.status().as_u16(),
            error = rejection.code(),
            "Request rejected"
        );
        rejection
    }
}
