// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Status Gateway
//!
//! A small API gateway in front of a status-reporting service:
//!
//! - HMAC-SHA256 webhook signatures over a canonical `"{ts}.{payload}"`
//!   message, compared in constant time
//! - Timestamp drift enforcement (±300s default)
//! - Sliding-window rate limiting per (client, route), stricter on hooks
//! - Declared body size limits on POST/PUT/PATCH
//! - A TTL-cached status document that serves stale data when upstream
//!   fails, and reports `degraded` when any service is not `ok`

pub mod app;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod signature;
pub mod size;
pub mod source;
pub mod status;
pub mod timestamp;

pub use app::router;
pub use cache::{CachedStatus, Freshness, StatusCache};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::Config;
pub use error::{ConfigError, FetchError, GatewayError, StatusError};
pub use handlers::AppState;
pub use limiter::{Admission, RateKey, RateLimiter};
pub use pipeline::{PipelineOutcome, Rejection, RequestPipeline};
pub use signature::{HmacSecret, SignatureVerifier};
pub use size::SizeGuard;
pub use source::{FileStatusSource, HttpStatusSource, StaticStatusSource, StatusSource};
pub use status::{OverallStatus, ServiceState, StatusDocument};
pub use timestamp::TimestampGuard;
