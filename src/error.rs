// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the status gateway.
//!
//! Request-level rejections (size, rate, timestamp, signature) are not
//! errors; they are [`crate::pipeline::PipelineOutcome`] values. What lives
//! here is startup misconfiguration and upstream status failures.

use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HMAC secret is not set (HMAC_SECRET); refusing to serve protected routes")]
    MissingSecret,

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Out of range value for {var}: {reason}")]
    OutOfRange { var: &'static str, reason: &'static str },
}

/// Failure to obtain a status document from upstream.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to read status source {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Status document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Status document rejected: {0}")]
    Invalid(String),
}

/// Status route failure. Only raised when the upstream fails and nothing
/// has ever been cached.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Status unavailable: {0}")]
    Unavailable(#[source] FetchError),
}

/// Top-level error for process startup.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Invalid bind address {addr}: {source}")]
    BindAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
