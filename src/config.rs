// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the status gateway.
//!
//! Read once at startup from the environment. Numeric values that do not
//! parse are errors, not silent defaults, and a missing HMAC secret stops
//! the process before it binds.

use crate::error::ConfigError;
use crate::signature::HmacSecret;
use crate::timestamp::DEFAULT_MAX_DRIFT_SECS;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for the gateway service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Webhook authentication and body limits
    #[serde(default)]
    pub security: SecurityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Status cache configuration
    #[serde(default)]
    pub status: StatusConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Webhook authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared HMAC secret. Never serialized.
    #[serde(skip)]
    pub hmac_secret: HmacSecret,

    /// Maximum allowed |now - timestamp| in seconds (default: 300)
    #[serde(default = "default_max_drift_secs")]
    pub max_drift_secs: u64,

    /// Maximum declared body size in kilobytes (default: 64)
    #[serde(default = "default_max_body_kb")]
    pub max_body_kb: u64,

    /// Token required by the internal signer route; `None` leaves it open.
    #[serde(skip)]
    pub signer_token: Option<HmacSecret>,
}

/// Sliding-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per window for ordinary routes (default: 60, 0 disables)
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Requests per window for webhook routes (default: 5, 0 disables)
    #[serde(default = "default_hooks_limit")]
    pub hooks_limit: u32,

    /// Window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Header carrying the client identity; empty uses the peer address
    #[serde(default)]
    pub identity_header: String,

    /// Path prefix that marks webhook routes (default: /hooks/)
    #[serde(default = "default_hooks_prefix")]
    pub hooks_prefix: String,
}

/// Status cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// File path or http(s) URL of the upstream status document
    #[serde(default = "default_status_source")]
    pub source: String,

    /// Freshness window in seconds (default: 60)
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Upstream fetch timeout in milliseconds (default: 2000)
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_drift_secs() -> u64 {
    DEFAULT_MAX_DRIFT_SECS
}

fn default_max_body_kb() -> u64 {
    64
}

fn default_limit() -> u32 {
    60
}

fn default_hooks_limit() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    60
}

fn default_hooks_prefix() -> String {
    "/hooks/".to_string()
}

fn default_status_source() -> String {
    "data/status.stub.json".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_fetch_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            security: SecurityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            status: StatusConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            hmac_secret: HmacSecret::default(),
            max_drift_secs: default_max_drift_secs(),
            max_body_kb: default_max_body_kb(),
            signer_token: None,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            hooks_limit: default_hooks_limit(),
            window_secs: default_window_secs(),
            identity_header: String::new(),
            hooks_prefix: default_hooks_prefix(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            source: default_status_source(),
            cache_ttl_secs: default_cache_ttl_secs(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

/// Longest accepted rate window (one day).
pub const MAX_WINDOW_SECS: u64 = 86_400;

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl SecurityConfig {
    /// Body limit in bytes.
    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_kb.saturating_mul(1024)
    }
}

impl StatusConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |names: &[&'static str]| -> Option<(&'static str, String)> {
            names.iter().find_map(|name| {
                lookup(*name)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(|v| (*name, v))
            })
        };

        let secret = var(&["HMAC_SECRET", "AXV_HMAC_SECRET"])
            .map(|(_, v)| HmacSecret::new(v))
            .ok_or(ConfigError::MissingSecret)?;

        let config = Config {
            bind_addr: var(&["BIND_ADDR"])
                .map(|(_, v)| v)
                .unwrap_or_else(default_bind_addr),
            security: SecurityConfig {
                hmac_secret: secret,
                max_drift_secs: parse(var(&["HMAC_MAX_DRIFT_S", "HMAC_MAX_SKEW_S"]), default_max_drift_secs())?,
                max_body_kb: parse(var(&["MAX_BODY_KB"]), default_max_body_kb())?,
                signer_token: var(&["INTERNAL_SIGNER_TOKEN"]).map(|(_, v)| HmacSecret::new(v)),
            },
            rate_limit: RateLimitConfig {
                default_limit: parse(var(&["RATE_LIMIT_DEFAULT"]), default_limit())?,
                hooks_limit: parse(var(&["RATE_LIMIT_HOOKS"]), default_hooks_limit())?,
                window_secs: parse(var(&["RATE_LIMIT_WINDOW_S"]), default_window_secs())?,
                identity_header: var(&["RATE_LIMIT_KEY_HEADER"])
                    .map(|(_, v)| v)
                    .unwrap_or_default(),
                hooks_prefix: default_hooks_prefix(),
            },
            status: StatusConfig {
                source: var(&["STATUS_SOURCE"])
                    .map(|(_, v)| v)
                    .unwrap_or_else(default_status_source),
                cache_ttl_secs: parse(var(&["STATUS_CACHE_TTL_S"]), default_cache_ttl_secs())?,
                fetch_timeout_ms: parse(var(&["STATUS_FETCH_TIMEOUT_MS"]), default_fetch_timeout_ms())?,
            },
            metrics: MetricsConfig {
                enabled: parse_bool(var(&["METRICS_ENABLED"]), default_true())?,
                path: default_metrics_path(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.hmac_secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::OutOfRange {
                var: "RATE_LIMIT_WINDOW_S",
                reason: "window must be at least 1 second",
            });
        }
        if self.rate_limit.window_secs > MAX_WINDOW_SECS {
            return Err(ConfigError::OutOfRange {
                var: "RATE_LIMIT_WINDOW_S",
                reason: "window must be at most 86400 seconds",
            });
        }
        if self.security.max_body_kb == 0 {
            return Err(ConfigError::OutOfRange {
                var: "MAX_BODY_KB",
                reason: "body limit must be at least 1 KB",
            });
        }
        if self.status.fetch_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange {
                var: "STATUS_FETCH_TIMEOUT_MS",
                reason: "fetch timeout must be positive",
            });
        }
        Ok(())
    }
}

fn parse<T: FromStr>(found: Option<(&'static str, String)>, default: T) -> Result<T, ConfigError> {
    match found {
        None => Ok(default),
        Some((var, value)) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn parse_bool(found: Option<(&'static str, String)>, default: bool) -> Result<bool, ConfigError> {
    match found {
        None => Ok(default),
        Some((var, value)) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { var, value }),
        },
    }
}
