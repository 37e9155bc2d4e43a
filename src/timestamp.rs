// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Timestamp drift guard.
//!
//! The timestamp header is attacker-supplied. It is only trusted once it is
//! within `max_drift_secs` of the gateway's own clock, in either direction.

use tracing::debug;

/// Default allowed drift (5 minutes).
pub const DEFAULT_MAX_DRIFT_SECS: u64 = 300;

/// Result of a drift check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftCheck {
    /// Timestamp is usable; carries the parsed value.
    Allowed(i64),
    /// Timestamp is missing, malformed or too far from now.
    Rejected(DriftRejection),
}

/// Why a timestamp was refused. Diagnostics only; callers see one
/// `bad timestamp` response for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftRejection {
    Missing,
    Malformed,
    TooOld { drift_secs: u64 },
    TooNew { drift_secs: u64 },
}

impl std::fmt::Display for DriftRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "timestamp missing"),
            Self::Malformed => write!(f, "timestamp not an integer"),
            Self::TooOld { drift_secs } => write!(f, "timestamp {drift_secs}s in the past"),
            Self::TooNew { drift_secs } => write!(f, "timestamp {drift_secs}s in the future"),
        }
    }
}

/// Check a claimed timestamp against `now`.
///
/// A drift of exactly `max_drift_secs` is accepted.
pub fn check_drift(now: i64, claimed: Option<&str>, max_drift_secs: u64) -> DriftCheck {
    let Some(raw) = claimed else {
        return DriftCheck::Rejected(DriftRejection::Missing);
    };

    let Ok(ts) = raw.trim().parse::<i64>() else {
        debug!(raw = %raw, "timestamp not parseable");
        return DriftCheck::Rejected(DriftRejection::Malformed);
    };

    let delta = i128::from(now) - i128::from(ts);
    let drift_secs = u64::try_from(delta.unsigned_abs()).unwrap_or(u64::MAX);
    if drift_secs <= max_drift_secs {
        return DriftCheck::Allowed(ts);
    }

    let rejection = if delta > 0 {
        DriftRejection::TooOld { drift_secs }
    } else {
        DriftRejection::TooNew { drift_secs }
    };
    debug!(%rejection, max_drift_secs, "timestamp outside drift window");
    DriftCheck::Rejected(rejection)
}

/// Drift guard configured once per deployment.
#[derive(Debug, Clone, Copy)]
pub struct TimestampGuard {
    max_drift_secs: u64,
}

impl Default for TimestampGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DRIFT_SECS)
    }
}

impl TimestampGuard {
    pub fn new(max_drift_secs: u64) -> Self {
        Self { max_drift_secs }
    }

    pub fn max_drift_secs(&self) -> u64 {
        self.max_drift_secs
    }

    pub fn check(&self, now: i64, claimed: Option<&str>) -> DriftCheck {
        check_drift(now, claimed, self.max_drift_secs)
    }
}
