// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Time sources for the gateway.
//!
//! Two readings are needed: a monotonic instant for rate windows and cache
//! age, and wall-clock epoch seconds for comparing against the timestamp a
//! webhook caller claims. [`SystemClock`] serves production, [`MockClock`]
//! lets tests move time by hand.

use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Monotonic reading used for windows and TTLs.
    fn now(&self) -> Instant;

    /// Wall-clock seconds since the Unix epoch.
    fn unix_time(&self) -> i64;
}

/// System clock backed by `Instant::now()` and `SystemTime::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_time(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests.
///
/// Both readings move together: advancing by 61s moves the monotonic
/// instant and the epoch reading by the same amount.
#[derive(Debug)]
pub struct MockClock {
    base: Instant,
    unix_base: i64,
    offset: Mutex<Duration>,
}

impl MockClock {
    /// Create a clock whose wall-clock reading starts at `unix_base`.
    pub fn new(unix_base: i64) -> Self {
        Self {
            base: Instant::now(),
            unix_base,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }

    fn offset(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.base + self.offset()
    }

    fn unix_time(&self) -> i64 {
        self.unix_base + self.offset().as_secs() as i64
    }
}
