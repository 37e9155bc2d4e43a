// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Attack simulation patterns for security testing.

use std::time::Duration;

/// Attack pattern configuration.
///
/// Time is simulated: the harness advances a mock clock by `interval`
/// after each request, so patterns spanning minutes run instantly.
#[derive(Debug, Clone)]
pub struct AttackConfig {
    /// Total number of requests to send
    pub total_requests: usize,
    /// Simulated time between consecutive requests
    pub interval: Duration,
    /// Number of distinct client addresses
    pub unique_clients: usize,
    /// Share of requests carrying a forged signature (0.0-1.0)
    pub forged_ratio: f64,
    /// Share of requests replaying an hour-old timestamp (0.0-1.0)
    pub replay_ratio: f64,
    /// Share of requests declaring an oversized body (0.0-1.0)
    pub oversized_ratio: f64,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            total_requests: 100,
            interval: Duration::from_millis(100),
            unique_clients: 1,
            forged_ratio: 0.0,
            replay_ratio: 0.0,
            oversized_ratio: 0.0,
        }
    }
}

/// Predefined attack patterns.
impl AttackConfig {
    /// Single client flood with valid signatures.
    pub fn single_client_flood() -> Self {
        Self {
            total_requests: 200,
            interval: Duration::from_millis(10),
            unique_clients: 1,
            ..Default::default()
        }
    }

    /// Many clients, each staying exactly at the hooks limit.
    pub fn distributed_flood() -> Self {
        Self {
            total_requests: 500,
            interval: Duration::from_millis(10),
            unique_clients: 100,
            ..Default::default()
        }
    }

    /// Every request carries a forged signature.
    pub fn forged_signatures() -> Self {
        Self {
            total_requests: 50,
            unique_clients: 10,
            forged_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Captured requests replayed an hour later.
    pub fn replay_attack() -> Self {
        Self {
            total_requests: 50,
            unique_clients: 10,
            replay_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Pathological payload sizes.
    pub fn oversized_bodies() -> Self {
        Self {
            total_requests: 50,
            unique_clients: 1,
            oversized_ratio: 1.0,
            ..Default::default()
        }
    }

    /// Slow drip - one request every 13s stays under 5 per minute.
    pub fn slow_drip() -> Self {
        Self {
            total_requests: 30,
            interval: Duration::from_secs(13),
            unique_clients: 1,
            ..Default::default()
        }
    }

    /// Half the traffic forged, spread over a few clients.
    pub fn mixed() -> Self {
        Self {
            total_requests: 40,
            interval: Duration::from_secs(15),
            unique_clients: 4,
            forged_ratio: 0.5,
            ..Default::default()
        }
    }

    /// Simulated duration of the whole attack.
    pub fn simulated_duration(&self) -> Duration {
        self.interval * self.total_requests as u32
    }
}

/// Expected outcomes for different attack types.
pub struct AttackExpectations {
    /// Maximum ratio of requests that should be allowed
    pub max_allowed_ratio: f64,
    /// Description of expected behavior
    pub description: &'static str,
}

impl AttackConfig {
    /// Get expected outcomes for this attack pattern.
    pub fn expectations(&self) -> AttackExpectations {
        if self.oversized_ratio >= 1.0 {
            AttackExpectations {
                max_allowed_ratio: 0.0,
                description: "All requests should fail the size guard",
            }
        } else if self.replay_ratio >= 1.0 {
            AttackExpectations {
                max_allowed_ratio: 0.0,
                description: "All requests should fail the timestamp guard",
            }
        } else if self.forged_ratio >= 1.0 {
            AttackExpectations {
                max_allowed_ratio: 0.0,
                description: "All requests should fail signature verification",
            }
        } else if self.unique_clients == 1 && self.interval < Duration::from_secs(12) {
            AttackExpectations {
                max_allowed_ratio: 0.05,
                description: "Single client should be capped by the hooks limit",
            }
        } else {
            AttackExpectations {
                max_allowed_ratio: 1.0,
                description: "Traffic within limits should pass",
            }
        }
    }
}

/// Deterministic "random" choice based on index and ratio.
pub fn pick(ratio: f64, index: usize) -> bool {
    if ratio >= 1.0 {
        true
    } else if ratio <= 0.0 {
        false
    } else {
        (index as f64 * 0.618033988749895) % 1.0 < ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_extremes() {
        assert!((0..100).all(|i| pick(1.0, i)));
        assert!((0..100).all(|i| !pick(0.0, i)));
    }

    #[test]
    fn test_pick_ratio_is_roughly_honoured() {
        let hits = (0..1000).filter(|&i| pick(0.5, i)).count();
        assert!((400..=600).contains(&hits), "hits = {}", hits);
    }
}
