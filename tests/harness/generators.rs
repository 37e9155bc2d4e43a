// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Test data generators for attack simulation.

use axum::http::{header, HeaderMap, HeaderValue};
use status_gateway::pipeline::{SIGNATURE_HEADER, TIMESTAMP_HEADER};
use status_gateway::signature::{canonical_payload, sign};
use std::net::{IpAddr, Ipv4Addr};

pub const SECRET: &str = "harness-secret";
pub const JSON: &str = "application/json";

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// A small webhook body, distinct per index.
pub fn ping_body(i: usize) -> String {
    format!(r#"{{"source":"harness","seq":{},"ping":true}}"#, i)
}

/// Signature the gateway expects for `body` at `ts`.
pub fn signature_for(ts: i64, body: &str) -> String {
    let payload = canonical_payload(body.as_bytes(), Some(JSON));
    sign(SECRET.as_bytes(), ts, &payload)
}

/// Headers of a correctly signed JSON request.
pub fn signed_headers(ts: i64, body: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    headers.insert(TIMESTAMP_HEADER, HeaderValue::from(ts));
    headers.insert(
        SIGNATURE_HEADER,
        HeaderValue::from_str(&signature_for(ts, body)).unwrap(),
    );
    headers
}

/// Variations on a valid signature that must all fail verification.
pub fn generate_forged_signatures(valid: &str) -> Vec<String> {
    let hex = valid.trim_start_matches("sha256=");
    let mut flipped_last = hex.to_string();
    let last = if hex.ends_with('0') { "1" } else { "0" };
    flipped_last.replace_range(hex.len() - 1.., last);
    let mut flipped_first = hex.to_string();
    let first = if hex.starts_with('0') { "1" } else { "0" };
    flipped_first.replace_range(..1, first);

    vec![
        String::new(),
        "sha256=".to_string(),
        format!("sha256={}", flipped_last),
        format!("sha256={}", flipped_first),
        format!("sha256={}", &hex[..hex.len() - 2]),
        format!("sha256={}00", hex),
        format!("sha1={}", hex),
        format!("sha256=sha256={}", hex),
        "sha256=zzzz".to_string(),
        format!("sha256={}", "0".repeat(64)),
        signature_for(0, "{}"),
    ]
}

/// Timestamp header values that can never be accepted.
pub fn generate_malformed_timestamps() -> Vec<&'static str> {
    vec![
        "",
        "   ",
        "abc",
        "1.5",
        "0x10",
        "-",
        "1e9",
        "99999999999999999999999999",
        "-99999999999999999999999999",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_forged_signatures_differ_from_valid() {
        let valid = signature_for(1_700_000_000, &ping_body(0));
        for forged in generate_forged_signatures(&valid) {
            assert_ne!(forged, valid);
        }
    }
}
