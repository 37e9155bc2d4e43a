// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Property tests for signatures, canonicalization and drift.

use proptest::prelude::*;
use serde_json::Value;
use status_gateway::signature::{canonical_payload, sign, verify, SIGNATURE_PREFIX};
use status_gateway::timestamp::{check_drift, DriftCheck, DEFAULT_MAX_DRIFT_SECS};

// Strategy: non-empty printable secrets
fn arb_secret() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{1,48}").unwrap()
}

// Strategy: JSON without floats, which do not always survive a text round trip
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<String>().prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((any::<String>(), inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

proptest! {
    /// Property: whatever we sign verifies under the same inputs
    #[test]
    fn proptest_sign_then_verify(
        secret in arb_secret(),
        ts in any::<i64>(),
        payload in any::<String>()
    ) {
        let sig = sign(secret.as_bytes(), ts, &payload);
        prop_assert!(sig.starts_with(SIGNATURE_PREFIX));
        prop_assert!(verify(secret.as_bytes(), ts, &payload, &sig));
        prop_assert!(verify(secret.as_bytes(), ts, &payload, &sig[SIGNATURE_PREFIX.len()..]));
    }

    /// Property: no proper prefix of a valid signature verifies
    #[test]
    fn proptest_truncated_signature_never_verifies(
        secret in arb_secret(),
        ts in any::<i64>(),
        payload in any::<String>()
    ) {
        let sig = sign(secret.as_bytes(), ts, &payload);
        for end in 0..sig.len() {
            prop_assert!(
                !verify(secret.as_bytes(), ts, &payload, &sig[..end]),
                "prefix of length {} verified", end
            );
        }
    }

    /// Property: a signature for other inputs is refused
    #[test]
    fn proptest_mismatched_inputs_never_verify(
        secret in arb_secret(),
        other_secret in arb_secret(),
        ts in any::<i64>(),
        payload in any::<String>(),
        other_payload in any::<String>()
    ) {
        let sig = sign(secret.as_bytes(), ts, &payload);
        if other_payload != payload {
            prop_assert!(!verify(secret.as_bytes(), ts, &other_payload, &sig));
        }
        if other_secret != secret {
            prop_assert!(!verify(other_secret.as_bytes(), ts, &payload, &sig));
        }
        prop_assert!(!verify(secret.as_bytes(), ts.wrapping_add(1), &payload, &sig));
    }

    /// Property: flipping any single hex digit breaks the signature
    #[test]
    fn proptest_altered_digit_never_verifies(
        secret in arb_secret(),
        ts in any::<i64>(),
        payload in any::<String>(),
        index in 0usize..64
    ) {
        let sig = sign(secret.as_bytes(), ts, &payload);
        let mut digits: Vec<char> = sig[SIGNATURE_PREFIX.len()..].chars().collect();
        digits[index] = if digits[index] == '0' { '1' } else { '0' };
        let altered: String = digits.into_iter().collect();
        prop_assert!(!verify(secret.as_bytes(), ts, &payload, &altered));
    }

    /// Property: compact and pretty renderings canonicalize identically
    #[test]
    fn proptest_json_whitespace_is_ignored(value in arb_json()) {
        let compact = serde_json::to_string(&value).unwrap();
        let pretty = serde_json::to_string_pretty(&value).unwrap();

        let from_compact = canonical_payload(compact.as_bytes(), Some("application/json"));
        let from_pretty = canonical_payload(pretty.as_bytes(), Some("application/json"));

        prop_assert_eq!(&from_compact, &from_pretty);
        prop_assert_eq!(&from_compact, &compact);
    }

    /// Property: drift is accepted exactly within the inclusive window
    #[test]
    fn proptest_drift_window_is_inclusive(
        now in -4_000_000_000i64..4_000_000_000,
        offset in -1_000i64..1_000
    ) {
        let claimed = (now + offset).to_string();
        let accepted = matches!(
            check_drift(now, Some(&claimed), DEFAULT_MAX_DRIFT_SECS),
            DriftCheck::Allowed(_)
        );
        prop_assert_eq!(accepted, offset.unsigned_abs() <= DEFAULT_MAX_DRIFT_SECS);
    }
}
