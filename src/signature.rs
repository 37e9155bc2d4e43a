// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HMAC-SHA256 webhook signatures.
//!
//! Signatures cover the canonical message `"{timestamp}.{payload}"` where
//! the payload is the request body in canonical form:
//! - JSON bodies are re-serialized minified, keeping key order
//! - anything else (and JSON that fails to parse) is the body decoded as UTF-8
//!
//! Signer and verifier must canonicalize identically, so callers that sign
//! outside this crate should follow [`canonical_payload`] exactly.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Prefix carried by rendered signatures.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Shared HMAC secret. Never printed.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HmacSecret(String);

impl HmacSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw key bytes. Keep out of logs.
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for HmacSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Whether a Content-Type header names a JSON media type.
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(ct) = content_type else {
        return false;
    };
    let media = ct.split(';').next().unwrap_or(ct).trim().to_ascii_lowercase();
    media == "application/json" || (media.starts_with("application/") && media.ends_with("+json"))
}

/// Canonical form of a request body.
pub fn canonical_payload(body: &[u8], content_type: Option<&str>) -> String {
    if is_json_content_type(content_type) {
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(value) => return minify_json(&value),
            Err(e) => debug!(error = %e, "JSON body did not parse, signing raw text"),
        }
    }
    String::from_utf8_lossy(body).into_owned()
}

/// Minified JSON with the document's own key order.
pub fn minify_json(value: &serde_json::Value) -> String {
    // Serializing a Value cannot fail: keys are always strings.
    serde_json::to_string(value).unwrap_or_default()
}

/// The exact string the MAC is computed over.
pub fn canonical_message(timestamp: i64, canonical_payload: &str) -> String {
    format!("{timestamp}.{canonical_payload}")
}

fn mac_for(secret: &[u8], timestamp: i64, canonical_payload: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(canonical_message(timestamp, canonical_payload).as_bytes());
    Some(mac)
}

/// Compute `"sha256=<lowercase hex>"` over the canonical message.
pub fn sign(secret: &[u8], timestamp: i64, canonical_payload: &str) -> String {
    let digest = mac_for(secret, timestamp, canonical_payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("{SIGNATURE_PREFIX}{digest}")
}

/// Check a caller-supplied signature.
///
/// Accepts the signature with or without the `sha256=` prefix. An empty
/// secret, non-hex input, or a digest of the wrong length all yield `false`.
/// The digest comparison is constant-time.
pub fn verify(secret: &[u8], timestamp: i64, canonical_payload: &str, provided: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    let provided = provided.trim();
    let hex_part = provided.strip_prefix(SIGNATURE_PREFIX).unwrap_or(provided);
    let Ok(expected) = hex::decode(hex_part) else {
        return false;
    };

    match mac_for(secret, timestamp, canonical_payload) {
        Some(mac) => mac.verify_slice(&expected).is_ok(),
        None => false,
    }
}

/// Verifier bound to the deployment's shared secret.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: HmacSecret,
}

impl SignatureVerifier {
    pub fn new(secret: HmacSecret) -> Self {
        Self { secret }
    }

    pub fn sign(&self, timestamp: i64, canonical_payload: &str) -> String {
        sign(self.secret.expose(), timestamp, canonical_payload)
    }

    pub fn verify(&self, timestamp: i64, canonical_payload: &str, provided: &str) -> bool {
        verify(self.secret.expose(), timestamp, canonical_payload, provided)
    }

    /// Canonicalize a raw body and verify it in one step.
    pub fn verify_body(
        &self,
        timestamp: i64,
        body: &[u8],
        content_type: Option<&str>,
        provided: &str,
    ) -> bool {
        let payload = canonical_payload(body, content_type);
        self.verify(timestamp, &payload, provided)
    }
}
