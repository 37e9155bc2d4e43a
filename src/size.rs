// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Declared request-size pre-check.
//!
//! Only state-changing methods are checked, and only against the declared
//! `Content-Length`. A missing or unparseable header passes; streaming
//! enforcement happens when the pipeline buffers the body.

use axum::http::Method;

/// Result of a size check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCheck {
    Allowed,
    TooLarge { declared: u64, max_bytes: u64 },
}

/// Methods whose bodies are checked.
pub fn carries_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Check a declared content length against `max_bytes`.
pub fn check_size(method: &Method, declared_content_length: Option<&str>, max_bytes: u64) -> SizeCheck {
    if !carries_body(method) {
        return SizeCheck::Allowed;
    }

    match declared_content_length.and_then(|v| v.trim().parse::<u64>().ok()) {
        Some(declared) if declared > max_bytes => SizeCheck::TooLarge { declared, max_bytes },
        _ => SizeCheck::Allowed,
    }
}

/// Size guard with a limit configured in kilobytes.
#[derive(Debug, Clone, Copy)]
pub struct SizeGuard {
    limit_kb: u64,
}

impl SizeGuard {
    pub fn new(limit_kb: u64) -> Self {
        Self { limit_kb }
    }

    pub fn limit_kb(&self) -> u64 {
        self.limit_kb
    }

    pub fn max_bytes(&self) -> u64 {
        self.limit_kb.saturating_mul(1024)
    }

    pub fn check(&self, method: &Method, declared_content_length: Option<&str>) -> SizeCheck {
        check_size(method, declared_content_length, self.max_bytes())
    }
}
