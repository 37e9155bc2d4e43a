// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Status document served on `/front/status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// State of one upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Ok,
    Warn,
    Down,
    Unknown,
}

/// One entry of the service list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub id: String,
    pub label: String,
    pub state: ServiceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Upstream status document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    pub updated_at: DateTime<Utc>,
    pub services: Vec<ServiceStatus>,
}

/// Overall status derived for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Degraded,
}

impl StatusDocument {
    /// Structural checks beyond what the JSON shape enforces.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for service in &self.services {
            if service.id.trim().is_empty() {
                return Err("service with empty id".to_string());
            }
            if !seen.insert(service.id.as_str()) {
                return Err(format!("duplicate service id {:?}", service.id));
            }
        }
        Ok(())
    }

    /// `Degraded` as soon as any service is not `ok`.
    pub fn overall_status(&self) -> OverallStatus {
        if self.services.iter().all(|s| s.state == ServiceState::Ok) {
            OverallStatus::Ok
        } else {
            OverallStatus::Degraded
        }
    }
}

/// Response body: the document plus derived fields.
#[derive(Debug, Serialize)]
pub struct StatusView<'a> {
    #[serde(flatten)]
    pub document: &'a StatusDocument,
    pub status: OverallStatus,
    /// True when served from a stale entry because upstream failed.
    pub stale: bool,
}

impl<'a> StatusView<'a> {
    pub fn new(document: &'a StatusDocument, stale: bool) -> Self {
        let status = if stale {
            OverallStatus::Degraded
        } else {
            document.overall_status()
        };
        Self {
            document,
            status,
            stale,
        }
    }
}
