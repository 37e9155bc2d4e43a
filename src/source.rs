// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Upstream status sources.
//!
//! The cache only needs `fetch()`. A file stub and an HTTP endpoint are
//! provided; `STATUS_SOURCE` picks between them.

use crate::config::StatusConfig;
use crate::error::{ConfigError, FetchError};
use crate::status::StatusDocument;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Anything that can produce a fresh status document.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self) -> Result<StatusDocument, FetchError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Parse and validate a document.
pub fn parse_document(bytes: &[u8]) -> Result<StatusDocument, FetchError> {
    let document: StatusDocument = serde_json::from_slice(bytes)?;
    document.validate().map_err(FetchError::Invalid)?;
    Ok(document)
}

/// JSON file on local disk.
#[derive(Debug, Clone)]
pub struct FileStatusSource {
    path: PathBuf,
}

impl FileStatusSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StatusSource for FileStatusSource {
    async fn fetch(&self) -> Result<StatusDocument, FetchError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|source| FetchError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Read status file");
        parse_document(&bytes)
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// JSON document served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpStatusSource {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self) -> Result<StatusDocument, FetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        debug!(url = %self.url, bytes = bytes.len(), "Fetched status document");
        parse_document(&bytes)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Fixed in-memory document. Useful for tests and static deployments.
#[derive(Debug, Clone)]
pub struct StaticStatusSource {
    document: StatusDocument,
}

impl StaticStatusSource {
    pub fn new(document: StatusDocument) -> Self {
        Self { document }
    }
}

#[async_trait]
impl StatusSource for StaticStatusSource {
    async fn fetch(&self) -> Result<StatusDocument, FetchError> {
        Ok(self.document.clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

/// Build the source named by configuration.
pub fn source_from_config(config: &StatusConfig) -> Result<Arc<dyn StatusSource>, ConfigError> {
    let location = config.source.trim();
    if location.starts_with("http://") || location.starts_with("https://") {
        let url = Url::parse(location).map_err(|_| ConfigError::Invalid {
            var: "STATUS_SOURCE",
            value: location.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|_| ConfigError::OutOfRange {
                var: "STATUS_SOURCE",
                reason: "HTTP client could not be initialised",
            })?;
        return Ok(Arc::new(HttpStatusSource::new(client, url)));
    }

    Ok(Arc::new(FileStatusSource::new(location)))
}
