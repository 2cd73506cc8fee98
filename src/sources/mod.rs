//! Remote record sources and the harvesting loop that fills a results directory.
//!
//! This module defines the [`Fetcher`] trait implemented by every source of
//! per-DOI records. A fetcher returns the raw JSON payload for one
//! `(doi, kind)` pair; [`harvest`] drives a fetcher over many DOIs and stores
//! the payloads where the loader expects them.
//!
//! # Sources
//!
//! - [`OpenCitationsClient`] - OpenCitations Meta (metadata) and Index v2
//!   (citations, references)
//! - [`CrossrefClient`] - Crossref REST API, metadata only
//! - [`RoutedFetcher`] - metadata from one fetcher, relations from another
//! - [`MockFetcher`] - canned payloads for tests
//!
//! # Environment
//!
//! - `OPENCITATIONS_ACCESS_TOKEN` - optional access token sent in the
//!   `authorization` header

mod crossref;
mod harvest;
mod mock;
mod opencitations;
mod routed;

pub use crossref::{CrossrefClient, CROSSREF_API_BASE};
pub use harvest::{harvest, HarvestFailure, HarvestOptions, HarvestReport};
pub use mock::MockFetcher;
pub use opencitations::{OpenCitationsClient, INDEX_API_BASE, META_API_BASE};
pub use routed::RoutedFetcher;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::RecordKind;

/// Trait implemented by every source of per-DOI records
#[async_trait]
pub trait Fetcher: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "opencitations")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Fetch the raw payload of `kind` for `doi`
    async fn fetch(&self, doi: &str, kind: RecordKind) -> Result<Value, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = err.status() {
            SourceError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::Http {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
        assert_eq!(SourceError::Timeout.to_string(), "Request timed out");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: SourceError = serde_json::from_str::<Value>("{").unwrap_err().into();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
