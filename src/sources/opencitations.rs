//! OpenCitations source: Meta API for metadata, Index API v2 for citations
//! and references.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::models::RecordKind;
use crate::sources::{Fetcher, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig, DEFAULT_USER_AGENT};

pub const META_API_BASE: &str = "https://opencitations.net/meta/api/v1";
pub const INDEX_API_BASE: &str = "https://opencitations.net/index/api/v2";

/// OpenCitations client
///
/// Metadata comes from `{meta}/metadata/doi:{doi}`, citing works from
/// `{index}/citations/doi:{doi}` and cited works from
/// `{index}/references/doi:{doi}`. Server errors and connection failures are
/// retried with exponential backoff.
#[derive(Debug, Clone)]
pub struct OpenCitationsClient {
    client: HttpClient,
    meta_base: String,
    index_base: String,
    access_token: Option<String>,
    retry: RetryConfig,
}

impl OpenCitationsClient {
    /// Create a client against the public endpoints with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&FetchConfig::default())
    }

    /// Create a client from the `[fetch]` configuration section
    pub fn from_config(config: &FetchConfig) -> Result<Self, SourceError> {
        let client = HttpClient::with_settings(
            DEFAULT_USER_AGENT,
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(Self {
            client,
            meta_base: config.meta_base_url.trim_end_matches('/').to_string(),
            index_base: config.index_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.trim().is_empty()),
            retry: config.retry_config(),
        })
    }

    /// Override the API base URLs
    pub fn with_base_urls(mut self, meta_base: &str, index_base: &str) -> Self {
        self.meta_base = meta_base.trim_end_matches('/').to_string();
        self.index_base = index_base.trim_end_matches('/').to_string();
        self
    }

    /// Override the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Endpoint URL for one record
    pub fn url_for(&self, doi: &str, kind: RecordKind) -> String {
        match kind {
            RecordKind::Meta => format!("{}/metadata/doi:{}", self.meta_base, doi),
            RecordKind::Citations => format!("{}/citations/doi:{}", self.index_base, doi),
            RecordKind::References => format!("{}/references/doi:{}", self.index_base, doi),
        }
    }

    async fn get_json(&self, url: &str, doi: &str) -> Result<Value, SourceError> {
        let mut request = self
            .client
            .client()
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.access_token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(doi.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: format!("OpenCitations returned {} for {}", status, url),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("Invalid JSON from {}: {}", url, e)))
    }
}

#[async_trait]
impl Fetcher for OpenCitationsClient {
    fn id(&self) -> &str {
        "opencitations"
    }

    fn name(&self) -> &str {
        "OpenCitations"
    }

    async fn fetch(&self, doi: &str, kind: RecordKind) -> Result<Value, SourceError> {
        let url = self.url_for(doi, kind);
        tracing::debug!("Fetching {} for {} from {}", kind, doi, url);

        with_retry(self.retry, || self.get_json(&url, doi)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_client(server: &mockito::ServerGuard) -> OpenCitationsClient {
        let config = FetchConfig {
            access_token: None,
            ..FetchConfig::default()
        };
        OpenCitationsClient::from_config(&config)
            .unwrap()
            .with_base_urls(&format!("{}/meta", server.url()), &format!("{}/index", server.url()))
            .with_retry_config(
                RetryConfig::default()
                    .max_attempts(3)
                    .backoff_factor(Duration::ZERO),
            )
    }

    #[test]
    fn test_url_for() {
        let client = OpenCitationsClient::new()
            .unwrap()
            .with_base_urls("https://meta.example/", "https://index.example");

        assert_eq!(
            client.url_for("10.1000/x", RecordKind::Meta),
            "https://meta.example/metadata/doi:10.1000/x"
        );
        assert_eq!(
            client.url_for("10.1000/x", RecordKind::Citations),
            "https://index.example/citations/doi:10.1000/x"
        );
        assert_eq!(
            client.url_for("10.1000/x", RecordKind::References),
            "https://index.example/references/doi:10.1000/x"
        );
    }

    #[tokio::test]
    async fn test_fetch_metadata() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/meta/metadata/doi:10.1000/x")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"title": "A Paper", "pub_date": "2021"}]"#)
            .create_async()
            .await;

        let value = test_client(&server)
            .fetch("10.1000/x", RecordKind::Meta)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(value, json!([{ "title": "A Paper", "pub_date": "2021" }]));
    }

    #[tokio::test]
    async fn test_fetch_sends_access_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/index/references/doi:10.1000/x")
            .match_header("authorization", "secret-token")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let config = FetchConfig {
            access_token: Some("secret-token".to_string()),
            ..FetchConfig::default()
        };
        let client = OpenCitationsClient::from_config(&config)
            .unwrap()
            .with_base_urls(&format!("{}/meta", server.url()), &format!("{}/index", server.url()));

        let value = client.fetch("10.1000/x", RecordKind::References).await.unwrap();

        mock.assert_async().await;
        assert_eq!(value, json!([]));
    }

    #[tokio::test]
    async fn test_fetch_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/index/citations/doi:10.1000/x")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let result = test_client(&server)
            .fetch("10.1000/x", RecordKind::Citations)
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(SourceError::Http { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_fetch_does_not_retry_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/meta/metadata/doi:10.1000/missing")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let result = test_client(&server)
            .fetch("10.1000/missing", RecordKind::Meta)
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(SourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/meta/metadata/doi:10.1000/x")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let result = test_client(&server).fetch("10.1000/x", RecordKind::Meta).await;
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }
}
