//! Crossref source for work metadata.
//!
//! Crossref only answers metadata lookups. Its `message` object is rewritten
//! into the field names OpenCitations Meta uses, so the loader treats both
//! sources the same way.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::config::FetchConfig;
use crate::models::RecordKind;
use crate::sources::{Fetcher, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig, DEFAULT_USER_AGENT};

pub const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Crossref REST API client, `GET {base}/works/{doi}`
#[derive(Debug, Clone)]
pub struct CrossrefClient {
    client: HttpClient,
    base_url: String,
    retry: RetryConfig,
}

impl CrossrefClient {
    /// Create a client against the public endpoint with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&FetchConfig::default())
    }

    /// Create a client from the `[fetch]` configuration section.
    ///
    /// With `crossref_mailto` set, the user agent carries the address so
    /// requests go to Crossref's polite pool.
    pub fn from_config(config: &FetchConfig) -> Result<Self, SourceError> {
        let user_agent = match config.crossref_mailto.as_deref().map(str::trim) {
            Some(mailto) if !mailto.is_empty() => {
                format!("{} (mailto:{})", DEFAULT_USER_AGENT, mailto)
            }
            _ => DEFAULT_USER_AGENT.to_string(),
        };
        let client = HttpClient::with_settings(&user_agent, Duration::from_secs(config.timeout_secs))?;

        Ok(Self {
            client,
            base_url: config.crossref_base_url.trim_end_matches('/').to_string(),
            retry: config.retry_config(),
        })
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the retry policy
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn url_for(&self, doi: &str) -> String {
        format!("{}/works/{}", self.base_url, doi)
    }

    async fn get_work(&self, url: &str, doi: &str) -> Result<Value, SourceError> {
        let response = self
            .client
            .client()
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(doi.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: format!("Crossref returned {} for {}", status, url),
            });
        }

        let body = response.text().await?;
        let data: CrossrefResponse = serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("Invalid Crossref response from {}: {}", url, e)))?;

        Ok(json!([data.message.into_meta_record(doi)]))
    }
}

#[async_trait]
impl Fetcher for CrossrefClient {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "Crossref"
    }

    async fn fetch(&self, doi: &str, kind: RecordKind) -> Result<Value, SourceError> {
        if kind != RecordKind::Meta {
            return Err(SourceError::InvalidRequest(format!(
                "Crossref has no {} records",
                kind
            )));
        }

        let url = self.url_for(doi);
        tracing::debug!("Fetching {} for {} from {}", kind, doi, url);

        with_retry(self.retry, || self.get_work(&url, doi)).await
    }
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefWork,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CrossrefAuthor>,
    #[serde(rename = "published-print")]
    published_print: Option<CrossrefDate>,
    issued: Option<CrossrefDate>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(rename = "type")]
    work_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
    /// Organizational authors only have a name
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossrefDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i64>>>,
}

impl CrossrefAuthor {
    fn display_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.given.as_deref(), self.family.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();

        if parts.is_empty() {
            self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(String::from)
        } else {
            Some(parts.join(" "))
        }
    }
}

impl CrossrefDate {
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD` from the first date-parts entry
    fn to_pub_date(&self) -> Option<String> {
        let parts = self.date_parts.first()?;
        let mut values = parts.iter().map_while(|part| *part);

        let year = values.next()?;
        let mut date = format!("{:04}", year);
        for value in values.take(2) {
            date.push_str(&format!("-{:02}", value));
        }
        Some(date)
    }
}

impl CrossrefWork {
    /// Rewrite as an OpenCitations Meta style record; missing fields are left out
    fn into_meta_record(self, doi: &str) -> Value {
        let mut record = Map::new();
        record.insert("id".to_string(), json!(format!("doi:{}", doi)));

        if let Some(title) = self.title.into_iter().find(|t| !t.trim().is_empty()) {
            record.insert("title".to_string(), json!(title));
        }

        let authors: Vec<String> = self.author.iter().filter_map(CrossrefAuthor::display_name).collect();
        if !authors.is_empty() {
            record.insert("author".to_string(), json!(authors));
        }

        let pub_date = self
            .published_print
            .as_ref()
            .and_then(CrossrefDate::to_pub_date)
            .or_else(|| self.issued.as_ref().and_then(CrossrefDate::to_pub_date));
        if let Some(pub_date) = pub_date {
            record.insert("pub_date".to_string(), json!(pub_date));
        }

        if let Some(venue) = self.container_title.into_iter().find(|v| !v.trim().is_empty()) {
            record.insert("venue".to_string(), json!(venue));
        }

        if let Some(work_type) = self.work_type {
            record.insert("type".to_string(), json!(work_type.replace('-', " ")));
        }

        Value::Object(record)
    }
}
