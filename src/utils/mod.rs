//! Utility modules shared by the loader, the fetch layer and the CLI.
//!
//! - [`extract_doi`]: First `doi:`-prefixed DOI in an OpenCitations identifier string
//! - [`extract_venue_token`]: OpenAlex venue token from a venue string
//! - [`parse_seed_doi`] / [`parse_seed_list`]: Clean up user-supplied seed DOIs
//! - [`HttpClient`]: Shared reqwest client with timeouts
//! - [`RetryConfig`]: Configuration for retry logic with exponential backoff
//! - [`with_retry`]: Execute an operation with automatic retry on transient errors
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use citegraph::sources::SourceError;
//! use citegraph::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig::default().max_attempts(3);
//! let result = with_retry(config, fetch_data).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod identifiers;
mod retry;

pub use http::{HttpClient, DEFAULT_USER_AGENT};
pub use identifiers::{
    extract_doi, extract_venue_token, parse_seed_doi, parse_seed_list, UNKNOWN_VENUE,
};
pub use retry::{with_retry, RetryConfig, TransientError};
