//! Mock fetcher for testing purposes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::RecordKind;
use crate::sources::{Fetcher, SourceError};

/// A mock fetcher that returns predefined payloads.
///
/// Pairs without a payload answer [`SourceError::NotFound`]; pairs marked
/// with [`MockFetcher::fail`] answer a 503.
#[derive(Debug, Default)]
pub struct MockFetcher {
    payloads: Mutex<HashMap<(String, RecordKind), Value>>,
    failures: Mutex<HashMap<(String, RecordKind), u16>>,
    calls: Mutex<Vec<(String, RecordKind)>>,
}

impl MockFetcher {
    /// Create a new mock fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload returned for `(doi, kind)`.
    pub fn set_payload(&self, doi: &str, kind: RecordKind, payload: Value) {
        let mut guard = self.payloads.lock().unwrap();
        guard.insert((doi.to_string(), kind), payload);
    }

    /// Make `(doi, kind)` fail with the given HTTP status.
    pub fn fail(&self, doi: &str, kind: RecordKind, status: u16) {
        let mut guard = self.failures.lock().unwrap();
        guard.insert((doi.to_string(), kind), status);
    }

    /// Every `(doi, kind)` requested so far, in call order.
    pub fn calls(&self) -> Vec<(String, RecordKind)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Fetcher"
    }

    async fn fetch(&self, doi: &str, kind: RecordKind) -> Result<Value, SourceError> {
        let key = (doi.to_string(), kind);
        self.calls.lock().unwrap().push(key.clone());

        if let Some(status) = self.failures.lock().unwrap().get(&key) {
            return Err(SourceError::Http {
                status: *status,
                message: "mock failure".to_string(),
            });
        }

        let guard = self.payloads.lock().unwrap();
        match guard.get(&key) {
            Some(payload) => Ok(payload.clone()),
            None => Err(SourceError::NotFound(doi.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_fetcher() {
        let fetcher = MockFetcher::new();
        fetcher.set_payload("10.1000/a", RecordKind::Meta, json!([{ "title": "A" }]));
        fetcher.fail("10.1000/a", RecordKind::Citations, 500);

        let meta = fetcher.fetch("10.1000/a", RecordKind::Meta).await.unwrap();
        assert_eq!(meta, json!([{ "title": "A" }]));

        let failed = fetcher.fetch("10.1000/a", RecordKind::Citations).await;
        assert!(matches!(failed, Err(SourceError::Http { status: 500, .. })));

        let missing = fetcher.fetch("10.1000/a", RecordKind::References).await;
        assert!(matches!(missing, Err(SourceError::NotFound(_))));

        assert_eq!(fetcher.calls().len(), 3);
    }
}
