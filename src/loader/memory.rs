//! In-memory record store.

use serde_json::Value;
use std::collections::HashMap;

use super::{RecordError, RecordStore};
use crate::models::RecordKind;

/// A [`RecordStore`] backed by a map of payload texts
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    payloads: HashMap<(String, RecordKind), String>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw payload text, replacing any previous entry
    pub fn insert(&mut self, doi: impl Into<String>, kind: RecordKind, text: impl Into<String>) {
        self.payloads.insert((doi.into(), kind), text.into());
    }

    /// Store a JSON payload
    pub fn insert_json(&mut self, doi: impl Into<String>, kind: RecordKind, payload: &Value) {
        self.insert(doi, kind, payload.to_string());
    }

    /// Number of stored payloads
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Whether the store holds no payloads
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn read(&self, doi: &str, kind: RecordKind) -> Result<String, RecordError> {
        self.payloads
            .get(&(doi.to_string(), kind))
            .cloned()
            .ok_or_else(|| RecordError::MissingSource {
                doi: doi.to_string(),
                kind,
            })
    }
}
