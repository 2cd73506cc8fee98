//! Loading cached OpenCitations payloads into per-DOI record lists.
//!
//! Records are read through the [`RecordStore`] trait so the loader never
//! touches the filesystem or network directly. [`ResultsDir`] is the on-disk
//! store written by the harvester, [`MemoryStore`] is used in tests and by
//! callers that already hold the payloads.
//!
//! Every failure while loading is absorbed here: a DOI whose payload is
//! missing or malformed simply maps to an empty list and a diagnostic is
//! logged.

mod memory;
mod results_dir;

pub use memory::MemoryStore;
pub use results_dir::{cache_file_name, ResultsDir};

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::models::RecordKind;

/// Raw records per DOI, as loaded from a store
pub type RecordsByDoi = HashMap<String, Vec<Value>>;

/// Errors raised while reading or interpreting cached records.
///
/// None of these are fatal to a graph build; they are logged where they occur.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// No payload is stored for this DOI and kind
    #[error("No cached {kind} payload for DOI {doi}")]
    MissingSource { doi: String, kind: RecordKind },

    /// The payload is not JSON, or not an object or array
    #[error("Malformed {kind} payload for DOI {doi}: {reason}")]
    MalformedPayload {
        doi: String,
        kind: RecordKind,
        reason: String,
    },

    /// A relation string carries no usable DOI
    #[error("No DOI found in relation field {field}: {value:?}")]
    UnresolvableIdentifier { field: &'static str, value: String },

    /// A metadata record lacks some expected fields
    #[error("Incomplete metadata for DOI {doi}: missing {fields}")]
    IncompleteMetadata { doi: String, fields: String },

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A source of raw per-DOI payloads
pub trait RecordStore: std::fmt::Debug {
    /// Read the raw payload text for `doi` and `kind`.
    ///
    /// Implementations return [`RecordError::MissingSource`] when nothing is stored.
    fn read(&self, doi: &str, kind: RecordKind) -> Result<String, RecordError>;
}

/// Shape of a decoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A single JSON object
    Single(Value),
    /// A JSON array, used as-is
    Many(Vec<Value>),
    /// Anything else, with the reason it was rejected
    Invalid(String),
}

impl Payload {
    /// Decode payload text, classifying its top-level JSON shape
    pub fn decode(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Payload::Single(Value::Object(map)),
            Ok(Value::Array(items)) => Payload::Many(items),
            Ok(other) => Payload::Invalid(format!(
                "expected object or array, got {}",
                json_type(&other)
            )),
            Err(e) => Payload::Invalid(format!("invalid JSON: {}", e)),
        }
    }

    /// Flatten into a record list; invalid payloads become an error
    pub fn into_records(self, doi: &str, kind: RecordKind) -> Result<Vec<Value>, RecordError> {
        match self {
            Payload::Single(record) => Ok(vec![record]),
            Payload::Many(records) => Ok(records),
            Payload::Invalid(reason) => Err(RecordError::MalformedPayload {
                doi: doi.to_string(),
                kind,
                reason,
            }),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Load one record kind for every DOI in `dois`.
///
/// Every DOI appears in the result, mapped to an empty list when its payload
/// could not be loaded. For [`RecordKind::Meta`] the DOIs left without any
/// metadata are additionally reported in a single aggregated warning.
pub fn load_records<S>(store: &S, dois: &[String], kind: RecordKind) -> RecordsByDoi
where
    S: RecordStore + ?Sized,
{
    let mut loaded = RecordsByDoi::with_capacity(dois.len());

    for doi in dois {
        let records = store
            .read(doi, kind)
            .and_then(|text| Payload::decode(&text).into_records(doi, kind));

        let records = match records {
            Ok(records) => {
                tracing::debug!("Loaded {} {} records for DOI {}", records.len(), kind, doi);
                records
            }
            Err(e @ RecordError::MissingSource { .. }) if kind == RecordKind::Meta => {
                tracing::debug!("{}", e);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("{}", e);
                Vec::new()
            }
        };

        loaded.insert(doi.clone(), records);
    }

    if kind == RecordKind::Meta {
        let missing = missing_metadata(&loaded, dois);
        if !missing.is_empty() {
            tracing::warn!(
                "Metadata missing for {} DOI(s): {}",
                missing.len(),
                missing.join(", ")
            );
        }
    }

    loaded
}

/// DOIs from `dois` left without any record in `loaded`, once each, in input order
pub fn missing_metadata<'a>(loaded: &RecordsByDoi, dois: &'a [String]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    dois.iter()
        .map(String::as_str)
        .filter(|doi| loaded.get(*doi).map_or(true, Vec::is_empty))
        .filter(|doi| seen.insert(*doi))
        .collect()
}

/// The three record maps a graph build consumes
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub metadata: RecordsByDoi,
    pub citations: RecordsByDoi,
    pub references: RecordsByDoi,
}

impl LoadedRecords {
    /// Load metadata, citations and references for every seed
    pub fn load<S>(store: &S, seeds: &[String]) -> Self
    where
        S: RecordStore + ?Sized,
    {
        Self {
            metadata: load_records(store, seeds, RecordKind::Meta),
            citations: load_records(store, seeds, RecordKind::Citations),
            references: load_records(store, seeds, RecordKind::References),
        }
    }
}
