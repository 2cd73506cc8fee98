//! Record kinds and citation relations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::utils::extract_doi;

/// The three payload kinds fetched and cached per DOI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Bibliographic metadata (OpenCitations Meta)
    Meta,
    /// Works citing the DOI (OpenCitations Index)
    Citations,
    /// Works cited by the DOI (OpenCitations Index)
    References,
}

impl RecordKind {
    /// All kinds, in fetch order
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Meta,
        RecordKind::Citations,
        RecordKind::References,
    ];

    /// Returns the kind identifier used in cache file names
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Meta => "meta",
            RecordKind::Citations => "citations",
            RecordKind::References => "references",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "meta" | "metadata" => Ok(RecordKind::Meta),
            "citations" | "citing" => Ok(RecordKind::Citations),
            "references" | "cited" => Ok(RecordKind::References),
            other => Err(format!("unknown record kind: {}", other)),
        }
    }
}

/// A directed citation between two works: `citing` cites `cited`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationRecord {
    pub citing: String,
    pub cited: String,
}

impl RelationRecord {
    /// Relation from a citations payload entry: some work cites `seed`.
    ///
    /// Returns `None` when the entry's `citing` field carries no `doi:` token.
    pub fn incoming(raw: &Value, seed: &str) -> Option<Self> {
        let citing = raw.get("citing").and_then(Value::as_str).and_then(extract_doi)?;
        Some(Self {
            citing,
            cited: seed.to_string(),
        })
    }

    /// Relation from a references payload entry: `seed` cites some work.
    ///
    /// Returns `None` when the entry's `cited` field carries no `doi:` token.
    pub fn outgoing(raw: &Value, seed: &str) -> Option<Self> {
        let cited = raw.get("cited").and_then(Value::as_str).and_then(extract_doi)?;
        Some(Self {
            citing: seed.to_string(),
            cited,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_kind_round_trip() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.as_str().parse::<RecordKind>().unwrap(), kind);
        }
        assert!("bogus".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_incoming_relation() {
        let raw = json!({
            "oci": "06101801781-06180334099",
            "citing": "omid:br/06101801781 doi:10.1007/978-3-030-30760-8_15",
            "cited": "omid:br/06180334099 doi:10.1145/3589334.3645580"
        });

        let relation = RelationRecord::incoming(&raw, "10.1145/3589334.3645580").unwrap();
        assert_eq!(relation.citing, "10.1007/978-3-030-30760-8_15");
        assert_eq!(relation.cited, "10.1145/3589334.3645580");
    }

    #[test]
    fn test_outgoing_relation() {
        let raw = json!({ "cited": "doi:10.3390/e22040416 openalex:W3015" });

        let relation = RelationRecord::outgoing(&raw, "10.1145/3502730").unwrap();
        assert_eq!(relation.citing, "10.1145/3502730");
        assert_eq!(relation.cited, "10.3390/e22040416");
    }

    #[test]
    fn test_relation_without_doi_is_dropped() {
        assert!(RelationRecord::incoming(&json!({ "citing": "something else" }), "A").is_none());
        assert!(RelationRecord::outgoing(&json!({ "cited": 42 }), "A").is_none());
        assert!(RelationRecord::outgoing(&json!({}), "A").is_none());
    }
}
