//! Work model representing one node of the citation graph.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::loader::RecordError;
use crate::utils::{extract_venue_token, UNKNOWN_VENUE};

/// Placeholder title for works without metadata
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Placeholder author for works without metadata
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Placeholder work type for works without metadata
pub const UNKNOWN_TYPE: &str = "Unknown Type";

/// Authors of a work, as delivered by the metadata service.
///
/// OpenCitations Meta returns a single `"; "`-separated string, but other
/// sources deliver a list, so both shapes are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Authors {
    One(String),
    Many(Vec<String>),
}

impl Default for Authors {
    fn default() -> Self {
        Authors::One(UNKNOWN_AUTHOR.to_string())
    }
}

impl fmt::Display for Authors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authors::One(name) => write!(f, "{}", name),
            Authors::Many(names) => write!(f, "{}", names.join("; ")),
        }
    }
}

/// Canonical attributes attached to a graph node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecord {
    /// Work title
    pub title: String,

    /// Authors (string or list)
    pub authors: Authors,

    /// OpenAlex venue token
    pub venue: String,

    /// Work type (journal article, proceedings article, ...)
    #[serde(rename = "type")]
    pub work_type: String,

    /// Four-digit publication year, or empty when unknown
    pub year: String,

    /// Digital Object Identifier
    pub doi: String,

    /// Whether the DOI was part of the seed list
    pub is_seed: bool,
}

impl WorkRecord {
    /// A record with every attribute set to its placeholder
    pub fn unknown(doi: impl Into<String>, is_seed: bool) -> Self {
        Self {
            title: UNKNOWN_TITLE.to_string(),
            authors: Authors::default(),
            venue: UNKNOWN_VENUE.to_string(),
            work_type: UNKNOWN_TYPE.to_string(),
            year: String::new(),
            doi: doi.into(),
            is_seed,
        }
    }

    /// Build a record from raw metadata payloads.
    ///
    /// Only the first payload is used. Missing or malformed fields fall back to
    /// their placeholders independently of each other; this never fails.
    pub fn normalize(records: &[Value], doi: &str, is_seed: bool) -> Self {
        let mut work = Self::unknown(doi, is_seed);

        let Some(raw) = records.first().and_then(Value::as_object) else {
            tracing::warn!("No usable metadata for DOI {}, using placeholders", doi);
            return work;
        };

        let mut missing = Vec::new();

        match raw.get("title").and_then(Value::as_str) {
            Some(title) => work.title = title.to_string(),
            None => missing.push("title"),
        }

        match raw
            .get("author")
            .and_then(|v| serde_json::from_value::<Authors>(v.clone()).ok())
        {
            Some(authors) => work.authors = authors,
            None => missing.push("author"),
        }

        match raw.get("type").and_then(Value::as_str) {
            Some(work_type) => work.work_type = work_type.to_string(),
            None => missing.push("type"),
        }

        match raw.get("venue").and_then(Value::as_str) {
            Some(venue) => work.venue = extract_venue_token(venue),
            None => missing.push("venue"),
        }

        match raw.get("pub_date").and_then(Value::as_str) {
            Some(date) => work.year = standardize_date(date),
            None => missing.push("pub_date"),
        }

        if !missing.is_empty() {
            let incomplete = RecordError::IncompleteMetadata {
                doi: doi.to_string(),
                fields: missing.join(", "),
            };
            tracing::debug!("{}", incomplete);
        }

        work
    }

    /// Whether the title is still the placeholder
    pub fn has_unknown_title(&self) -> bool {
        self.title == UNKNOWN_TITLE
    }
}

/// Reduce a publication date to its four-digit year.
///
/// Accepts full dates (`2021-07-10`, RFC 3339 timestamps, `10 July 2021`) as
/// well as the partial `YYYY-MM` and `YYYY` forms OpenCitations emits for
/// works with imprecise dates. Anything unparseable yields an empty string.
pub fn standardize_date(date: &str) -> String {
    let date = date.trim();
    if date.is_empty() {
        return String::new();
    }

    match parse_date(date) {
        Some(parsed) if (1000..=9999).contains(&parsed.year()) => format!("{}", parsed.year()),
        _ => {
            tracing::debug!("Unparseable publication date: {:?}", date);
            String::new()
        }
    }
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d %B %Y", "%B %d, %Y"];
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ];

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(date) {
        return Some(timestamp.date_naive());
    }

    if let Some(timestamp) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(date, format).ok())
    {
        return Some(timestamp.date());
    }

    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", date), "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01-01", date), "%Y-%m-%d").ok())
}
