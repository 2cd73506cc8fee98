//! Identifier extraction from OpenCitations record strings.
//!
//! OpenCitations packs several identifiers for one work into a single
//! space-separated string, for example:
//!
//! ```text
//! omid:br/061202127149 doi:10.1007/s11192-022-04367-w openalex:W4226205396
//! ```
//!
//! Metadata `venue` fields carry the same style of identifiers inside brackets:
//!
//! ```text
//! Scientometrics [issn:0138-9130 openalex:S148561398 omid:br/0601]
//! ```

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Placeholder returned when no venue token can be found.
pub const UNKNOWN_VENUE: &str = "Unknown Venue";

static DOI_PATTERN: OnceLock<Regex> = OnceLock::new();
static VENUE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn doi_pattern() -> &'static Regex {
    DOI_PATTERN.get_or_init(|| {
        Regex::new(r"doi:(10\.\d{4,9}/[-._;()/:A-Za-z0-9]+)").expect("DOI pattern is valid")
    })
}

fn venue_pattern() -> &'static Regex {
    VENUE_PATTERN
        .get_or_init(|| Regex::new(r"openalex:([A-Za-z0-9]+)").expect("venue pattern is valid"))
}

/// Extract the first `doi:`-prefixed DOI from `text`.
///
/// Only the first match is returned; later `doi:` tokens in the same string are
/// ignored. The prefix is matched case-sensitively.
pub fn extract_doi(text: &str) -> Option<String> {
    doi_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the OpenAlex venue token from a venue string, or [`UNKNOWN_VENUE`].
pub fn extract_venue_token(text: &str) -> String {
    venue_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_VENUE.to_string())
}

/// Clean up a DOI supplied by a user (CLI argument or seed file line).
///
/// Strips whitespace and the common `doi:` / `https://doi.org/` prefixes. Case is
/// preserved since DOIs are compared byte-for-byte downstream. Returns `None` for
/// blank lines, `#` comments, and strings that don't look like a DOI at all.
pub fn parse_seed_doi(input: &str) -> Option<String> {
    let doi = input.trim();

    if doi.is_empty() || doi.starts_with('#') {
        return None;
    }

    let doi = doi.strip_prefix("doi:").unwrap_or(doi);
    let doi = doi.strip_prefix("https://doi.org/").unwrap_or(doi);
    let doi = doi.strip_prefix("http://doi.org/").unwrap_or(doi);

    if !doi.starts_with("10.") || !doi.contains('/') || doi.contains(char::is_whitespace) {
        return None;
    }

    Some(doi.to_string())
}

/// Parse a seed list with one DOI per line.
///
/// Blank lines and `#` comments are skipped. Lines that are not DOIs are
/// logged and skipped; repeated DOIs keep their first position.
pub fn parse_seed_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match parse_seed_doi(trimmed) {
            Some(doi) => {
                if seen.insert(doi.clone()) {
                    seeds.push(doi);
                }
            }
            None => tracing::warn!("Skipping line {}: {:?} is not a DOI", number + 1, trimmed),
        }
    }

    seeds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_doi_basic() {
        assert_eq!(
            extract_doi("doi:10.1145/3589334.3645580 other text"),
            Some("10.1145/3589334.3645580".to_string())
        );
        assert_eq!(extract_doi("no doi here"), None);
    }

    #[test]
    fn test_extract_doi_from_opencitations_string() {
        let text = "omid:br/061202127149 doi:10.1007/s11192-022-04367-w openalex:W4226205396";
        assert_eq!(
            extract_doi(text),
            Some("10.1007/s11192-022-04367-w".to_string())
        );
    }

    #[test]
    fn test_extract_doi_first_match_wins() {
        let text = "doi:10.1000/first doi:10.1000/second";
        assert_eq!(extract_doi(text), Some("10.1000/first".to_string()));
    }

    #[test]
    fn test_extract_doi_suffix_characters() {
        assert_eq!(
            extract_doi("doi:10.1002/(sici)1097-4571;2-x"),
            Some("10.1002/(sici)1097-4571;2-x".to_string())
        );
        // Characters outside the suffix set end the match
        assert_eq!(
            extract_doi("doi:10.1234/abc<def"),
            Some("10.1234/abc".to_string())
        );
    }

    #[test]
    fn test_extract_doi_rejects_malformed() {
        // Registrant code too short
        assert_eq!(extract_doi("doi:10.12/abc"), None);
        // Missing suffix
        assert_eq!(extract_doi("doi:10.1234/"), None);
        // Prefix is case-sensitive
        assert_eq!(extract_doi("DOI:10.1234/abc"), None);
        // Bare DOI without the doi: prefix
        assert_eq!(extract_doi("10.1234/abc"), None);
    }

    #[test]
    fn test_extract_venue_token() {
        let venue = "Scientometrics [issn:0138-9130 issn:1588-2861 openalex:S148561398 omid:br/0601]";
        assert_eq!(extract_venue_token(venue), "S148561398");
        assert_eq!(extract_venue_token("Some Journal [issn:1234-5678]"), UNKNOWN_VENUE);
        assert_eq!(extract_venue_token(""), UNKNOWN_VENUE);
        assert_eq!(extract_venue_token("OPENALEX:S1"), UNKNOWN_VENUE);
    }

    #[test]
    fn test_parse_seed_doi() {
        assert_eq!(
            parse_seed_doi("  10.3390/app14010192 "),
            Some("10.3390/app14010192".to_string())
        );
        assert_eq!(
            parse_seed_doi("doi:10.48550/arXiv.2107.04382"),
            Some("10.48550/arXiv.2107.04382".to_string())
        );
        assert_eq!(
            parse_seed_doi("https://doi.org/10.1145/3502730"),
            Some("10.1145/3502730".to_string())
        );
        assert_eq!(parse_seed_doi(""), None);
        assert_eq!(parse_seed_doi("# comment"), None);
        assert_eq!(parse_seed_doi("not a doi"), None);
        assert_eq!(parse_seed_doi("10.1234"), None);
    }

    #[test]
    fn test_parse_seed_list() {
        let text = "# seeds\n10.1000/a\n\n  doi:10.1000/b\nnonsense\n10.1000/a\n";
        assert_eq!(
            parse_seed_list(text),
            vec!["10.1000/a".to_string(), "10.1000/b".to_string()]
        );
        assert!(parse_seed_list("").is_empty());
    }
}
