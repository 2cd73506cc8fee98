//! Fill a results directory with raw payloads from a [`Fetcher`].

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;

use crate::loader::ResultsDir;
use crate::models::RecordKind;
use crate::sources::{Fetcher, SourceError};

/// Options for a harvest run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOptions {
    /// Kinds to fetch for every DOI
    pub kinds: Vec<RecordKind>,
    /// Re-download payloads that are already cached
    pub refresh: bool,
    /// Maximum number of requests in flight
    pub max_concurrent: usize,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            kinds: RecordKind::ALL.to_vec(),
            refresh: false,
            max_concurrent: 4,
        }
    }
}

/// One payload that could not be fetched or stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestFailure {
    pub doi: String,
    pub kind: RecordKind,
    pub error: String,
}

/// Outcome of a harvest run, sorted by DOI then kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    pub fetched: Vec<(String, RecordKind)>,
    pub cached: Vec<(String, RecordKind)>,
    pub failed: Vec<HarvestFailure>,
}

impl HarvestReport {
    /// Whether every requested payload is now available
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn sort(&mut self) {
        let key = |(doi, kind): &(String, RecordKind)| (doi.clone(), kind.as_str());
        self.fetched.sort_by_key(key);
        self.cached.sort_by_key(key);
        self.failed.sort_by(|a, b| (&a.doi, a.kind.as_str()).cmp(&(&b.doi, b.kind.as_str())));
    }
}

/// Fetch every `(doi, kind)` pair and store the payloads in `results`.
///
/// Pairs already on disk are skipped unless `options.refresh` is set, and a
/// DOI listed twice is fetched once. Each payload is written as soon as its
/// request completes. A failed pair is logged and recorded in the report; it
/// never stops the run. Only a results directory that cannot be created is an
/// error.
pub async fn harvest(
    fetcher: &dyn Fetcher,
    results: &ResultsDir,
    dois: &[String],
    options: &HarvestOptions,
) -> Result<HarvestReport, SourceError> {
    results.initialize()?;

    let mut report = HarvestReport::default();
    let mut jobs = Vec::new();
    let mut seen = HashSet::new();

    for doi in dois {
        for &kind in &options.kinds {
            if !seen.insert((doi.as_str(), kind)) {
                continue;
            }
            if !options.refresh && results.contains(doi, kind) {
                tracing::debug!("Using cached {} payload for {}", kind, doi);
                report.cached.push((doi.clone(), kind));
            } else {
                jobs.push((doi.clone(), kind));
            }
        }
    }

    tracing::info!(
        "Fetching {} payload(s) from {} [{}] ({} cached)",
        jobs.len(),
        fetcher.name(),
        fetcher.id(),
        report.cached.len()
    );

    let mut outcomes = stream::iter(jobs)
        .map(|(doi, kind)| async move {
            let result = fetcher.fetch(&doi, kind).await;
            (doi, kind, result)
        })
        .buffer_unordered(options.max_concurrent.max(1));

    while let Some((doi, kind, result)) = outcomes.next().await {
        let stored = result.and_then(|payload| {
            results
                .write(&doi, kind, &payload)
                .map_err(|e| SourceError::Other(e.to_string()))
        });

        match stored {
            Ok(path) => {
                tracing::debug!("Stored {} payload for {} at {}", kind, doi, path.display());
                report.fetched.push((doi, kind));
            }
            Err(error) => {
                tracing::warn!("Failed to fetch {} for {}: {}", kind, doi, error);
                report.failed.push(HarvestFailure {
                    doi,
                    kind,
                    error: error.to_string(),
                });
            }
        }
    }

    report.sort();
    tracing::info!(
        "Harvest finished: {} fetched, {} cached, {} failed",
        report.fetched.len(),
        report.cached.len(),
        report.failed.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockFetcher;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Answers every DOI after the first only once the first DOI's payload
    /// is already stored, and fails `broken`
    #[derive(Debug)]
    struct OrderedFetcher {
        results: ResultsDir,
        first: String,
        broken: String,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Fetcher for OrderedFetcher {
        fn id(&self) -> &str {
            "ordered"
        }

        fn name(&self) -> &str {
            "Ordered Fetcher"
        }

        async fn fetch(&self, doi: &str, kind: RecordKind) -> Result<Value, SourceError> {
            self.calls.lock().unwrap().push(doi.to_string());

            if doi == self.broken {
                return Err(SourceError::Network("connection reset".to_string()));
            }
            if doi != self.first && !self.results.contains(&self.first, kind) {
                return Err(SourceError::Other(format!("{} not stored yet", self.first)));
            }
            Ok(json!([{ "citing": format!("doi:{}", doi) }]))
        }
    }

    fn seeds() -> Vec<String> {
        vec!["10.1000/a".to_string(), "10.1000/b".to_string()]
    }

    #[tokio::test]
    async fn test_harvest_writes_payloads() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path().join("results"));
        let fetcher = MockFetcher::new();
        for doi in seeds() {
            for kind in RecordKind::ALL {
                fetcher.set_payload(&doi, kind, json!([]));
            }
        }

        let report = harvest(&fetcher, &results, &seeds(), &HarvestOptions::default())
            .await
            .unwrap();

        assert_eq!(report.fetched.len(), 6);
        assert!(report.is_complete());
        assert!(results.contains("10.1000/b", RecordKind::References));
        assert_eq!(report.fetched[0], ("10.1000/a".to_string(), RecordKind::Citations));
    }

    #[tokio::test]
    async fn test_harvest_skips_cached_payloads() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path());
        results
            .write("10.1000/a", RecordKind::Meta, &json!([{ "title": "Cached" }]))
            .unwrap();

        let fetcher = MockFetcher::new();
        fetcher.set_payload("10.1000/a", RecordKind::Meta, json!([{ "title": "Fresh" }]));
        let options = HarvestOptions {
            kinds: vec![RecordKind::Meta],
            ..HarvestOptions::default()
        };

        let report = harvest(&fetcher, &results, &seeds()[..1], &options).await.unwrap();
        assert_eq!(report.cached, vec![("10.1000/a".to_string(), RecordKind::Meta)]);
        assert!(fetcher.calls().is_empty());

        let refresh = HarvestOptions {
            refresh: true,
            ..options
        };
        let report = harvest(&fetcher, &results, &seeds()[..1], &refresh).await.unwrap();
        assert_eq!(report.fetched.len(), 1);
        assert_eq!(fetcher.calls().len(), 1);

        let stored = std::fs::read_to_string(results.path_for("10.1000/a", RecordKind::Meta)).unwrap();
        assert!(stored.contains("Fresh"));
    }

    #[tokio::test]
    async fn test_harvest_continues_after_failures() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path());
        let fetcher = MockFetcher::new();
        fetcher.fail("10.1000/a", RecordKind::Citations, 503);
        fetcher.set_payload("10.1000/b", RecordKind::Citations, json!([]));

        let options = HarvestOptions {
            kinds: vec![RecordKind::Citations],
            max_concurrent: 1,
            ..HarvestOptions::default()
        };
        let report = harvest(&fetcher, &results, &seeds(), &options).await.unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].doi, "10.1000/a");
        assert_eq!(report.fetched, vec![("10.1000/b".to_string(), RecordKind::Citations)]);
        assert!(!results.contains("10.1000/a", RecordKind::Citations));
    }

    #[tokio::test]
    async fn test_harvest_stores_each_payload_as_it_arrives() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path().join("results"));
        let fetcher = OrderedFetcher {
            results: results.clone(),
            first: "10.1000/a".to_string(),
            broken: "10.1000/c".to_string(),
            calls: Mutex::new(Vec::new()),
        };
        let dois = vec![
            "10.1000/a".to_string(),
            "10.1000/b".to_string(),
            "10.1000/c".to_string(),
            "10.1000/d".to_string(),
        ];
        let options = HarvestOptions {
            kinds: vec![RecordKind::Citations],
            max_concurrent: 1,
            ..HarvestOptions::default()
        };

        let report = harvest(&fetcher, &results, &dois, &options).await.unwrap();

        assert_eq!(report.fetched.len(), 3, "{:?}", report.failed);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].doi, "10.1000/c");
        for doi in ["10.1000/a", "10.1000/b", "10.1000/d"] {
            assert!(results.contains(doi, RecordKind::Citations));
        }
        assert!(!results.contains("10.1000/c", RecordKind::Citations));
        assert_eq!(fetcher.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_harvest_fetches_repeated_doi_once() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path());
        let fetcher = MockFetcher::new();
        fetcher.set_payload("10.1000/a", RecordKind::Meta, json!([{ "title": "Once" }]));

        let dois = vec!["10.1000/a".to_string(), "10.1000/a".to_string()];
        let options = HarvestOptions {
            kinds: vec![RecordKind::Meta, RecordKind::Meta],
            ..HarvestOptions::default()
        };
        let report = harvest(&fetcher, &results, &dois, &options).await.unwrap();

        assert_eq!(fetcher.calls().len(), 1);
        assert_eq!(report.fetched, vec![("10.1000/a".to_string(), RecordKind::Meta)]);
        assert!(report.cached.is_empty());
        assert!(report.is_complete());
    }
}
