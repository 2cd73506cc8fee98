//! Configuration management.
//!
//! Settings come from an optional TOML file, overridden by `CITEGRAPH_`
//! environment variables (`__` separates nested keys), then by CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! seeds = ["10.3390/app14010192", "10.1145/3502730"]
//!
//! [output]
//! results_dir = "results"
//! gexf_filename = "citation_graph.gexf"
//! nodes_filename = "nodes.csv"
//! edges_filename = "edges.csv"
//!
//! [fetch]
//! meta_base_url = "https://opencitations.net/meta/api/v1"
//! index_base_url = "https://opencitations.net/index/api/v2"
//! metadata_source = "opencitations"   # or "crossref"
//! crossref_base_url = "https://api.crossref.org"
//! crossref_mailto = "you@example.org"
//! timeout_secs = 30
//! max_attempts = 5
//! backoff_factor_secs = 1.0
//! max_concurrent_requests = 4
//! refresh = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variables
//!
//! - `CITEGRAPH_SEEDS` - comma-separated seed DOIs
//! - `CITEGRAPH_OUTPUT__RESULTS_DIR` - results directory
//! - `CITEGRAPH_FETCH__MAX_ATTEMPTS` - any key, nested with `__`
//! - `OPENCITATIONS_ACCESS_TOKEN` - default for `fetch.access_token`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::export::ExportFiles;
use crate::sources::{CROSSREF_API_BASE, INDEX_API_BASE, META_API_BASE};
use crate::utils::RetryConfig;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CITEGRAPH";

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "citegraph.toml";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seed DOIs used when none are given on the command line
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Output locations
    #[serde(default)]
    pub output: OutputConfig,

    /// OpenCitations fetch settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory holding cached payloads and exports
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    #[serde(default = "default_gexf_filename")]
    pub gexf_filename: String,

    #[serde(default = "default_nodes_filename")]
    pub nodes_filename: String,

    #[serde(default = "default_edges_filename")]
    pub edges_filename: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            gexf_filename: default_gexf_filename(),
            nodes_filename: default_nodes_filename(),
            edges_filename: default_edges_filename(),
        }
    }
}

impl OutputConfig {
    /// Export file names for [`crate::export::write_exports`]
    pub fn export_files(&self) -> ExportFiles {
        ExportFiles {
            gexf: self.gexf_filename.clone(),
            nodes: self.nodes_filename.clone(),
            edges: self.edges_filename.clone(),
        }
    }
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_gexf_filename() -> String {
    ExportFiles::default().gexf
}

fn default_nodes_filename() -> String {
    ExportFiles::default().nodes
}

fn default_edges_filename() -> String {
    ExportFiles::default().edges
}

/// Source of work metadata; citations and references always come from
/// the OpenCitations Index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSource {
    #[default]
    OpenCitations,
    Crossref,
}

/// Fetch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_meta_base_url")]
    pub meta_base_url: String,

    #[serde(default = "default_index_base_url")]
    pub index_base_url: String,

    /// OpenCitations access token, sent as the `authorization` header
    #[serde(default = "default_access_token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Where `meta` payloads come from
    #[serde(default)]
    pub metadata_source: MetadataSource,

    #[serde(default = "default_crossref_base_url")]
    pub crossref_base_url: String,

    /// Contact address for Crossref's polite pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crossref_mailto: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request, the first one included
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry `n` waits `backoff_factor_secs * 2^(n-1)` seconds
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor_secs: f64,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,

    /// Re-download payloads that are already cached
    #[serde(default)]
    pub refresh: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            meta_base_url: default_meta_base_url(),
            index_base_url: default_index_base_url(),
            access_token: default_access_token(),
            metadata_source: MetadataSource::default(),
            crossref_base_url: default_crossref_base_url(),
            crossref_mailto: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_factor_secs: default_backoff_factor(),
            max_concurrent_requests: default_max_concurrent(),
            refresh: false,
        }
    }
}

impl FetchConfig {
    /// Retry policy for the HTTP client
    pub fn retry_config(&self) -> RetryConfig {
        let backoff = Duration::try_from_secs_f64(self.backoff_factor_secs).unwrap_or(Duration::ZERO);

        RetryConfig::default()
            .max_attempts(self.max_attempts)
            .backoff_factor(backoff)
    }
}

fn default_meta_base_url() -> String {
    META_API_BASE.to_string()
}

fn default_index_base_url() -> String {
    INDEX_API_BASE.to_string()
}

fn default_crossref_base_url() -> String {
    CROSSREF_API_BASE.to_string()
}

fn default_access_token() -> Option<String> {
    std::env::var("OPENCITATIONS_ACCESS_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty())
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_concurrent() -> usize {
    4
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `"json"` for JSON lines, plain text otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

impl Config {
    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))
    }

    /// A default configuration suitable for writing to disk
    ///
    /// The access token is left out so it is never persisted from the environment.
    pub fn template() -> Self {
        let mut config = Self::default();
        config.fetch.access_token = None;
        config
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("seeds")
        .try_parsing(true)
}

/// Load configuration from a file, with environment overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment())
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Find the configuration file: `./citegraph.toml`, then
/// `<config_dir>/citegraph/config.toml`
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
        .filter(|path| path.is_file())
}

/// Default location for `init-config`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(env!("CARGO_PKG_NAME")).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE))
}

/// Get the configuration from defaults and environment variables only
pub fn get_config() -> Result<Config, ConfigError> {
    let settings = config::Config::builder().add_source(environment()).build()?;
    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.seeds.is_empty());
        assert_eq!(config.output.results_dir, PathBuf::from("results"));
        assert_eq!(config.output.gexf_filename, "citation_graph.gexf");
        assert_eq!(config.fetch.max_attempts, 5);
        assert_eq!(config.fetch.backoff_factor_secs, 1.0);
        assert_eq!(config.fetch.metadata_source, MetadataSource::OpenCitations);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_retry_config_from_fetch() {
        let fetch = FetchConfig {
            max_attempts: 3,
            backoff_factor_secs: 0.5,
            ..FetchConfig::default()
        };
        let retry = fetch.retry_config();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.backoff_factor, Duration::from_millis(500));

        let negative = FetchConfig {
            backoff_factor_secs: -1.0,
            ..FetchConfig::default()
        };
        assert_eq!(negative.retry_config().backoff_factor, Duration::ZERO);

        for factor in [1e20, f64::INFINITY, f64::NAN] {
            let huge = FetchConfig {
                backoff_factor_secs: factor,
                ..FetchConfig::default()
            };
            assert_eq!(huge.retry_config().backoff_factor, Duration::ZERO);
        }
    }

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
seeds = ["10.1000/a", "10.1000/b"]

[output]
results_dir = "/tmp/graph"
gexf_filename = "graph.gexf"

[fetch]
max_attempts = 2
max_concurrent_requests = 8
refresh = true
metadata_source = "crossref"
crossref_mailto = "graphs@example.org"

[logging]
level = "debug"
"#;
        std::fs::write(&path, toml_content).unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.seeds, vec!["10.1000/a", "10.1000/b"]);
        assert_eq!(config.output.results_dir, PathBuf::from("/tmp/graph"));
        assert_eq!(config.output.gexf_filename, "graph.gexf");
        assert_eq!(config.output.nodes_filename, "nodes.csv");
        assert_eq!(config.fetch.max_attempts, 2);
        assert_eq!(config.fetch.max_concurrent_requests, 8);
        assert!(config.fetch.refresh);
        assert_eq!(config.fetch.meta_base_url, META_API_BASE);
        assert_eq!(config.fetch.metadata_source, MetadataSource::Crossref);
        assert_eq!(config.fetch.crossref_base_url, CROSSREF_API_BASE);
        assert_eq!(config.fetch.crossref_mailto.as_deref(), Some("graphs@example.org"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_config_save_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::template();
        config.seeds = vec!["10.1000/saved".to_string()];
        config.fetch.timeout_secs = 12;

        config.save(&path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.seeds, vec!["10.1000/saved"]);
        assert_eq!(loaded.fetch.timeout_secs, 12);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("access_token"));
    }

    #[test]
    fn test_config_file_nonexistent() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");

        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_export_files() {
        let output = OutputConfig {
            nodes_filename: "n.csv".to_string(),
            ..OutputConfig::default()
        };
        let files = output.export_files();
        assert_eq!(files.nodes, "n.csv");
        assert_eq!(files.gexf, "citation_graph.gexf");
    }
}
