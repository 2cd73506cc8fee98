use anyhow::{bail, Context, Result};
use citegraph::config::{
    default_config_path, find_config_file, get_config, load_config, Config, FetchConfig,
    MetadataSource,
};
use citegraph::export::{write_exports, ExportPaths};
use citegraph::loader::ResultsDir;
use citegraph::models::RecordKind;
use citegraph::sources::{
    harvest, CrossrefClient, Fetcher, HarvestOptions, HarvestReport, OpenCitationsClient,
    RoutedFetcher,
};
use citegraph::utils::{parse_seed_doi, parse_seed_list};
use citegraph::GraphSummary;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// citegraph - Build a citation graph around seed DOIs from OpenCitations
#[derive(Parser, Debug)]
#[command(name = "citegraph")]
#[command(version = citegraph::VERSION)]
#[command(author = "hongkongkiwi")]
#[command(about = "Build a citation graph around seed DOIs from OpenCitations", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for cached payloads and exports (overrides the config file)
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

/// Record kinds selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Meta,
    Citations,
    References,
}

impl From<Kind> for RecordKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Meta => RecordKind::Meta,
            Kind::Citations => RecordKind::Citations,
            Kind::References => RecordKind::References,
        }
    }
}

/// Where the seed DOIs come from
#[derive(Args, Debug, Clone, Default)]
struct SeedArgs {
    /// Seed DOIs (falls back to `seeds` in the config file)
    dois: Vec<String>,

    /// File with one DOI per line (`#` starts a comment)
    #[arg(long)]
    dois_file: Option<PathBuf>,
}

/// Options for downloading payloads
#[derive(Args, Debug, Clone, Default)]
struct FetchArgs {
    /// Record kinds to fetch (default: all)
    #[arg(long = "kind", value_enum)]
    kinds: Vec<Kind>,

    /// Re-download payloads that are already cached
    #[arg(long)]
    refresh: bool,

    /// Maximum number of requests in flight
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download metadata, citations and references for the seeds
    #[command(alias = "f")]
    Fetch {
        #[command(flatten)]
        seeds: SeedArgs,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Assemble the graph from cached payloads and export it
    #[command(alias = "b")]
    Build {
        #[command(flatten)]
        seeds: SeedArgs,
    },

    /// Fetch, then build
    Run {
        #[command(flatten)]
        seeds: SeedArgs,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Write a default configuration file
    InitConfig {
        /// Target path (default: <config dir>/citegraph/config.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Print all available environment variables
fn print_env_vars() {
    println!("citegraph - Environment Variables");
    println!();
    println!("OpenCitations:");
    println!("  OPENCITATIONS_ACCESS_TOKEN   Access token sent in the authorization header");
    println!();
    println!("Configuration Overrides (nested keys use __):");
    println!("  CITEGRAPH_SEEDS                          Comma-separated seed DOIs");
    println!("  CITEGRAPH_OUTPUT__RESULTS_DIR            Results directory (default: results)");
    println!("  CITEGRAPH_OUTPUT__GEXF_FILENAME          GEXF file name (default: citation_graph.gexf)");
    println!("  CITEGRAPH_FETCH__TIMEOUT_SECS            Request timeout in seconds (default: 30)");
    println!("  CITEGRAPH_FETCH__MAX_ATTEMPTS            Attempts per request (default: 5)");
    println!("  CITEGRAPH_FETCH__BACKOFF_FACTOR_SECS     Retry backoff factor (default: 1.0)");
    println!("  CITEGRAPH_FETCH__MAX_CONCURRENT_REQUESTS Requests in flight (default: 4)");
    println!("  CITEGRAPH_FETCH__METADATA_SOURCE         opencitations or crossref (default: opencitations)");
    println!("  CITEGRAPH_FETCH__CROSSREF_MAILTO         Contact address for Crossref requests");
    println!("  CITEGRAPH_LOGGING__FORMAT                \"json\" for JSON log lines");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export OPENCITATIONS_ACCESS_TOKEN=\"your-token\"");
    println!("  export CITEGRAPH_OUTPUT__RESULTS_DIR=\"./graph\"");
    std::process::exit(0);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
    }

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let mut config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => get_config()?,
    };
    if let Some(dir) = &cli.results_dir {
        config.output.results_dir = dir.clone();
    }

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    let results = ResultsDir::new(&config.output.results_dir);

    match cli.command {
        Some(Commands::Fetch { seeds, fetch }) => {
            let seeds = resolve_seeds(&seeds, &config)?;
            let report = run_fetch(&config, &results, &seeds, &fetch).await?;
            output_report(&report, cli.output)?;
        }
        Some(Commands::Build { seeds }) => {
            let seeds = resolve_seeds(&seeds, &config)?;
            let (summary, paths) = run_build(&config, &results, &seeds)?;
            output_summary(&summary, &paths, cli.output)?;
        }
        Some(Commands::Run { seeds, fetch }) => {
            let seeds = resolve_seeds(&seeds, &config)?;
            let report = run_fetch(&config, &results, &seeds, &fetch).await?;
            if !report.is_complete() {
                tracing::warn!(
                    "{} payload(s) could not be fetched; building with what is available",
                    report.failed.len()
                );
            }
            let (summary, paths) = run_build(&config, &results, &seeds)?;
            output_summary(&summary, &paths, cli.output)?;
        }
        Some(Commands::InitConfig { path, force }) => {
            let path = path.unwrap_or_else(default_config_path);
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            Config::template().save(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

fn init_tracing(cli: &Cli, config: &Config) {
    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };
    let json = config.logging.format.as_deref() == Some("json");

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("citegraph={}", env_filter)),
        ))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

/// Collect seeds from arguments and `--dois-file`, else from the config file
fn resolve_seeds(args: &SeedArgs, config: &Config) -> Result<Vec<String>> {
    let mut seeds = Vec::new();

    for doi in &args.dois {
        match parse_seed_doi(doi) {
            Some(doi) => seeds.push(doi),
            None => tracing::warn!("Ignoring argument {:?}: not a DOI", doi),
        }
    }

    if let Some(path) = &args.dois_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read DOI list {}", path.display()))?;
        seeds.extend(parse_seed_list(&text));
    }

    if args.dois.is_empty() && args.dois_file.is_none() {
        seeds.extend(config.seeds.iter().filter_map(|doi| parse_seed_doi(doi)));
    }

    let mut seen = HashSet::new();
    seeds.retain(|doi| seen.insert(doi.clone()));

    if seeds.is_empty() {
        bail!("No seed DOIs given: pass DOIs, --dois-file, or set `seeds` in the config file");
    }

    tracing::info!("Using {} seed DOI(s)", seeds.len());
    Ok(seeds)
}

fn harvest_options(config: &Config, args: &FetchArgs) -> HarvestOptions {
    let kinds = if args.kinds.is_empty() {
        RecordKind::ALL.to_vec()
    } else {
        let mut kinds: Vec<RecordKind> = Vec::new();
        for kind in args.kinds.iter().map(|&k| RecordKind::from(k)) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    };

    HarvestOptions {
        kinds,
        refresh: args.refresh || config.fetch.refresh,
        max_concurrent: args
            .concurrency
            .unwrap_or(config.fetch.max_concurrent_requests),
    }
}

async fn run_fetch(
    config: &Config,
    results: &ResultsDir,
    seeds: &[String],
    args: &FetchArgs,
) -> Result<HarvestReport> {
    let fetcher = build_fetcher(&config.fetch)?;
    let report = harvest(fetcher.as_ref(), results, seeds, &harvest_options(config, args)).await?;
    Ok(report)
}

fn build_fetcher(config: &FetchConfig) -> Result<Box<dyn Fetcher>> {
    let opencitations = OpenCitationsClient::from_config(config)?;

    Ok(match config.metadata_source {
        MetadataSource::OpenCitations => Box::new(opencitations),
        MetadataSource::Crossref => Box::new(RoutedFetcher::new(
            Box::new(CrossrefClient::from_config(config)?),
            Box::new(opencitations),
        )),
    })
}

fn run_build(
    config: &Config,
    results: &ResultsDir,
    seeds: &[String],
) -> Result<(GraphSummary, ExportPaths)> {
    let (graph, mapping) = citegraph::build_graph(results, seeds);

    let summary = GraphSummary::of(&graph);
    if !summary.isolated_seeds.is_empty() {
        tracing::warn!(
            "{} seed(s) have no citations or references: {}",
            summary.isolated_seeds.len(),
            summary.isolated_seeds.join(", ")
        );
    }

    let paths = write_exports(
        &graph,
        &mapping,
        results.root(),
        &config.output.export_files(),
    )?;
    Ok((summary, paths))
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

fn output_report(report: &HarvestReport, format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        _ => {
            use comfy_table::{Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Fetched", "Cached", "Failed"]);
            table.add_row(vec![
                Cell::new(report.fetched.len()),
                Cell::new(report.cached.len()),
                Cell::new(report.failed.len()),
            ]);
            println!("{table}");

            if !report.failed.is_empty() {
                let mut failures = Table::new();
                failures.load_preset(comfy_table::presets::UTF8_FULL);
                failures.set_header(vec!["DOI", "Kind", "Error"]);
                for failure in &report.failed {
                    failures.add_row(vec![
                        Cell::new(&failure.doi),
                        Cell::new(failure.kind),
                        Cell::new(&failure.error),
                    ]);
                }
                println!("{failures}");
            }
        }
    }
    Ok(())
}

fn output_summary(summary: &GraphSummary, paths: &ExportPaths, format: OutputFormat) -> Result<()> {
    match resolve_format(format) {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "summary": summary,
                "files": {
                    "gexf": paths.gexf,
                    "nodes": paths.nodes,
                    "edges": paths.edges,
                },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Metric", "Value"]);

            let rows = [
                ("Nodes", summary.nodes),
                ("Seeds", summary.seeds),
                ("Discovered", summary.discovered),
                ("Edges", summary.edges),
                ("Distinct edges", summary.distinct_edges),
                ("Untitled nodes", summary.untitled),
                ("Isolated seeds", summary.isolated_seeds.len()),
            ];
            for (metric, value) in rows {
                table.add_row(vec![
                    Cell::new(metric).add_attribute(Attribute::Bold),
                    Cell::new(value),
                ]);
            }
            println!("{table}");

            println!("GEXF:  {}", paths.gexf.display());
            println!("Nodes: {}", paths.nodes.display());
            println!("Edges: {}", paths.edges.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = citegraph::VERSION;
        assert!(!version.is_empty());
        // Version should be semantic versioning format
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_build_fetcher_by_metadata_source() {
        let config = FetchConfig::default();
        assert_eq!(build_fetcher(&config).unwrap().id(), "opencitations");

        let config = FetchConfig {
            metadata_source: MetadataSource::Crossref,
            ..FetchConfig::default()
        };
        assert_eq!(build_fetcher(&config).unwrap().id(), "crossref+opencitations");
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["citegraph"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert!(cli.config.is_none());
        assert!(cli.results_dir.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["citegraph", "-v"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["citegraph", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_fetch_command() {
        let cli = Cli::parse_from([
            "citegraph",
            "fetch",
            "10.1000/a",
            "10.1000/b",
            "--kind",
            "meta",
            "--kind",
            "references",
            "--refresh",
            "--results-dir",
            "/tmp/out",
        ]);

        assert_eq!(cli.results_dir, Some(PathBuf::from("/tmp/out")));
        match cli.command {
            Some(Commands::Fetch { seeds, fetch }) => {
                assert_eq!(seeds.dois, vec!["10.1000/a", "10.1000/b"]);
                assert_eq!(fetch.kinds, vec![Kind::Meta, Kind::References]);
                assert!(fetch.refresh);
            }
            _ => panic!("Expected Fetch command"),
        }
    }

    #[test]
    fn test_cli_build_command() {
        let cli = Cli::parse_from([
            "citegraph",
            "build",
            "--dois-file",
            "seeds.txt",
            "--output",
            "json",
        ]);

        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Some(Commands::Build { seeds }) => {
                assert!(seeds.dois.is_empty());
                assert_eq!(seeds.dois_file, Some(PathBuf::from("seeds.txt")));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_init_config_command() {
        let cli = Cli::parse_from(["citegraph", "init-config", "out.toml", "--force"]);
        match cli.command {
            Some(Commands::InitConfig { path, force }) => {
                assert_eq!(path, Some(PathBuf::from("out.toml")));
                assert!(force);
            }
            _ => panic!("Expected InitConfig command"),
        }
    }

    #[test]
    fn test_resolve_seeds_prefers_arguments() {
        let config = Config {
            seeds: vec!["10.1000/config".to_string()],
            ..Config::template()
        };
        let args = SeedArgs {
            dois: vec![
                "doi:10.1000/a".to_string(),
                "garbage".to_string(),
                "10.1000/a".to_string(),
            ],
            dois_file: None,
        };

        assert_eq!(resolve_seeds(&args, &config).unwrap(), vec!["10.1000/a"]);
        assert_eq!(
            resolve_seeds(&SeedArgs::default(), &config).unwrap(),
            vec!["10.1000/config"]
        );
        assert!(resolve_seeds(&SeedArgs::default(), &Config::template()).is_err());
    }

    #[test]
    fn test_resolve_seeds_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seeds.txt");
        std::fs::write(&path, "# seeds\n10.1000/x\n\nhttps://doi.org/10.1000/y\n").unwrap();

        let args = SeedArgs {
            dois: vec!["10.1000/y".to_string()],
            dois_file: Some(path),
        };
        assert_eq!(
            resolve_seeds(&args, &Config::template()).unwrap(),
            vec!["10.1000/y", "10.1000/x"]
        );
    }

    #[test]
    fn test_harvest_options() {
        let config = Config::template();
        let args = FetchArgs {
            kinds: vec![Kind::Citations, Kind::Citations],
            refresh: false,
            concurrency: Some(2),
        };
        let options = harvest_options(&config, &args);
        assert_eq!(options.kinds, vec![RecordKind::Citations]);
        assert_eq!(options.max_concurrent, 2);
        assert!(!options.refresh);

        let options = harvest_options(&config, &FetchArgs::default());
        assert_eq!(options.kinds, RecordKind::ALL.to_vec());
        assert_eq!(options.max_concurrent, config.fetch.max_concurrent_requests);
    }
}
