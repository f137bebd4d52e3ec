//! via-harvest main entry point
//!
//! This is the command-line interface for the VIA registry harvester.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use via_harvest::config::{load_config_with_hash, Config};
use via_harvest::crawler::Coordinator;
use via_harvest::model::DocumentRef;
use via_harvest::output::{
    format_discovery_json, format_documents_json, print_statistics, write_crawl_report,
    write_discovery_report, CrawlStatistics,
};

/// via-harvest: a polite document harvester for the VIA registry
///
/// Searches the registry by keyword, follows every project to its procedure
/// listings and downloads each listed document into one local directory.
#[derive(Parser, Debug)]
#[command(name = "via-harvest")]
#[command(group(clap::ArgGroup::new("listing_mode").args(["discover", "documents"])))]
#[command(version)]
#[command(about = "A polite document harvester for the VIA registry", long_about = None)]
struct Cli {
    /// Keyword to search the registry for
    #[arg(value_name = "KEYWORD")]
    keyword: String,

    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Process at most this many projects from the search results
    #[arg(long, value_name = "N")]
    max_projects: Option<usize>,

    /// List documents grouped by project without downloading them
    #[arg(long, conflicts_with = "documents")]
    discover: bool,

    /// Search in document mode and list the documents found
    #[arg(long, conflicts_with = "discover")]
    documents: bool,

    /// Complete listed documents with HEAD and metadata lookups
    #[arg(long, requires = "listing_mode")]
    describe: bool,

    /// Print the listed documents as JSON instead of text
    #[arg(long, requires = "listing_mode")]
    json: bool,

    /// Download directory, overriding the configured one
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Write a markdown report to this path, overriding the configured one
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Validate configuration and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(dir) = &cli.output {
        config.output.download_dir = dir.display().to_string();
    }
    if let Some(report) = &cli.report {
        config.output.report_path = Some(report.display().to_string());
    }

    if cli.dry_run {
        handle_dry_run(&config, &cli);
        return Ok(());
    }

    let coordinator = Coordinator::new(config)
        .context("Invalid configuration")?
        .describing(cli.describe);

    if cli.discover {
        handle_discover(&coordinator, &cli).await
    } else if cli.documents {
        handle_document_search(&coordinator, &cli).await
    } else {
        handle_crawl(&coordinator, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("via_harvest=info,warn"),
            1 => EnvFilter::new("via_harvest=debug,info"),
            2 => EnvFilter::new("via_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration and search URL
fn handle_dry_run(config: &Config, cli: &Cli) {
    println!("=== via-harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Search path: {}", config.site.search_path);
    println!("  Project marker: {}", config.site.project_marker);
    println!("  Procedure marker: {}", config.site.procedure_marker);
    println!("  Document marker: {}", config.site.document_marker);
    println!(
        "  Document extensions: {}",
        config.site.document_extensions.join(", ")
    );

    println!("\nCrawler:");
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Max pages per listing: {}", config.crawler.max_pages);
    match cli.max_projects.or(config.crawler.max_projects) {
        Some(limit) => println!("  Max projects: {}", limit),
        None => println!("  Max projects: unlimited"),
    }
    println!(
        "  Deduplicate documents: {}",
        config.crawler.deduplicate_documents
    );

    println!("\nOutput:");
    println!("  Download directory: {}", config.output.download_dir);
    if let Some(report) = &config.output.report_path {
        println!("  Report: {}", report);
    }

    let search_type = if cli.documents {
        via_harvest::SearchType::Documents
    } else {
        via_harvest::SearchType::Projects
    };
    let query = via_harvest::SearchQuery::new(cli.keyword.trim(), search_type, 1);
    match via_harvest::url::build_search_url(&config.site, &config.crawler, &query) {
        Ok(url) => println!("\n✓ Would start with: {}", url),
        Err(e) => println!("\n✗ Cannot build search URL: {}", e),
    }
}

/// Handles the default batch mode: discover and download everything
async fn handle_crawl(coordinator: &Coordinator, cli: &Cli) -> anyhow::Result<()> {
    tracing::info!("Starting crawl for '{}'", cli.keyword);

    let report = coordinator
        .run_crawl(&cli.keyword, cli.max_projects)
        .await
        .context("Crawl failed")?;

    for result in report.results.iter().filter(|r| r.is_failed()) {
        tracing::warn!("{}: {}", result.url(), result);
    }

    if let Some(path) = &coordinator.config().output.report_path {
        write_crawl_report(&report, Path::new(path)).context("Failed to write report")?;
    }

    if !cli.quiet {
        print_statistics(&report.stats);
    }

    Ok(())
}

/// Handles the --discover mode: list documents grouped by project
///
/// With --describe every document is completed inside the discovery session.
async fn handle_discover(coordinator: &Coordinator, cli: &Cli) -> anyhow::Result<()> {
    tracing::info!("Discovering documents for '{}'", cli.keyword);

    let discovery = coordinator
        .discover(&cli.keyword, cli.max_projects)
        .await
        .context("Discovery failed")?;

    if let Some(path) = &coordinator.config().output.report_path {
        write_discovery_report(&discovery, Path::new(path)).context("Failed to write report")?;
    }

    if cli.json {
        println!("{}", format_discovery_json(&discovery)?);
    } else if !cli.quiet {
        for (index, listing) in discovery.projects.iter().enumerate() {
            println!("Project {}: {}", index + 1, listing.project.url);
            for procedure in &listing.procedures {
                println!("  Procedure: {}", procedure.procedure.url);
                for doc in &procedure.documents {
                    print_document(doc, "    ");
                }
            }
        }
        println!();
        print_statistics(&CrawlStatistics::from_discovery(&discovery));
    }

    Ok(())
}

/// Handles the --documents mode: document-type search
async fn handle_document_search(coordinator: &Coordinator, cli: &Cli) -> anyhow::Result<()> {
    tracing::info!("Searching documents for '{}'", cli.keyword);

    let documents = coordinator
        .search_documents(&cli.keyword)
        .await
        .context("Document search failed")?;

    if cli.json {
        println!("{}", format_documents_json(&documents)?);
    } else if !cli.quiet {
        for doc in &documents {
            print_document(doc, "");
        }
        println!("\n{} documents found", documents.len());
    }

    Ok(())
}

fn print_document(doc: &DocumentRef, indent: &str) {
    println!(
        "{}- {} [{}] {} {} ({})",
        indent, doc.title, doc.extension, doc.date, doc.size, doc.url
    );
}
