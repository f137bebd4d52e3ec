//! Crawler module for registry traversal and downloads
//!
//! This module contains the crawl pipeline, including:
//! - The HTTP session shared by every request of a run
//! - HTML parsing and link extraction
//! - Listing pagination
//! - Filename and metadata resolution
//! - Streaming downloads
//! - Overall crawl coordination

mod coordinator;
mod downloader;
mod paginator;
mod parser;
mod resolver;
mod session;
mod throttle;

pub use coordinator::{Coordinator, CrawlReport};
pub use downloader::{Downloader, CHUNK_BUFFER_SIZE};
pub use paginator::{PaginationOutcome, Paginator, StopReason};
pub use parser::{extract_documents, extract_links, extract_metadata_title, has_next_page};
pub use resolver::{
    filename_from_content_disposition, format_size, infer_extension, resolve_filename,
    resolve_filename_at, resolve_metadata, type_keyword_extension, ResponseHints,
    FALLBACK_EXTENSION,
};
pub use session::{build_http_client, default_headers, RequestOptions, Session};
pub use throttle::HostThrottle;

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete batch crawl for one keyword
///
/// This is the main entry point for downloading. It will:
/// 1. Validate the keyword
/// 2. Open a session against the registry
/// 3. Paginate the keyword search into projects
/// 4. Walk each project's procedures and their document listings
/// 5. Download every document into the configured directory
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `keyword` - Search keyword
/// * `max_projects` - Optional cap on the number of projects processed
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed; individual failures are in the report
/// * `Err(HarvestError)` - Invalid input or the session could not be opened
///
/// # Example
///
/// ```no_run
/// use via_harvest::config::Config;
/// use via_harvest::crawler::crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = crawl(Config::default(), "autostrada", Some(3)).await?;
/// println!("{} documents processed", report.results.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    config: Config,
    keyword: &str,
    max_projects: Option<usize>,
) -> Result<CrawlReport, HarvestError> {
    Coordinator::new(config)?
        .run_crawl(keyword, max_projects)
        .await
}
