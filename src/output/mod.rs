//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Recording crawl statistics
//! - Printing the end-of-run summary
//! - Writing markdown reports of discoveries and batch crawls
//! - Exporting discoveries as JSON

mod json;
mod markdown;
pub mod stats;

pub use json::{format_discovery_json, format_documents_json};
pub use markdown::{
    format_crawl_report, format_discovery_report, write_crawl_report, write_discovery_report,
};
pub use stats::{print_statistics, CrawlStatistics};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
