//! Crawl statistics
//!
//! Counters accumulated while a crawl runs, plus the end-of-run summary the
//! binary prints.

use crate::model::{Discovery, DownloadResult};

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Projects returned by search (after any max-projects cap)
    pub projects_found: u64,

    /// Projects whose page was fetched and walked
    pub projects_processed: u64,

    /// Projects skipped because their page could not be fetched
    pub projects_failed: u64,

    pub procedures_found: u64,

    /// Documents listed, after deduplication when enabled
    pub documents_found: u64,

    /// Document links dropped because their URL was already seen this run
    pub duplicates_skipped: u64,

    /// Listings that stopped on a fetch failure or the page cap
    pub truncated_listings: u64,

    pub downloads_saved: u64,
    pub downloads_skipped: u64,
    pub downloads_failed: u64,

    /// Bytes written by saved downloads
    pub bytes_written: u64,
}

impl CrawlStatistics {
    /// Counts everything a discovery run found
    pub fn from_discovery(discovery: &Discovery) -> Self {
        let truncated = discovery
            .projects
            .iter()
            .flat_map(|p| p.procedures.iter())
            .filter(|p| p.truncated)
            .count();

        Self {
            projects_found: (discovery.projects.len() + discovery.failed_projects.len()) as u64,
            projects_processed: discovery.projects.len() as u64,
            projects_failed: discovery.failed_projects.len() as u64,
            procedures_found: discovery.procedure_count() as u64,
            documents_found: discovery.document_count() as u64,
            duplicates_skipped: discovery.duplicates_skipped,
            truncated_listings: truncated as u64,
            ..Self::default()
        }
    }

    /// Records the outcome of one download
    pub fn record_download(&mut self, result: &DownloadResult) {
        match result {
            DownloadResult::Saved { bytes, .. } => {
                self.downloads_saved += 1;
                self.bytes_written += bytes;
            }
            DownloadResult::Skipped { .. } => self.downloads_skipped += 1,
            DownloadResult::Failed { .. } => self.downloads_failed += 1,
        }
    }

    /// Downloads attempted, whatever their outcome
    pub fn downloads_attempted(&self) -> u64 {
        self.downloads_saved + self.downloads_skipped + self.downloads_failed
    }

    /// Share of attempted downloads that produced or found a local file
    pub fn success_rate(&self) -> f64 {
        let attempted = self.downloads_attempted();
        if attempted == 0 {
            0.0
        } else {
            (self.downloads_saved + self.downloads_skipped) as f64 / attempted as f64 * 100.0
        }
    }

    /// Emits the summary as a single structured log event
    pub fn log_summary(&self) {
        tracing::info!(
            projects = self.projects_processed,
            projects_failed = self.projects_failed,
            procedures = self.procedures_found,
            documents = self.documents_found,
            saved = self.downloads_saved,
            skipped = self.downloads_skipped,
            failed = self.downloads_failed,
            "Crawl finished"
        );

        if self.truncated_listings > 0 {
            tracing::warn!(
                "{} listing(s) may be incomplete (fetch failure or page limit)",
                self.truncated_listings
            );
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Discovery:");
    println!("  Projects found: {}", stats.projects_found);
    println!("  Projects processed: {}", stats.projects_processed);
    if stats.projects_failed > 0 {
        println!("  Projects failed: {}", stats.projects_failed);
    }
    println!("  Procedures found: {}", stats.procedures_found);
    println!("  Documents found: {}", stats.documents_found);
    if stats.duplicates_skipped > 0 {
        println!("  Duplicate links ignored: {}", stats.duplicates_skipped);
    }
    if stats.truncated_listings > 0 {
        println!("  Possibly truncated listings: {}", stats.truncated_listings);
    }
    println!();

    if stats.downloads_attempted() > 0 {
        println!("Downloads:");
        println!("  Saved: {}", stats.downloads_saved);
        println!("  Skipped (already present): {}", stats.downloads_skipped);
        println!("  Failed: {}", stats.downloads_failed);
        println!(
            "  Bytes written: {}",
            crate::crawler::format_size(stats.bytes_written)
        );
        println!();

        println!(
            "Success Rate: {:.1}% ({} / {} documents available locally)",
            stats.success_rate(),
            stats.downloads_saved + stats.downloads_skipped,
            stats.downloads_attempted()
        );
    }
}
