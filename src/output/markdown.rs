//! Markdown report generation
//!
//! This module renders discovery results (documents grouped by project and
//! procedure) and batch crawl outcomes as human-readable markdown.

use crate::crawler::CrawlReport;
use crate::model::{Discovery, DocumentRef};
use crate::output::stats::CrawlStatistics;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown discovery report to `output_path`
///
/// # Arguments
///
/// * `discovery` - Documents grouped by project and procedure
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn write_discovery_report(discovery: &Discovery, output_path: &Path) -> OutputResult<()> {
    write_markdown(&format_discovery_report(discovery), output_path)
}

/// Writes the markdown report of a batch crawl to `output_path`
pub fn write_crawl_report(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    write_markdown(&format_crawl_report(report), output_path)
}

fn write_markdown(markdown: &str, output_path: &Path) -> OutputResult<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    tracing::info!("Wrote report to {}", output_path.display());
    Ok(())
}

/// Formats a discovery as markdown
///
/// One section per project, one table per procedure listing its documents.
pub fn format_discovery_report(discovery: &Discovery) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "# VIA Document Discovery: {}\n\n",
        escape_cell(&discovery.keyword)
    ));
    md.push_str(&format!(
        "- **Generated**: {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    let stats = CrawlStatistics::from_discovery(discovery);
    push_discovery_stats(&mut md, &stats);
    md.push('\n');

    if discovery.projects.is_empty() {
        md.push_str("No projects found.\n");
    }

    for (index, listing) in discovery.projects.iter().enumerate() {
        md.push_str(&format!("## Project {}\n\n", index + 1));
        md.push_str(&format!("<{}>\n\n", listing.project.url));

        if listing.procedures.is_empty() {
            md.push_str("No procedures found.\n\n");
            continue;
        }

        for procedure in &listing.procedures {
            md.push_str(&format!("### Procedure <{}>\n\n", procedure.procedure.url));
            if procedure.truncated {
                md.push_str("> Listing may be incomplete.\n\n");
            }
            push_document_table(&mut md, &procedure.documents);
        }
    }

    if !discovery.failed_projects.is_empty() {
        md.push_str("## Skipped Projects\n\n");
        for project in &discovery.failed_projects {
            md.push_str(&format!("- <{}>\n", project.url));
        }
        md.push('\n');
    }

    md
}

/// Formats a batch crawl outcome as markdown
pub fn format_crawl_report(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "# VIA Crawl Report: {}\n\n",
        escape_cell(&report.keyword)
    ));
    md.push_str(&format!(
        "- **Generated**: {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    push_discovery_stats(&mut md, &report.stats);
    md.push_str(&format!("- **Saved**: {}\n", report.stats.downloads_saved));
    md.push_str(&format!("- **Skipped**: {}\n", report.stats.downloads_skipped));
    md.push_str(&format!("- **Failed**: {}\n\n", report.stats.downloads_failed));

    if report.results.is_empty() {
        md.push_str("No documents processed.\n");
        return md;
    }

    md.push_str("## Documents\n\n");
    md.push_str("| Outcome | URL | Detail |\n");
    md.push_str("|---------|-----|--------|\n");
    for result in &report.results {
        md.push_str(&format!(
            "| {} | {} | {} |\n",
            result.label(),
            escape_cell(result.url()),
            escape_cell(&result.to_string())
        ));
    }
    md.push('\n');

    md
}

fn push_discovery_stats(md: &mut String, stats: &CrawlStatistics) {
    md.push_str(&format!("- **Projects**: {}\n", stats.projects_processed));
    if stats.projects_failed > 0 {
        md.push_str(&format!("- **Projects skipped**: {}\n", stats.projects_failed));
    }
    md.push_str(&format!("- **Procedures**: {}\n", stats.procedures_found));
    md.push_str(&format!("- **Documents**: {}\n", stats.documents_found));
}

fn push_document_table(md: &mut String, documents: &[DocumentRef]) {
    if documents.is_empty() {
        md.push_str("No documents found.\n\n");
        return;
    }

    md.push_str("| Title | Date | Type | Size | Ext | URL |\n");
    md.push_str("|-------|------|------|------|-----|-----|\n");
    for doc in documents {
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            escape_cell(&doc.title),
            escape_cell(&doc.date),
            escape_cell(&doc.doc_type),
            escape_cell(&doc.size),
            doc.extension,
            escape_cell(&doc.url)
        ));
    }
    md.push('\n');
}

/// Keeps free text from breaking table rows
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\n', '\r'], " ")
}
