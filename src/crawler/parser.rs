//! HTML parser for extracting links and document metadata
//!
//! This module handles parsing listing pages to extract:
//! - Links matching a [`LinkPattern`] (projects, procedures, documents)
//! - Best-effort document metadata from the surrounding table row
//! - The "next page" marker driving pagination
//! - The document title from the metadata endpoint
//!
//! Extraction never fails: malformed or unexpected markup degrades to fewer
//! links or to sentinel metadata values.

use crate::crawler::resolver::{infer_extension, type_keyword_extension};
use crate::model::DocumentRef;
use crate::url::{has_query_value, resolve_link, LinkPattern};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// Cell label the metadata endpoint uses for the document title row
const METADATA_TITLE_LABEL: &str = "documento";

/// Longest cell text still considered a type classification
const MAX_TYPE_CELL_LEN: usize = 40;

fn date_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})\b|\b(\d{4})-(\d{2})-(\d{2})\b").ok()
    })
    .as_ref()
}

fn size_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b\d+(?:[.,]\d+)?\s?(?:bytes?|[kmgt]b)\b").ok())
        .as_ref()
}

/// Collects `<a href>` elements whose non-empty raw target matches `pattern`
fn matching_anchors<'a>(
    document: &'a Html,
    pattern: &LinkPattern,
) -> Vec<(ElementRef<'a>, &'a str)> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim();
            if href.is_empty() || !pattern.matches(href) {
                None
            } else {
                Some((element, href))
            }
        })
        .collect()
}

/// Extracts all links matching `pattern`, resolved against `base_url`
///
/// Order follows document order and duplicates are kept.
///
/// # Example
///
/// ```
/// use via_harvest::crawler::extract_links;
/// use via_harvest::url::LinkPattern;
/// use url::Url;
///
/// let html = r#"<a href="/it-IT/Oggetti/Info/42">Progetto</a><a href="/help">Aiuto</a>"#;
/// let base = Url::parse("https://va.mite.gov.it/it-IT/Ricerca/ViaLibera").unwrap();
/// let pattern = LinkPattern::Contains("/it-IT/Oggetti/Info/".to_string());
///
/// assert_eq!(
///     extract_links(html, &base, &pattern),
///     vec!["https://va.mite.gov.it/it-IT/Oggetti/Info/42".to_string()]
/// );
/// ```
pub fn extract_links(html: &str, base_url: &Url, pattern: &LinkPattern) -> Vec<String> {
    let document = Html::parse_document(html);

    matching_anchors(&document, pattern)
        .into_iter()
        .filter_map(|(_, href)| resolve_link(href, base_url))
        .collect()
}

/// Extracts document references with best-effort metadata
///
/// The title comes from the link text (or its `title` attribute). Date,
/// size and type are read from the cells of the enclosing table row or
/// list item when one exists. `allowlist` drives extension inference.
pub fn extract_documents(
    html: &str,
    base_url: &Url,
    pattern: &LinkPattern,
    allowlist: &[String],
) -> Vec<DocumentRef> {
    let document = Html::parse_document(html);

    matching_anchors(&document, pattern)
        .into_iter()
        .filter_map(|(element, href)| {
            let url = resolve_link(href, base_url)?;
            Some(document_from_anchor(element, url, allowlist))
        })
        .collect()
}

fn document_from_anchor(anchor: ElementRef<'_>, url: String, allowlist: &[String]) -> DocumentRef {
    let mut doc = DocumentRef::new(url);

    let text = collapse_whitespace(&anchor.text().collect::<String>());
    if !text.is_empty() {
        doc.title = text;
    } else if let Some(title) = anchor.value().attr("title") {
        let title = collapse_whitespace(title);
        if !title.is_empty() {
            doc.title = title;
        }
    }

    if let Some(container) = enclosing_container(anchor) {
        let cells = container_cells(container);

        if let Some(date) = cells.iter().find_map(|cell| find_date(cell)) {
            doc.date = date;
        }

        if let Some(size) = cells
            .iter()
            .find_map(|cell| size_regex()?.find(cell).map(|m| m.as_str().to_string()))
        {
            doc.size = size;
        }

        if let Some(doc_type) = cells.iter().find(|cell| {
            cell.as_str() != doc.title
                && cell.len() <= MAX_TYPE_CELL_LEN
                && type_keyword_extension(cell).is_some()
        }) {
            doc.doc_type = doc_type.clone();
        }
    }

    doc.extension = infer_extension(&doc.url, &doc.doc_type, allowlist);
    doc
}

/// Nearest `<tr>` or `<li>` ancestor of a link
fn enclosing_container(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| matches!(ancestor.value().name(), "tr" | "li"))
}

/// Text of each cell in a container, whitespace-collapsed, empties dropped
fn container_cells(container: ElementRef<'_>) -> Vec<String> {
    let css = if container.value().name() == "tr" {
        "td, th"
    } else {
        "span, small, div, p"
    };

    let mut cells: Vec<String> = Selector::parse(css)
        .map(|selector| {
            container
                .select(&selector)
                .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if cells.is_empty() {
        let whole = collapse_whitespace(&container.text().collect::<String>());
        if !whole.is_empty() {
            cells.push(whole);
        }
    }

    cells
}

/// Finds the first valid calendar date in `text`, formatted `DD/MM/YYYY`
fn find_date(text: &str) -> Option<String> {
    date_regex()?.captures_iter(text).find_map(|caps| {
        let (day, month, year) = if caps.get(1).is_some() {
            (caps.get(1)?, caps.get(2)?, caps.get(3)?)
        } else {
            (caps.get(6)?, caps.get(5)?, caps.get(4)?)
        };

        let date = NaiveDate::from_ymd_opt(
            year.as_str().parse().ok()?,
            month.as_str().parse().ok()?,
            day.as_str().parse().ok()?,
        )?;

        Some(date.format("%d/%m/%Y").to_string())
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns true if the page links to page `current_page + 1` of a listing
///
/// Scans every link on the page, resolves it against `base_url` and looks
/// for the query pair `{param}={current_page + 1}`. The registry exposes no
/// total-page count, so this marker is the only continuation signal.
pub fn has_next_page(html: &str, base_url: &Url, param: &str, current_page: u32) -> bool {
    let document = Html::parse_document(html);
    let next = (current_page + 1).to_string();

    let Ok(selector) = Selector::parse("a[href]") else {
        return false;
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .filter_map(|link| Url::parse(&link).ok())
        .any(|link| has_query_value(&link, param, &next))
}

/// Reads the human-readable title from a metadata endpoint page
///
/// Looks for a table row containing a cell labelled "Documento" and returns
/// the text of the next cell. Returns None if the structure is absent.
pub fn extract_metadata_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("tr").ok()?;
    let cell_selector = Selector::parse("td, th").ok()?;

    document.select(&row_selector).find_map(|row| {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
            .collect();

        let label = cells.iter().position(|cell| {
            cell.trim_end_matches(':').eq_ignore_ascii_case(METADATA_TITLE_LABEL)
        })?;

        cells
            .get(label + 1)
            .filter(|title| !title.is_empty())
            .cloned()
    })
}
