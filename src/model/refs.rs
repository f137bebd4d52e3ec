//! Reference types for the project → procedure → document hierarchy

use serde::Serialize;
use std::fmt;

/// Title used when a document link carries no readable text
pub const UNTITLED_DOCUMENT: &str = "Untitled Document";

/// Sentinel for dates and sizes that could not be extracted
pub const NOT_AVAILABLE: &str = "N/A";

/// Classification used when no type keyword was recognized
pub const DEFAULT_DOCUMENT_TYPE: &str = "Document";

/// Which registry index a keyword search runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchType {
    /// Search project records (`t=o`)
    Projects,
    /// Search individual documents (`t=d`)
    Documents,
}

impl SearchType {
    /// Value of the `t` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Projects => "o",
            Self::Documents => "d",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Projects => write!(f, "projects"),
            Self::Documents => write!(f, "documents"),
        }
    }
}

/// A single page of a keyword search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub search_type: SearchType,
    /// 1-based page index
    pub page: u32,
}

impl SearchQuery {
    pub fn new(keyword: impl Into<String>, search_type: SearchType, page: u32) -> Self {
        Self {
            keyword: keyword.into(),
            search_type,
            page: page.max(1),
        }
    }

    /// The same query, pointed at another page
    pub fn with_page(&self, page: u32) -> Self {
        Self::new(self.keyword.clone(), self.search_type, page)
    }
}

/// A project-detail page found in search results
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProjectRef {
    pub url: String,
}

/// A procedure-documentation listing reached from one project
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProcedureRef {
    pub url: String,
    /// URL of the project page this procedure was linked from
    pub project_url: String,
}

/// A downloadable document with best-effort listing metadata
///
/// Fields that could not be extracted hold documented sentinels rather than
/// being absent: [`UNTITLED_DOCUMENT`], [`NOT_AVAILABLE`] and
/// [`DEFAULT_DOCUMENT_TYPE`]. `extension` is lowercase without a leading dot
/// and is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRef {
    pub url: String,
    pub title: String,
    /// `DD/MM/YYYY` or [`NOT_AVAILABLE`]
    pub date: String,
    pub doc_type: String,
    pub size: String,
    pub extension: String,
}

impl DocumentRef {
    /// A reference carrying only its URL; every other field is a sentinel
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: UNTITLED_DOCUMENT.to_string(),
            date: NOT_AVAILABLE.to_string(),
            doc_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            size: NOT_AVAILABLE.to_string(),
            extension: "pdf".to_string(),
        }
    }

    /// Final path segment of the URL, used as the registry's document id
    pub fn document_id(&self) -> Option<&str> {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').next().filter(|segment| !segment.is_empty())
    }
}
