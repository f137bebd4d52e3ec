//! Listing pagination
//!
//! The registry exposes three paginated listings (search results, procedure
//! documentation and document search) with the same shape: a page number in
//! a query parameter, items on the page, and a link to the following page
//! when more results exist. [`Paginator::paginate`] drives that loop once for
//! any of them.

use crate::config::CrawlerConfig;
use crate::HarvestError;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Why a pagination loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The page yielded zero items
    EmptyPage { page: u32 },

    /// The page had items but no link to the following page
    NoNextPage { page: u32 },

    /// Fetching the page failed; items from earlier pages are kept
    FetchFailed { page: u32, error: String },

    /// The configured page cap was reached while a next page was still advertised
    PageLimit { page: u32 },
}

impl StopReason {
    /// Page number the loop stopped at
    pub fn page(&self) -> u32 {
        match self {
            StopReason::EmptyPage { page }
            | StopReason::NoNextPage { page }
            | StopReason::FetchFailed { page, .. }
            | StopReason::PageLimit { page } => *page,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EmptyPage { page } => write!(f, "page {} was empty", page),
            StopReason::NoNextPage { page } => write!(f, "no next page after page {}", page),
            StopReason::FetchFailed { page, error } => {
                write!(f, "fetching page {} failed: {}", page, error)
            }
            StopReason::PageLimit { page } => write!(f, "page limit reached at page {}", page),
        }
    }
}

/// Items accumulated across pages and the reason the loop ended
#[derive(Debug, Clone)]
pub struct PaginationOutcome<T> {
    pub items: Vec<T>,
    pub pages_fetched: u32,
    pub stop: StopReason,
}

impl<T> PaginationOutcome<T> {
    /// True when the listing may hold results that were never fetched
    pub fn is_truncated(&self) -> bool {
        matches!(
            self.stop,
            StopReason::FetchFailed { .. } | StopReason::PageLimit { .. }
        )
    }
}

/// Drives fetch/extract cycles over a paginated listing
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    delay: Duration,
    max_pages: u32,
}

impl Paginator {
    pub fn new(delay: Duration, max_pages: u32) -> Self {
        Self {
            delay,
            max_pages: max_pages.max(1),
        }
    }

    pub fn from_config(crawler: &CrawlerConfig) -> Self {
        Self::new(
            Duration::from_millis(crawler.request_delay_ms),
            crawler.max_pages,
        )
    }

    /// Walks a listing from page 1 until it ends
    ///
    /// # Arguments
    ///
    /// * `label` - Listing name used in log lines
    /// * `fetch_page` - Fetches the HTML of a 1-based page
    /// * `extract` - Extracts the items of one page
    /// * `has_next` - Given a page's HTML and number, reports whether a following page is advertised
    ///
    /// # Returns
    ///
    /// The items of every fetched page in order. An empty page ends the loop
    /// even when it advertises a next page. A fetch error ends the loop and
    /// keeps what was accumulated; it is never returned as an error.
    pub async fn paginate<T, F, Fut, X, H>(
        &self,
        label: &str,
        mut fetch_page: F,
        extract: X,
        has_next: H,
    ) -> PaginationOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<String, HarvestError>>,
        X: Fn(&str) -> Vec<T>,
        H: Fn(&str, u32) -> bool,
    {
        let mut items = Vec::new();
        let mut page = 1;
        let mut pages_fetched = 0;

        let stop = loop {
            let html = match fetch_page(page).await {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!(
                        listing = label,
                        page,
                        "Pagination aborted, keeping {} items: {}",
                        items.len(),
                        e
                    );
                    break StopReason::FetchFailed {
                        page,
                        error: e.to_string(),
                    };
                }
            };
            pages_fetched += 1;

            let found = extract(&html);
            tracing::debug!(listing = label, page, "Found {} items", found.len());

            if found.is_empty() {
                break StopReason::EmptyPage { page };
            }
            items.extend(found);

            if !has_next(&html, page) {
                break StopReason::NoNextPage { page };
            }

            if page >= self.max_pages {
                tracing::warn!(
                    listing = label,
                    page,
                    "Page limit of {} reached, listing may be truncated",
                    self.max_pages
                );
                break StopReason::PageLimit { page };
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            page += 1;
        };

        tracing::debug!(listing = label, "Pagination stopped: {}", stop);

        PaginationOutcome {
            items,
            pages_fetched,
            stop,
        }
    }
}
