//! Data model for the crawl pipeline
//!
//! This module defines the values that flow between pipeline stages:
//! search queries, the project → procedure → document reference hierarchy,
//! and the terminal outcome of each download.

mod discovery;
mod download_result;
mod refs;

pub use discovery::{Discovery, ProcedureListing, ProjectListing};
pub use download_result::{DownloadResult, FailureKind};
pub use refs::{
    DocumentRef, ProcedureRef, ProjectRef, SearchQuery, SearchType, DEFAULT_DOCUMENT_TYPE,
    NOT_AVAILABLE, UNTITLED_DOCUMENT,
};
