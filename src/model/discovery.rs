//! Discovery results grouped along the registry hierarchy

use crate::model::{DocumentRef, ProcedureRef, ProjectRef};
use serde::Serialize;

/// Documents found in one procedure listing
#[derive(Debug, Clone, Serialize)]
pub struct ProcedureListing {
    pub procedure: ProcedureRef,
    pub documents: Vec<DocumentRef>,

    /// True when the listing stopped on a fetch failure or the page cap
    pub truncated: bool,
}

/// Procedures found on one project page
#[derive(Debug, Clone, Serialize)]
pub struct ProjectListing {
    pub project: ProjectRef,
    pub procedures: Vec<ProcedureListing>,
}

impl ProjectListing {
    pub fn document_count(&self) -> usize {
        self.procedures.iter().map(|p| p.documents.len()).sum()
    }
}

/// Everything discovered for one keyword
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub keyword: String,
    pub projects: Vec<ProjectListing>,

    /// Projects returned by search whose page could not be processed
    pub failed_projects: Vec<ProjectRef>,

    /// Document links dropped as already seen, when deduplication is enabled
    pub duplicates_skipped: u64,
}

impl Discovery {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            projects: Vec::new(),
            failed_projects: Vec::new(),
            duplicates_skipped: 0,
        }
    }

    /// All documents in discovery order
    pub fn documents(&self) -> impl Iterator<Item = &DocumentRef> {
        self.projects
            .iter()
            .flat_map(|project| project.procedures.iter())
            .flat_map(|procedure| procedure.documents.iter())
    }

    pub fn procedure_count(&self) -> usize {
        self.projects.iter().map(|p| p.procedures.len()).sum()
    }

    pub fn document_count(&self) -> usize {
        self.projects.iter().map(ProjectListing::document_count).sum()
    }
}
