//! Crawler coordinator - main crawl orchestration logic
//!
//! This module walks the registry hierarchy for one keyword:
//! - Paginated keyword search yielding project pages
//! - One fetch per project page yielding procedure listings
//! - Paginated procedure listings yielding document references
//! - Downloading every document (batch mode) or returning them (discovery)
//!
//! Every run opens its own [`Session`] and works strictly sequentially. A
//! failure inside one project is logged and that project is skipped; it never
//! aborts the run.

use crate::config::Config;
use crate::crawler::downloader::Downloader;
use crate::crawler::paginator::{PaginationOutcome, Paginator, StopReason};
use crate::crawler::parser::{
    extract_documents, extract_links, extract_metadata_title, has_next_page,
};
use crate::crawler::resolver::{resolve_metadata, ResponseHints};
use crate::crawler::session::{RequestOptions, Session};
use crate::model::{
    Discovery, DocumentRef, DownloadResult, ProcedureListing, ProcedureRef, ProjectListing,
    ProjectRef, SearchQuery, SearchType,
};
use crate::output::CrawlStatistics;
use crate::url::{build_search_url, listing_page_url, metadata_url, LinkPattern};
use crate::{ConfigError, HarvestError, UrlResult};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Outcome of a batch crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub keyword: String,

    /// One entry per document, in crawl order
    pub results: Vec<DownloadResult>,

    pub stats: CrawlStatistics,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    paginator: Paginator,
    downloader: Downloader,
    project_pattern: LinkPattern,
    procedure_pattern: LinkPattern,
    document_pattern: LinkPattern,
    page_options: RequestOptions,
    delay: Duration,
    describe_listed: bool,
}

/// Document URLs already listed in this run, when deduplication is enabled
struct SeenDocuments(Option<HashSet<String>>);

impl SeenDocuments {
    fn new(enabled: bool) -> Self {
        Self(enabled.then(HashSet::new))
    }

    /// Drops documents whose URL was already seen; returns how many were dropped
    fn retain_new(&mut self, documents: &mut Vec<DocumentRef>) -> u64 {
        let Some(seen) = self.0.as_mut() else {
            return 0;
        };

        let before = documents.len();
        documents.retain(|doc| seen.insert(doc.url.clone()));
        (before - documents.len()) as u64
    }
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// No network activity happens here; each crawl operation opens its own
    /// session.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The configured base URL is unusable
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        crate::url::base_url(&config.site)?;

        Ok(Self {
            paginator: Paginator::from_config(&config.crawler),
            downloader: Downloader::from_config(&config),
            project_pattern: LinkPattern::projects(&config.site),
            procedure_pattern: LinkPattern::procedures(&config.site),
            document_pattern: LinkPattern::documents(&config.site),
            page_options: RequestOptions::page(&config.http),
            delay: Duration::from_millis(config.crawler.request_delay_ms),
            describe_listed: false,
            config,
        })
    }

    /// Makes [`Coordinator::discover`] and [`Coordinator::search_documents`]
    /// complete every listed document with [`Coordinator::describe`], inside
    /// the same session that listed it
    pub fn describing(mut self, enabled: bool) -> Self {
        self.describe_listed = enabled;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Rejects keywords that cannot produce a meaningful search
    ///
    /// Returns the trimmed keyword.
    pub fn validate_keyword(keyword: &str) -> Result<String, HarvestError> {
        let trimmed = keyword.trim();

        if trimmed.is_empty() {
            return Err(HarvestError::InvalidKeyword(
                "keyword must not be empty".to_string(),
            ));
        }

        if trimmed.chars().any(char::is_control) {
            return Err(HarvestError::InvalidKeyword(format!(
                "keyword contains control characters: {:?}",
                trimmed
            )));
        }

        Ok(trimmed.to_string())
    }

    fn project_limit(&self, max_projects: Option<usize>) -> Result<Option<usize>, HarvestError> {
        match max_projects.or(self.config.crawler.max_projects) {
            Some(0) => Err(ConfigError::Validation(
                "max-projects must be at least 1".to_string(),
            )
            .into()),
            limit => Ok(limit),
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    /// Paginates keyword search results into project references
    ///
    /// The result is truncated to `max_projects` when set.
    pub async fn get_projects(
        &self,
        session: &Session,
        keyword: &str,
        max_projects: Option<usize>,
    ) -> Result<PaginationOutcome<ProjectRef>, HarvestError> {
        let site = &self.config.site;
        let crawler = &self.config.crawler;
        let query = SearchQuery::new(keyword, SearchType::Projects, 1);
        let search_url = build_search_url(site, crawler, &query)?;

        let mut outcome = self
            .paginator
            .paginate(
                "search",
                move |page| {
                    fetch_listing(session, build_search_url(site, crawler, &query.with_page(page)))
                },
                |html| {
                    extract_links(html, &search_url, &self.project_pattern)
                        .into_iter()
                        .map(|url| ProjectRef { url })
                        .collect()
                },
                |html, page| has_next_page(html, &search_url, &crawler.search_page_param, page),
            )
            .await;

        if let Some(limit) = max_projects {
            if outcome.items.len() > limit {
                tracing::debug!("Limiting {} projects to {}", outcome.items.len(), limit);
                outcome.items.truncate(limit);
            }
        }

        tracing::info!(
            "Found {} projects for '{}' in {} search page(s)",
            outcome.items.len(),
            keyword,
            outcome.pages_fetched
        );

        Ok(outcome)
    }

    /// Fetches one project page and extracts its procedure listings
    ///
    /// Project pages are not paginated. An error here means the whole project
    /// is skipped by the caller.
    pub async fn get_procedures(
        &self,
        session: &Session,
        project: &ProjectRef,
    ) -> Result<Vec<ProcedureRef>, HarvestError> {
        let base = Url::parse(&project.url)?;
        let html = session.get_text(&project.url).await?;

        let procedures: Vec<ProcedureRef> = extract_links(&html, &base, &self.procedure_pattern)
            .into_iter()
            .map(|url| ProcedureRef {
                url,
                project_url: project.url.clone(),
            })
            .collect();

        if procedures.is_empty() {
            tracing::warn!("No procedures found on project page {}", project.url);
        } else {
            tracing::debug!("Found {} procedures on {}", procedures.len(), project.url);
        }

        Ok(procedures)
    }

    /// Paginates one procedure listing into document references
    ///
    /// Never fails: a fetch error ends the listing with what was gathered.
    pub async fn get_documents(
        &self,
        session: &Session,
        procedure: &ProcedureRef,
    ) -> PaginationOutcome<DocumentRef> {
        let base = match Url::parse(&procedure.url) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Skipping procedure with malformed URL {}: {}", procedure.url, e);
                return PaginationOutcome {
                    items: Vec::new(),
                    pages_fetched: 0,
                    stop: StopReason::FetchFailed {
                        page: 1,
                        error: e.to_string(),
                    },
                };
            }
        };

        let param = self.config.crawler.procedure_page_param.as_str();
        let listing = procedure.url.as_str();
        let allowlist = &self.config.site.document_extensions;

        let outcome = self
            .paginator
            .paginate(
                "procedure",
                move |page| fetch_listing(session, listing_page_url(listing, param, page)),
                |html| extract_documents(html, &base, &self.document_pattern, allowlist),
                |html, page| has_next_page(html, &base, param, page),
            )
            .await;

        if outcome.is_truncated() {
            tracing::warn!(
                "Document listing {} may be incomplete: {}",
                procedure.url,
                outcome.stop
            );
        }

        tracing::info!(
            "Found {} documents in procedure {}",
            outcome.items.len(),
            procedure.url
        );

        outcome
    }

    /// Lists one procedure's documents, applying run-level deduplication
    async fn procedure_listing(
        &self,
        session: &Session,
        procedure: ProcedureRef,
        seen: &mut SeenDocuments,
    ) -> (ProcedureListing, u64) {
        let outcome = self.get_documents(session, &procedure).await;
        let truncated = outcome.is_truncated();
        let mut documents = outcome.items;
        let duplicates = seen.retain_new(&mut documents);

        if duplicates > 0 {
            tracing::debug!(
                "Ignored {} already-listed documents in {}",
                duplicates,
                procedure.url
            );
        }

        (
            ProcedureListing {
                procedure,
                documents,
                truncated,
            },
            duplicates,
        )
    }

    /// Discovers every document for `keyword` without downloading anything
    ///
    /// # Arguments
    ///
    /// * `keyword` - Search keyword, rejected before any request when blank
    /// * `max_projects` - Optional cap on projects, overriding the configured one
    ///
    /// # Returns
    ///
    /// * `Ok(Discovery)` - Documents grouped by project and procedure
    /// * `Err(HarvestError)` - Invalid input or the session could not be opened
    pub async fn discover(
        &self,
        keyword: &str,
        max_projects: Option<usize>,
    ) -> Result<Discovery, HarvestError> {
        let keyword = Self::validate_keyword(keyword)?;
        let limit = self.project_limit(max_projects)?;

        let session = Session::open(&self.config).await?;
        let projects = self.get_projects(&session, &keyword, limit).await?.items;

        let mut discovery = Discovery::new(keyword);
        let mut seen = SeenDocuments::new(self.config.crawler.deduplicate_documents);

        for (index, project) in projects.into_iter().enumerate() {
            if index > 0 {
                self.pause().await;
            }

            let procedures = match self.get_procedures(&session, &project).await {
                Ok(procedures) => procedures,
                Err(e) => {
                    tracing::warn!("Skipping project {}: {}", project.url, e);
                    discovery.failed_projects.push(project);
                    continue;
                }
            };

            let mut listings = Vec::with_capacity(procedures.len());
            for procedure in procedures {
                self.pause().await;
                let (mut listing, duplicates) =
                    self.procedure_listing(&session, procedure, &mut seen).await;
                discovery.duplicates_skipped += duplicates;
                self.describe_listed_documents(&session, &mut listing.documents).await;
                listings.push(listing);
            }

            discovery.projects.push(ProjectListing {
                project,
                procedures: listings,
            });
        }

        tracing::info!(
            "Discovered {} documents in {} procedures across {} projects ({} requests)",
            discovery.document_count(),
            discovery.procedure_count(),
            discovery.projects.len(),
            session.request_count()
        );

        Ok(discovery)
    }

    /// Discovers and downloads every document for `keyword`
    ///
    /// Documents are downloaded as soon as their procedure listing has been
    /// read, with the politeness delay after every download and between
    /// projects.
    ///
    /// # Arguments
    ///
    /// * `keyword` - Search keyword, rejected before any request when blank
    /// * `max_projects` - Optional cap on projects, overriding the configured one
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - One `DownloadResult` per document plus run statistics
    /// * `Err(HarvestError)` - Invalid input or the session could not be opened
    pub async fn run_crawl(
        &self,
        keyword: &str,
        max_projects: Option<usize>,
    ) -> Result<CrawlReport, HarvestError> {
        let keyword = Self::validate_keyword(keyword)?;
        let limit = self.project_limit(max_projects)?;

        let session = Session::open(&self.config).await?;
        let projects = self.get_projects(&session, &keyword, limit).await?.items;

        let mut stats = CrawlStatistics {
            projects_found: projects.len() as u64,
            ..CrawlStatistics::default()
        };
        let mut results = Vec::new();
        let mut seen = SeenDocuments::new(self.config.crawler.deduplicate_documents);

        tracing::info!(
            "Downloading into {}",
            self.downloader.destination().display()
        );

        for (index, project) in projects.iter().enumerate() {
            if index > 0 {
                self.pause().await;
            }
            tracing::info!(
                "Processing project {}/{}: {}",
                index + 1,
                projects.len(),
                project.url
            );

            let procedures = match self.get_procedures(&session, project).await {
                Ok(procedures) => procedures,
                Err(e) => {
                    tracing::warn!("Skipping project {}: {}", project.url, e);
                    stats.projects_failed += 1;
                    continue;
                }
            };
            stats.procedures_found += procedures.len() as u64;

            for procedure in procedures {
                self.pause().await;
                let (listing, duplicates) =
                    self.procedure_listing(&session, procedure, &mut seen).await;

                stats.duplicates_skipped += duplicates;
                stats.documents_found += listing.documents.len() as u64;
                if listing.truncated {
                    stats.truncated_listings += 1;
                }

                for document in &listing.documents {
                    self.pause().await;
                    let result = self.downloader.download(&session, &document.url).await;
                    stats.record_download(&result);
                    results.push(result);
                }
            }

            stats.projects_processed += 1;
        }

        stats.log_summary();

        Ok(CrawlReport {
            keyword,
            results,
            stats,
        })
    }

    /// Searches in document mode (`t=d`) and returns the documents listed
    /// directly in the results
    pub async fn search_documents(&self, keyword: &str) -> Result<Vec<DocumentRef>, HarvestError> {
        let keyword = Self::validate_keyword(keyword)?;
        let site = &self.config.site;
        let crawler = &self.config.crawler;
        let query = SearchQuery::new(keyword.as_str(), SearchType::Documents, 1);
        let search_url = build_search_url(site, crawler, &query)?;

        let session = Session::open(&self.config).await?;
        let session = &session;

        let outcome = self
            .paginator
            .paginate(
                "document search",
                move |page| {
                    fetch_listing(session, build_search_url(site, crawler, &query.with_page(page)))
                },
                |html| {
                    extract_documents(
                        html,
                        &search_url,
                        &self.document_pattern,
                        &site.document_extensions,
                    )
                },
                |html, page| has_next_page(html, &search_url, &crawler.search_page_param, page),
            )
            .await;

        let mut documents = outcome.items;
        let duplicates =
            SeenDocuments::new(crawler.deduplicate_documents).retain_new(&mut documents);
        self.describe_listed_documents(session, &mut documents).await;

        tracing::info!(
            "Document search for '{}' found {} documents ({} duplicates ignored)",
            keyword,
            documents.len(),
            duplicates
        );

        Ok(documents)
    }

    /// Completes one document's metadata without downloading its body
    ///
    /// Issues a HEAD request for size/type/filename hints and reads the
    /// title row of the metadata endpoint. Never fails: anything that cannot
    /// be fetched leaves the listing values in place.
    pub async fn describe(&self, session: &Session, document: &DocumentRef) -> DocumentRef {
        let allowlist = &self.config.site.document_extensions;

        let hints = match session.head(&document.url, self.page_options).await {
            Ok(response) => Some(ResponseHints::from_response(&response)),
            Err(e) => {
                tracing::warn!("HEAD {} failed: {}", document.url, e);
                None
            }
        };

        let mut resolved = resolve_metadata(document, hints.as_ref(), allowlist);

        let Some(id) = document.document_id() else {
            return resolved;
        };

        let url = match metadata_url(&self.config.site, id) {
            Ok(url) => url,
            Err(e) => {
                tracing::debug!("No metadata URL for {}: {}", document.url, e);
                return resolved;
            }
        };

        match session.get_text(url.as_str()).await {
            Ok(html) => match extract_metadata_title(&html) {
                Some(title) => resolved.title = title,
                None => tracing::debug!("No title row in metadata for {}", id),
            },
            Err(e) => tracing::warn!("Metadata lookup for {} failed: {}", id, e),
        }

        resolved
    }

    async fn describe_listed_documents(&self, session: &Session, documents: &mut [DocumentRef]) {
        if !self.describe_listed {
            return;
        }
        for document in documents.iter_mut() {
            *document = self.describe(session, document).await;
        }
    }
}

/// Fetches a listing page once its URL has been built
async fn fetch_listing(session: &Session, url: UrlResult<Url>) -> Result<String, HarvestError> {
    let url = url?;
    session.get_text(url.as_str()).await
}
