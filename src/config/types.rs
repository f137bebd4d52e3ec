use serde::Deserialize;

/// Main configuration structure for via-harvest
///
/// Every section and key is optional; missing values fall back to the
/// defaults for the public VIA registry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub http: HttpConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// Target site layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host all relative paths are joined against
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the keyword search endpoint
    #[serde(rename = "search-path")]
    pub search_path: String,

    /// Path of the per-document metadata endpoint (document id is appended)
    #[serde(rename = "metadata-path")]
    pub metadata_path: String,

    /// Substring identifying project-detail links
    #[serde(rename = "project-marker")]
    pub project_marker: String,

    /// Substring identifying procedure-documentation links
    #[serde(rename = "procedure-marker")]
    pub procedure_marker: String,

    /// Substring identifying document download links
    #[serde(rename = "document-marker")]
    pub document_marker: String,

    /// File extensions (lowercase, no dot) recognized as documents
    #[serde(rename = "document-extensions")]
    pub document_extensions: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://va.mite.gov.it".to_string(),
            search_path: "/it-IT/Ricerca/ViaLibera".to_string(),
            metadata_path: "/it-IT/Oggetti/MetadatoDocumento".to_string(),
            project_marker: "/it-IT/Oggetti/Info/".to_string(),
            procedure_marker: "/it-IT/Oggetti/Documentazione/".to_string(),
            document_marker: "/File/Documento/".to_string(),
            document_extensions: DEFAULT_DOCUMENT_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// Extensions the registry is known to serve
pub const DEFAULT_DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "rtf", "txt", "csv", "xml",
    "zip", "rar", "7z", "p7m", "dwg", "dxf", "kmz", "kml", "shp", "jpg", "jpeg", "png", "tif",
    "tiff",
];

/// Headers and timeouts for every request in a session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Browser-like User-Agent; the registry may reject bare clients
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept")]
    pub accept: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,

    /// Deadline for listing page fetches (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Deadline for a whole document download (seconds)
    #[serde(rename = "download-timeout-secs")]
    pub download_timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            request_timeout_secs: 10,
            download_timeout_secs: 20,
            connect_timeout_secs: 10,
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Fixed sleep between consecutive network-bound steps (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Truncate the project list after this many entries
    #[serde(rename = "max-projects")]
    pub max_projects: Option<usize>,

    /// Upper bound on pages fetched for a single listing
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Drop document URLs already seen earlier in the same run
    #[serde(rename = "deduplicate-documents")]
    pub deduplicate_documents: bool,

    /// Query parameter carrying the search results page index
    #[serde(rename = "search-page-param")]
    pub search_page_param: String,

    /// Query parameter carrying the procedure documentation page index
    #[serde(rename = "procedure-page-param")]
    pub procedure_page_param: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay_ms: 2000,
            max_projects: None,
            max_pages: 200,
            deduplicate_documents: false,
            search_page_param: "p".to_string(),
            procedure_page_param: "pagina".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Flat directory all downloaded documents land in
    #[serde(rename = "download-dir")]
    pub download_dir: String,

    /// Where discovery mode writes its markdown report, if anywhere
    #[serde(rename = "report-path")]
    pub report_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            download_dir: "downloads".to_string(),
            report_path: None,
        }
    }
}
