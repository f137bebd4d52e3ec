use crate::config::SiteConfig;

/// Filter applied to raw `href` targets before they are resolved
///
/// Matching runs on the raw attribute value, exactly as it appears in the
/// page, so relative and absolute links are treated alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkPattern {
    /// The target contains this literal substring
    Contains(String),

    /// The target contains the document marker, or its path ends with one of
    /// the allowlisted file extensions (case-insensitive)
    Document {
        marker: String,
        extensions: Vec<String>,
    },
}

impl LinkPattern {
    /// Project-detail links
    pub fn projects(site: &SiteConfig) -> Self {
        Self::Contains(site.project_marker.clone())
    }

    /// Procedure-documentation links
    pub fn procedures(site: &SiteConfig) -> Self {
        Self::Contains(site.procedure_marker.clone())
    }

    /// Document download links
    pub fn documents(site: &SiteConfig) -> Self {
        Self::Document {
            marker: site.document_marker.clone(),
            extensions: site.document_extensions.clone(),
        }
    }

    /// Checks a raw `href` value against the pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use via_harvest::url::LinkPattern;
    ///
    /// let pattern = LinkPattern::Contains("/it-IT/Oggetti/Info/".to_string());
    /// assert!(pattern.matches("/it-IT/Oggetti/Info/1234"));
    /// assert!(!pattern.matches("/it-IT/Oggetti/Documentazione/1234"));
    /// ```
    pub fn matches(&self, href: &str) -> bool {
        match self {
            Self::Contains(marker) => href.contains(marker.as_str()),
            Self::Document { marker, extensions } => {
                href.contains(marker.as_str()) || has_allowed_extension(href, extensions)
            }
        }
    }
}

/// Returns true if the path part of `href` ends in `.{ext}` for an allowed ext
fn has_allowed_extension(href: &str, extensions: &[String]) -> bool {
    match path_extension(href) {
        Some(ext) => extensions.iter().any(|allowed| *allowed == ext),
        None => false,
    }
}

/// Lowercased extension of the last path segment, ignoring query and fragment
pub fn path_extension(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let (stem, ext) = segment.rsplit_once('.')?;

    if stem.is_empty() || ext.is_empty() {
        return None;
    }

    Some(ext.to_lowercase())
}
