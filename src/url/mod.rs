//! URL handling module for via-harvest
//!
//! This module builds request URLs for the registry endpoints, resolves
//! relative links against the page they were found on, and decides which
//! links belong to which level of the project → procedure → document
//! hierarchy.

mod matcher;
mod resolve;

use crate::config::{CrawlerConfig, SiteConfig};
use crate::model::SearchQuery;
use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use matcher::{path_extension, LinkPattern};
pub use resolve::{has_query_value, resolve_link};

/// Parses the configured base URL
pub fn base_url(site: &SiteConfig) -> UrlResult<Url> {
    let url = Url::parse(&site.base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    Ok(url)
}

/// Builds the search endpoint URL for one page of a keyword search
///
/// `GET {base}{search-path}?Testo={keyword}&t={o|d}&p={page}`
///
/// # Examples
///
/// ```
/// use via_harvest::config::{CrawlerConfig, SiteConfig};
/// use via_harvest::model::{SearchQuery, SearchType};
/// use via_harvest::url::build_search_url;
///
/// let query = SearchQuery::new("autostrada A1", SearchType::Projects, 2);
/// let url = build_search_url(&SiteConfig::default(), &CrawlerConfig::default(), &query).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://va.mite.gov.it/it-IT/Ricerca/ViaLibera?Testo=autostrada+A1&t=o&p=2"
/// );
/// ```
pub fn build_search_url(
    site: &SiteConfig,
    crawler: &CrawlerConfig,
    query: &SearchQuery,
) -> UrlResult<Url> {
    let mut url = base_url(site)?
        .join(&site.search_path)
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    url.query_pairs_mut()
        .clear()
        .append_pair("Testo", &query.keyword)
        .append_pair("t", query.search_type.as_param())
        .append_pair(&crawler.search_page_param, &query.page.to_string());

    Ok(url)
}

/// Builds the URL of one page of a paginated listing
///
/// Page 1 is the listing URL itself; later pages carry `{param}={page}`,
/// replacing any page parameter already present.
pub fn listing_page_url(listing_url: &str, param: &str, page: u32) -> UrlResult<Url> {
    let mut url = Url::parse(listing_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if page <= 1 {
        return Ok(url);
    }

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(param, &page.to_string());
    }

    Ok(url)
}

/// Builds the metadata endpoint URL for a document id
///
/// `GET {base}{metadata-path}/{documentId}`
pub fn metadata_url(site: &SiteConfig, document_id: &str) -> UrlResult<Url> {
    if document_id.is_empty() {
        return Err(UrlError::MissingDocumentId(document_id.to_string()));
    }

    let path = format!(
        "{}/{}",
        site.metadata_path.trim_end_matches('/'),
        urlencoding::encode(document_id)
    );

    base_url(site)?
        .join(&path)
        .map_err(|e| UrlError::Parse(e.to_string()))
}
