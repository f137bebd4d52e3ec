use url::Url;

/// Resolves a link href to an absolute URL
///
/// Relative targets are joined against `base_url` with standard URL-join
/// semantics; query strings and fragments are preserved.
///
/// Returns None if the link should be excluded:
/// - empty targets
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use url::Url;
/// use via_harvest::url::resolve_link;
///
/// let base = Url::parse("https://va.mite.gov.it/it-IT/Oggetti/Info/1").unwrap();
/// assert_eq!(
///     resolve_link("/File/Documento/9?v=2", &base),
///     Some("https://va.mite.gov.it/File/Documento/9?v=2".to_string())
/// );
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Returns true if any query pair of `url` is `param=value`
pub fn has_query_value(url: &Url, param: &str, value: &str) -> bool {
    url.query_pairs().any(|(k, v)| k == param && v == value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://va.mite.gov.it/it-IT/Oggetti/Documentazione/10/20").unwrap()
    }

    #[test]
    fn test_absolute_link() {
        assert_eq!(
            resolve_link("https://other.org/page", &base_url()),
            Some("https://other.org/page".to_string())
        );
    }

    #[test]
    fn test_root_relative_link() {
        assert_eq!(
            resolve_link("/File/Documento/1", &base_url()),
            Some("https://va.mite.gov.it/File/Documento/1".to_string())
        );
    }

    #[test]
    fn test_path_relative_link() {
        assert_eq!(
            resolve_link("21", &base_url()),
            Some("https://va.mite.gov.it/it-IT/Oggetti/Documentazione/10/21".to_string())
        );
    }

    #[test]
    fn test_query_only_link_keeps_path() {
        assert_eq!(
            resolve_link("?pagina=2", &base_url()),
            Some("https://va.mite.gov.it/it-IT/Oggetti/Documentazione/10/20?pagina=2".to_string())
        );
    }

    #[test]
    fn test_fragment_preserved() {
        assert_eq!(
            resolve_link("/File/Documento/1#p3", &base_url()),
            Some("https://va.mite.gov.it/File/Documento/1#p3".to_string())
        );
    }

    #[test]
    fn test_skip_special_schemes() {
        assert_eq!(resolve_link("javascript:void(0)", &base_url()), None);
        assert_eq!(resolve_link("JavaScript:void(0)", &base_url()), None);
        assert_eq!(resolve_link("mailto:info@mite.gov.it", &base_url()), None);
        assert_eq!(resolve_link("tel:+390657221", &base_url()), None);
        assert_eq!(resolve_link("data:text/html,<h1>x</h1>", &base_url()), None);
        assert_eq!(resolve_link("ftp://files.example.org/a.pdf", &base_url()), None);
    }

    #[test]
    fn test_skip_empty() {
        assert_eq!(resolve_link("", &base_url()), None);
        assert_eq!(resolve_link("   ", &base_url()), None);
    }

    #[test]
    fn test_has_query_value() {
        let url = Url::parse("https://x.org/s?Testo=a+b&t=o&p=2").unwrap();
        assert!(has_query_value(&url, "p", "2"));
        assert!(has_query_value(&url, "Testo", "a b"));
        assert!(!has_query_value(&url, "p", "20"));
        assert!(!has_query_value(&url, "pagina", "2"));
    }
}
