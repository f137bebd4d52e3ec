//! Document resolver
//!
//! Derives a canonical local filename for a downloaded document from
//! inconsistent server hints, and merges response headers into the
//! best-effort metadata captured from listing pages.
//!
//! # Filename precedence
//!
//! 1. `Content-Disposition` `filename*` / `filename` parameter (base name only)
//! 2. Final path segment of the resolved response URL
//! 3. `doc_<unix-timestamp>.pdf`
//!
//! A name without an extension always gets `.pdf` appended.

use crate::model::{DocumentRef, DEFAULT_DOCUMENT_TYPE, NOT_AVAILABLE};
use crate::url::path_extension;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Response;
use url::Url;

/// Extension used whenever none can be inferred
pub const FALLBACK_EXTENSION: &str = "pdf";

/// Type keywords (as they appear in listing cells) and the extension they imply
const TYPE_KEYWORDS: &[(&str, &str)] = &[
    ("pdf", "pdf"),
    ("word", "docx"),
    ("docx", "docx"),
    ("doc", "doc"),
    ("excel", "xlsx"),
    ("xlsx", "xlsx"),
    ("xls", "xls"),
    ("foglio", "xlsx"),
    ("powerpoint", "pptx"),
    ("zip", "zip"),
    ("archivio", "zip"),
    ("archive", "zip"),
    ("rar", "rar"),
    ("p7m", "p7m"),
    ("firmato", "p7m"),
    ("dwg", "dwg"),
    ("cad", "dwg"),
    ("kmz", "kmz"),
    ("shapefile", "shp"),
    ("immagine", "jpg"),
    ("image", "jpg"),
    ("jpg", "jpg"),
    ("jpeg", "jpg"),
    ("png", "png"),
    ("tiff", "tif"),
    ("testo", "txt"),
    ("text", "txt"),
    ("csv", "csv"),
    ("xml", "xml"),
];

/// Content-Type essences and the extension they imply
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("application/vnd.ms-excel", "xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    ("application/zip", "zip"),
    ("application/x-zip-compressed", "zip"),
    ("application/x-rar-compressed", "rar"),
    ("application/vnd.rar", "rar"),
    ("application/pkcs7-mime", "p7m"),
    ("application/x-pkcs7-mime", "p7m"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/tiff", "tif"),
    ("text/plain", "txt"),
    ("text/csv", "csv"),
    ("application/xml", "xml"),
    ("text/xml", "xml"),
];

/// The response hints the resolver consumes
///
/// Decoupled from `reqwest::Response` so GET and HEAD responses (and tests)
/// feed the same logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHints {
    /// URL after redirects
    pub final_url: Url,
    pub content_disposition: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
}

impl ResponseHints {
    pub fn from_response(response: &Response) -> Self {
        Self::from_headers(response.url().clone(), response.headers())
    }

    pub fn from_headers(final_url: Url, headers: &HeaderMap) -> Self {
        Self {
            final_url,
            content_disposition: header_text(headers, CONTENT_DISPOSITION),
            content_type: header_text(headers, CONTENT_TYPE),
            content_length: header_text(headers, CONTENT_LENGTH)
                .and_then(|v| v.trim().parse().ok()),
        }
    }
}

fn header_text(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Resolves the local filename for a response, using the current time for
/// the synthesized fallback name
pub fn resolve_filename(hints: &ResponseHints) -> String {
    resolve_filename_at(hints, chrono::Utc::now().timestamp())
}

/// Resolves the local filename with an explicit fallback timestamp
///
/// # Examples
///
/// ```
/// use url::Url;
/// use via_harvest::crawler::{resolve_filename_at, ResponseHints};
///
/// let hints = ResponseHints {
///     final_url: Url::parse("https://va.mite.gov.it/File/Documento/123").unwrap(),
///     content_disposition: Some(r#"attachment; filename="report.docx""#.to_string()),
///     content_type: None,
///     content_length: None,
/// };
/// assert_eq!(resolve_filename_at(&hints, 0), "report.docx");
/// ```
pub fn resolve_filename_at(hints: &ResponseHints, timestamp: i64) -> String {
    let name = hints
        .content_disposition
        .as_deref()
        .and_then(filename_from_content_disposition)
        .or_else(|| filename_from_url(&hints.final_url))
        .unwrap_or_else(|| format!("doc_{}.{}", timestamp, FALLBACK_EXTENSION));

    ensure_extension(name)
}

/// Extracts the filename declared by a `Content-Disposition` header
///
/// `filename*` (RFC 5987 encoded) wins over `filename` when both are present.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(header) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };

        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = decode_extended_value(value.trim()),
            "filename" => plain = Some(unquote(value.trim())),
            _ => {}
        }
    }

    extended
        .and_then(|v| sanitize_filename(&v))
        .or_else(|| plain.and_then(|v| sanitize_filename(&v)))
}

/// Splits header parameters on `;`, ignoring separators inside quotes
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in header.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&header[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&header[start..]);

    params
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim_matches(|c| c == '"' || c == '\'');
    trimmed.replace("\\\"", "\"")
}

/// Decodes `charset'lang'percent-encoded` values
fn decode_extended_value(value: &str) -> Option<String> {
    let value = unquote(value);
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?.to_ascii_lowercase();
    let _language = parts.next()?;
    let encoded = parts.next()?;

    if charset == "utf-8" || charset.is_empty() {
        urlencoding::decode(encoded).ok().map(|s| s.into_owned())
    } else {
        // ISO-8859-1 and friends: bytes map directly onto the first 256 code points
        let bytes = urlencoding::decode_binary(encoded.as_bytes());
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}

/// Final path segment of a URL, percent-decoded and sanitized
pub fn filename_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.last()?;
    if segment.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    sanitize_filename(&decoded)
}

/// Keeps only the base name and drops characters unsafe in a flat directory
///
/// Returns None when nothing usable remains.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let base = trimmed.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            ':' | '*' | '?' | '<' | '>' | '|' | '"' => '_',
            other => other,
        })
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned)
    }
}

/// Appends `.pdf` to names without a non-empty extension
pub fn ensure_extension(name: String) -> String {
    if filename_extension(&name).is_some() {
        return name;
    }

    format!("{}.{}", name.trim_end_matches('.'), FALLBACK_EXTENSION)
}

/// Extension of a bare filename, if it has a non-empty stem and extension
pub fn filename_extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Maps a free-text type classification to an extension via keyword tokens
///
/// # Examples
///
/// ```
/// use via_harvest::crawler::type_keyword_extension;
///
/// assert_eq!(type_keyword_extension("Documento Word"), Some("docx"));
/// assert_eq!(type_keyword_extension("Elaborato grafico"), None);
/// ```
pub fn type_keyword_extension(doc_type: &str) -> Option<&'static str> {
    let lowered = doc_type.to_lowercase();
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    TYPE_KEYWORDS
        .iter()
        .find(|(keyword, _)| tokens.contains(keyword))
        .map(|(_, ext)| *ext)
}

/// Maps a Content-Type header value to an extension
pub fn content_type_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    CONTENT_TYPES
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// Infers a document extension from listing data alone
///
/// URL suffix in the allowlist, then the type keyword table, then `pdf`.
pub fn infer_extension(url: &str, doc_type: &str, allowlist: &[String]) -> String {
    if let Some(ext) = path_extension(url) {
        if allowlist.iter().any(|allowed| *allowed == ext) {
            return ext;
        }
    }

    type_keyword_extension(doc_type)
        .unwrap_or(FALLBACK_EXTENSION)
        .to_string()
}

/// Merges listing metadata with optional response hints
///
/// Listing-derived values win; response hints only fill sentinels. The
/// extension follows: URL allowlist, declared filename (allowlisted),
/// type keyword, Content-Type, then `pdf`. Never fails.
pub fn resolve_metadata(
    doc: &DocumentRef,
    hints: Option<&ResponseHints>,
    allowlist: &[String],
) -> DocumentRef {
    let mut resolved = doc.clone();

    let url_ext = path_extension(&doc.url).filter(|ext| allowlist.contains(ext));

    let Some(hints) = hints else {
        resolved.extension = infer_extension(&doc.url, &doc.doc_type, allowlist);
        return resolved;
    };

    if resolved.size == NOT_AVAILABLE {
        if let Some(length) = hints.content_length {
            resolved.size = format_size(length);
        }
    }

    let mime_ext = hints.content_type.as_deref().and_then(content_type_extension);

    if resolved.doc_type == DEFAULT_DOCUMENT_TYPE {
        if let Some(ext) = mime_ext {
            resolved.doc_type = ext.to_uppercase();
        }
    }

    let declared_ext = hints
        .content_disposition
        .as_deref()
        .and_then(filename_from_content_disposition)
        .and_then(|name| filename_extension(&name).map(|e| e.to_lowercase()))
        .filter(|ext| allowlist.contains(ext));

    resolved.extension = url_ext
        .or(declared_ext)
        .or_else(|| type_keyword_extension(&doc.doc_type).map(str::to_string))
        .or_else(|| mime_ext.map(str::to_string))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    resolved
}

/// Human-readable byte count, e.g. `1.5 MB`
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.1} {}", value, UNITS[unit])
}
