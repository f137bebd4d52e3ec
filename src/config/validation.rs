use crate::config::types::{Config, CrawlerConfig, HttpConfig, OutputConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_http_config(&config.http)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the target site layout
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            base.scheme()
        )));
    }

    if base.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            config.base_url
        )));
    }

    for (name, value) in [
        ("search_path", &config.search_path),
        ("metadata_path", &config.metadata_path),
        ("project_marker", &config.project_marker),
        ("procedure_marker", &config.procedure_marker),
        ("document_marker", &config.document_marker),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    for ext in &config.document_extensions {
        validate_extension(ext)?;
    }

    Ok(())
}

/// Validates request headers and timeouts
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    for (name, secs) in [
        ("request_timeout_secs", config.request_timeout_secs),
        ("download_timeout_secs", config.download_timeout_secs),
        ("connect_timeout_secs", config.connect_timeout_secs),
    ] {
        if secs < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got {}",
                name, secs
            )));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_delay_ms < 100 || config.request_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "request_delay_ms must be between 100 and 60000, got {}ms",
            config.request_delay_ms
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_projects == Some(0) {
        return Err(ConfigError::Validation(
            "max_projects must be >= 1 when set".to_string(),
        ));
    }

    if config.search_page_param.is_empty() || config.procedure_page_param.is_empty() {
        return Err(ConfigError::Validation(
            "pagination parameter names cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.download_dir.is_empty() {
        return Err(ConfigError::Validation(
            "download_dir cannot be empty".to_string(),
        ));
    }

    if matches!(&config.report_path, Some(path) if path.is_empty()) {
        return Err(ConfigError::Validation(
            "report_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Extensions are matched case-sensitively against lowercased paths
fn validate_extension(ext: &str) -> Result<(), ConfigError> {
    if ext.is_empty() {
        return Err(ConfigError::Validation(
            "document extension cannot be empty".to_string(),
        ));
    }

    if !ext
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(ConfigError::Validation(format!(
            "document extension '{}' must be lowercase alphanumeric without a dot",
            ext
        )));
    }

    Ok(())
}
