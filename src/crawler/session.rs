//! HTTP session manager
//!
//! A [`Session`] owns the connection context shared by every request in one
//! crawl run: the cookie jar, the browser-like default headers and the base
//! host. It performs no retries; any transport failure or non-2xx status is
//! returned to the caller as a typed [`HarvestError`].

use crate::config::{Config, HttpConfig};
use crate::crawler::throttle::HostThrottle;
use crate::{ConfigError, HarvestError};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, UPGRADE_INSECURE_REQUESTS,
};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use url::Url;

/// Per-request options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Request deadline
    pub timeout: Duration,
    /// When set, `timeout` only bounds the wait for response headers and the
    /// caller applies it again to every body read. Otherwise it covers the
    /// whole transfer.
    pub streaming: bool,
}

impl RequestOptions {
    /// Options for listing pages
    pub fn page(http: &HttpConfig) -> Self {
        Self {
            timeout: Duration::from_secs(http.request_timeout_secs),
            streaming: false,
        }
    }

    /// Options for document downloads
    ///
    /// The deadline is an idle limit: a large body that keeps arriving is
    /// never cut off, a stalled one is.
    pub fn download(http: &HttpConfig) -> Self {
        Self {
            timeout: Duration::from_secs(http.download_timeout_secs),
            streaming: true,
        }
    }
}

/// Persistent connection state for one crawl run
#[derive(Debug)]
pub struct Session {
    client: Client,
    base_url: Url,
    page_options: RequestOptions,
    throttle: HostThrottle,
}

/// Builds the default header set sent on every request
///
/// The registry may reject or alter responses for non-browser clients, so
/// the header set mimics a desktop browser.
pub fn default_headers(http: &HttpConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();

    headers.insert(ACCEPT, header_value("accept", &http.accept)?);
    headers.insert(
        ACCEPT_LANGUAGE,
        header_value("accept-language", &http.accept_language)?,
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value)
        .map_err(|e| ConfigError::Validation(format!("Invalid {} header value: {}", name, e)))
}

/// Builds an HTTP client with a cookie store and browser-like headers
pub fn build_http_client(http: &HttpConfig) -> Result<Client, HarvestError> {
    let headers = default_headers(http)?;

    let client = Client::builder()
        .user_agent(http.user_agent.clone())
        .default_headers(headers)
        .cookie_store(true)
        .connect_timeout(Duration::from_secs(http.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

impl Session {
    /// Builds a session without touching the network
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.http)?;
        let base_url = crate::url::base_url(&config.site)?;

        Ok(Self {
            client,
            base_url,
            page_options: RequestOptions::page(&config.http),
            throttle: HostThrottle::new(Duration::from_millis(config.crawler.request_delay_ms)),
        })
    }

    /// Opens a session: builds it, then performs one warm-up request to the
    /// base host so the cookie jar holds the site's baseline cookies
    ///
    /// A transport failure during warm-up is returned as an error. A non-2xx
    /// warm-up status is only logged; the crawl may still succeed.
    pub async fn open(config: &Config) -> Result<Self, HarvestError> {
        let session = Self::new(config)?;
        session.warm_up().await?;
        Ok(session)
    }

    async fn warm_up(&self) -> Result<(), HarvestError> {
        let url = self.base_url.as_str();
        tracing::debug!("Warming up session against {}", url);

        self.throttle.acquire().await;
        let response = self
            .client
            .get(url)
            .timeout(self.page_options.timeout)
            .send()
            .await
            .map_err(|e| HarvestError::from_request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Warm-up request to {} returned HTTP {}", url, status.as_u16());
        }

        Ok(())
    }

    /// The host all relative registry paths are joined against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Number of requests issued through this session so far
    pub fn request_count(&self) -> u64 {
        self.throttle.request_count()
    }

    /// Issues a GET through the shared cookie/header context
    ///
    /// The body is not read; callers may stream it with `Response::chunk`.
    ///
    /// # Returns
    ///
    /// * `Ok(Response)` - 2xx response, headers received
    /// * `Err(HarvestError::Timeout)` - deadline elapsed
    /// * `Err(HarvestError::HttpStatus)` - non-2xx status
    /// * `Err(HarvestError::Http)` - any other transport failure
    pub async fn get(&self, url: &str, options: RequestOptions) -> Result<Response, HarvestError> {
        self.throttle.acquire().await;
        tracing::debug!("GET {}", url);

        self.send(url, self.client.get(url), options).await
    }

    /// Issues a HEAD request, used by the metadata-only path
    pub async fn head(&self, url: &str, options: RequestOptions) -> Result<Response, HarvestError> {
        self.throttle.acquire().await;
        tracing::debug!("HEAD {}", url);

        self.send(url, self.client.head(url), options).await
    }

    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
        options: RequestOptions,
    ) -> Result<Response, HarvestError> {
        let response = if options.streaming {
            tokio::time::timeout(options.timeout, request.send())
                .await
                .map_err(|_| HarvestError::Timeout {
                    url: url.to_string(),
                })?
        } else {
            request.timeout(options.timeout).send().await
        }
        .map_err(|e| HarvestError::from_request(url, e))?;

        check_status(url, response)
    }

    /// Fetches a listing page and returns its body as text
    pub async fn get_text(&self, url: &str) -> Result<String, HarvestError> {
        let response = self.get(url, self.page_options).await?;
        response
            .text()
            .await
            .map_err(|e| HarvestError::from_request(url, e))
    }
}

fn check_status(url: &str, response: Response) -> Result<Response, HarvestError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(HarvestError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}
