//! Listing page fetcher
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests for numbered listing pages
//! - Polling a page until its ready marker appears
//! - Error classification for the retry layer
//!
//! One fetcher instance serves one in-flight page at a time; the worker
//! pool hands instances out so they are never shared between units.

use crate::config::{FetchConfig, SourceConfig, PAGE_PLACEHOLDER};
use crate::harvest::PageIndex;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use thiserror::Error;

/// User agent sent with every listing request
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Errors from a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request for page {page} failed: {source}")]
    Request {
        page: PageIndex,
        source: reqwest::Error,
    },

    #[error("Page {page} returned HTTP {status}")]
    Status { page: PageIndex, status: u16 },

    #[error("Page {page} never became ready within {waited_ms}ms")]
    LoadTimeout { page: PageIndex, waited_ms: u64 },
}

/// A fetched listing page, ready for extraction
#[derive(Debug, Clone)]
pub struct RawPage {
    /// The page number this markup came from
    pub page: PageIndex,

    /// Raw response body
    pub html: String,
}

/// Trait for page fetchers
///
/// A call is one attempt: implementations do not retry internally. The
/// worker layer owns the retry policy so attempt counting lives in one
/// place regardless of the fetcher behind it.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one listing page
    ///
    /// # Arguments
    ///
    /// * `page` - The page number to fetch
    ///
    /// # Returns
    ///
    /// * `Ok(RawPage)` - The page markup, confirmed ready
    /// * `Err(FetchError)` - This attempt failed; the caller may retry
    async fn fetch(&self, page: PageIndex) -> Result<RawPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `load_timeout` - Upper bound for any single request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(load_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(load_timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP fetcher for numbered listing pages
///
/// The site renders its listing into a known container element. A response
/// without that container is not treated as done: the fetcher keeps
/// re-requesting the page until the marker shows up or the load timeout
/// elapses, mirroring how a browser wait would behave.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    ready_marker: String,
    load_timeout: Duration,
    poll_interval: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from validated configuration
    ///
    /// # Arguments
    ///
    /// * `client` - The HTTP client to send requests with
    /// * `source` - Listing source settings (URL template, ready marker)
    /// * `fetch` - Fetch behavior settings (timeout, poll interval)
    pub fn new(client: Client, source: &SourceConfig, fetch: &FetchConfig) -> Self {
        Self {
            client,
            base_url: source.base_url.clone(),
            ready_marker: source.ready_marker.clone(),
            load_timeout: Duration::from_millis(fetch.load_timeout_ms),
            poll_interval: Duration::from_millis(fetch.poll_interval_ms),
        }
    }

    /// Builds the concrete URL for a page number
    fn page_url(&self, page: PageIndex) -> String {
        self.base_url
            .replace(PAGE_PLACEHOLDER, &page.to_string())
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, page: PageIndex) -> Result<RawPage, FetchError> {
        let url = self.page_url(page);
        let deadline = Instant::now() + self.load_timeout;

        loop {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|source| FetchError::Request { page, source })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    page,
                    status: status.as_u16(),
                });
            }

            let html = response
                .text()
                .await
                .map_err(|source| FetchError::Request { page, source })?;

            if body_is_ready(&html, &self.ready_marker) {
                return Ok(RawPage { page, html });
            }

            // Served, but the listing container is not there yet
            if Instant::now() + self.poll_interval >= deadline {
                return Err(FetchError::LoadTimeout {
                    page,
                    waited_ms: self.load_timeout.as_millis() as u64,
                });
            }

            tracing::debug!(
                "Page {} not ready yet, polling again in {}ms",
                page,
                self.poll_interval.as_millis()
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Checks whether the ready marker is present in the body
fn body_is_ready(html: &str, marker: &str) -> bool {
    let Ok(selector) = Selector::parse(marker) else {
        return false;
    };

    let document = Html::parse_document(html);
    document.select(&selector).next().is_some()
}
