//! Page fetching with a readability-proxy fallback.

use reqwest::Client;
use tracing::{debug, warn};

use crate::config::EvidenceLimits;
use crate::http::{build_client, normalize_url, PAGE_TIMEOUT};
use crate::text_processing::{html_to_text, sanitize_text, truncate_chars};

/// A downloaded page. Both fields are empty when nothing usable was found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedPage {
    pub html: String,
    pub text: String,
}

impl FetchedPage {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Downloads pages directly, falling back to a readability proxy that
/// renders JavaScript-heavy pages as plain text.
pub struct PageFetcher {
    client: Client,
    readability_proxy: String,
    min_chars: usize,
    readability_chars: usize,
}

impl PageFetcher {
    pub fn new(readability_proxy: impl Into<String>, limits: &EvidenceLimits) -> Self {
        Self {
            client: build_client(PAGE_TIMEOUT),
            readability_proxy: readability_proxy.into(),
            min_chars: limits.min_page_chars,
            readability_chars: limits.readability_chars,
        }
    }

    /// Fetch `url` and return its HTML and cleaned text.
    ///
    /// Never fails: every transport or status problem is logged and the
    /// method moves on to the next strategy, ending with an empty page.
    pub async fn fetch_page(&self, url: &str) -> FetchedPage {
        let url = normalize_url(url);

        let html = match self.fetch_direct(&url).await {
            Ok(html) => html,
            Err(e) => {
                debug!(url = %url, error = %e, "Direct fetch failed");
                String::new()
            }
        };
        let text = html_to_text(&html);
        if text.chars().count() >= self.min_chars {
            debug!(url = %url, chars = text.len(), "Fetched page directly");
            return FetchedPage { html, text };
        }

        match self.fetch_readable(&url).await {
            Ok(text) if text.chars().count() >= self.min_chars => {
                debug!(url = %url, chars = text.len(), "Fetched page through readability proxy");
                FetchedPage { html, text }
            }
            Ok(_) => {
                debug!(url = %url, "Readability proxy returned too little text");
                FetchedPage::default()
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Readability proxy failed");
                FetchedPage::default()
            }
        }
    }

    async fn fetch_direct(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    async fn fetch_readable(&self, url: &str) -> Result<String, reqwest::Error> {
        let body = self
            .client
            .get(format!("{}{}", self.readability_proxy, url))
            .header("Accept", "text/plain")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(truncate_chars(&sanitize_text(&body), self.readability_chars).to_string())
    }
}
