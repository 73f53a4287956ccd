//! Search backends.
//!
//! Both DuckDuckGo frontends serve JavaScript-free HTML that can be scraped
//! with CSS selectors; each backend only returns result URLs.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::errors::SearchError;
use crate::http::{build_client, PAGE_TIMEOUT};

/// A web search backend returning result URLs in rank order
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError>;
}

/// Unwrap DuckDuckGo's `//duckduckgo.com/l/?uddg=<target>` redirect links.
pub(crate) fn extract_result_url(href: &str) -> Option<String> {
    let full_href = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&full_href).ok()?;
    let is_redirect = parsed
        .host_str()
        .map(|host| host.ends_with("duckduckgo.com"))
        .unwrap_or(false)
        && parsed.path().starts_with("/l/");

    if is_redirect {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else if matches!(parsed.scheme(), "http" | "https") {
        Some(full_href)
    } else {
        None
    }
}

fn parse_links(html: &str, selector: &str) -> Result<Vec<String>, SearchError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector)
        .map_err(|e| SearchError::Parse(format!("invalid selector: {e:?}")))?;

    Ok(document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(extract_result_url)
        .collect())
}

/// Parse result links out of the DuckDuckGo HTML frontend
pub(crate) fn parse_duckduckgo_html(html: &str) -> Result<Vec<String>, SearchError> {
    parse_links(html, "a.result__a")
}

/// Parse result links out of the DuckDuckGo Lite frontend
pub(crate) fn parse_duckduckgo_lite(html: &str) -> Result<Vec<String>, SearchError> {
    parse_links(html, "a.result-link")
}

async fn post_query(client: &Client, endpoint: &str, query: &str) -> Result<String, SearchError> {
    let response = client
        .post(endpoint)
        .form(&[("q", query)])
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?)
}

/// `html.duckduckgo.com` backend
pub struct DuckDuckGoHtml {
    endpoint: String,
    client: Client,
}

impl DuckDuckGoHtml {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: build_client(PAGE_TIMEOUT),
        }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoHtml {
    fn name(&self) -> &str {
        "duckduckgo-html"
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        tracing::trace!(query, "DuckDuckGo HTML search");
        let html = post_query(&self.client, &self.endpoint, query).await?;
        let urls = parse_duckduckgo_html(&html)?;
        tracing::debug!(count = urls.len(), "DuckDuckGo HTML results parsed");
        Ok(urls)
    }
}

/// `lite.duckduckgo.com` backend
pub struct DuckDuckGoLite {
    endpoint: String,
    client: Client,
}

impl DuckDuckGoLite {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: build_client(PAGE_TIMEOUT),
        }
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoLite {
    fn name(&self) -> &str {
        "duckduckgo-lite"
    }

    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        tracing::trace!(query, "DuckDuckGo Lite search");
        let html = post_query(&self.client, &self.endpoint, query).await?;
        let urls = parse_duckduckgo_lite(&html)?;
        tracing::debug!(count = urls.len(), "DuckDuckGo Lite results parsed");
        Ok(urls)
    }
}
