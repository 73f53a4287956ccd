//! Wikipedia lookup through the MediaWiki action API.

use reqwest::Client;
use serde_json::Value;

use crate::errors::SearchError;
use crate::http::{build_client, PAGE_TIMEOUT};

/// Plain-text extract of an encyclopedia article
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub extract: String,
}

pub struct WikipediaClient {
    base_url: String,
    client: Client,
}

impl WikipediaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(PAGE_TIMEOUT),
        }
    }

    fn api_url(&self) -> String {
        format!("{}/w/api.php", self.base_url)
    }

    /// Search for `query` and return the plain-text extract of the best hit
    pub async fn lookup(&self, query: &str) -> Result<Option<Article>, SearchError> {
        let search: Value = self
            .client
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(title) = search
            .pointer("/query/search/0/title")
            .and_then(Value::as_str)
            .map(str::to_string)
        else {
            return Ok(None);
        };

        let pages: Value = self
            .client
            .get(self.api_url())
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let extract = pages
            .pointer("/query/pages")
            .and_then(Value::as_object)
            .and_then(|pages| {
                pages
                    .values()
                    .find_map(|page| page.get("extract").and_then(Value::as_str))
            })
            .ok_or_else(|| SearchError::Parse(format!("no extract for {title}")))?;

        Ok(Some(Article {
            url: format!("{}/wiki/{}", self.base_url, title.replace(' ', "_")),
            extract: extract.trim().to_string(),
            title,
        }))
    }
}
