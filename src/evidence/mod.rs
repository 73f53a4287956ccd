//! # Evidence Module
//!
//! Gathers free-text evidence about a product from the web so the text
//! providers can ground their answers.
//!
//! - `fetcher`: single page download with a readability-proxy fallback
//! - `search`: search backends returning result URLs
//! - `wiki`: encyclopedia lookup used when the web yields too little
//! - `aggregator`: the end-to-end `search_web_for_product` pipeline

pub mod aggregator;
pub mod fetcher;
pub mod search;
pub mod wiki;

use async_trait::async_trait;

pub use aggregator::WebSearchAggregator;
pub use fetcher::{FetchedPage, PageFetcher};
pub use search::{DuckDuckGoHtml, DuckDuckGoLite, SearchBackend};
pub use wiki::WikipediaClient;

/// Anything able to produce an evidence bundle for a product.
///
/// Implementations are best-effort and never fail: an empty string means
/// nothing useful was found.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn search_web_for_product(&self, product_name: &str, plan: &str) -> String;
}

/// One fetched source and its cleaned text
#[derive(Debug, Clone, PartialEq)]
pub struct SourceChunk {
    pub url: String,
    pub text: String,
}

/// Evidence collected during one enrichment call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceBundle {
    pub source_chunks: Vec<SourceChunk>,
}

impl EvidenceBundle {
    pub fn push(&mut self, url: impl Into<String>, text: impl Into<String>) {
        self.source_chunks.push(SourceChunk {
            url: url.into(),
            text: text.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.source_chunks.is_empty()
    }

    /// Every chunk rendered as a `SOURCE: <url>` block, joined by blank lines
    pub fn combined_text(&self) -> String {
        self.source_chunks
            .iter()
            .map(|chunk| format!("SOURCE: {}\n{}", chunk.url, chunk.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Length in characters of [`EvidenceBundle::combined_text`]
    pub fn combined_chars(&self) -> usize {
        self.combined_text().chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_text_blocks() {
        let mut bundle = EvidenceBundle::default();
        assert!(bundle.is_empty());
        bundle.push("https://a.example", "alpha");
        bundle.push("https://b.example", "beta");
        assert_eq!(
            bundle.combined_text(),
            "SOURCE: https://a.example\nalpha\n\nSOURCE: https://b.example\nbeta"
        );
        assert_eq!(bundle.combined_chars(), bundle.combined_text().len());
    }
}
