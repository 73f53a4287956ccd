//! End-to-end web evidence gathering for one product.

use async_trait::async_trait;
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::{debug, info, warn};
use url::Url;

use super::{
    DuckDuckGoHtml, DuckDuckGoLite, EvidenceBundle, EvidenceSource, PageFetcher, SearchBackend,
    WikipediaClient,
};
use crate::config::{Endpoints, EvidenceLimits};
use crate::text_processing::{alnum_lower, collapse_whitespace, levenshtein, truncate_chars};

/// Sub-paths tried on the official host, home page first
pub const OFFICIAL_PATHS: &[&str] = &[
    "",
    "/pricing",
    "/plans",
    "/premium",
    "/features",
    "/faq",
    "/subscribe",
    "/membership",
];

/// Search query used for a product
pub fn build_query(product_name: &str, plan: &str) -> String {
    collapse_whitespace(&format!(
        "{product_name} {plan} price features premium plan"
    ))
}

/// Two-label public suffixes common among product sites
const TWO_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "com.au", "net.au", "co.in", "net.in", "org.in", "co.jp", "co.nz",
    "co.za", "com.br", "com.mx", "com.sg", "com.tr",
];

/// Registrable domain of a host: its public suffix plus one label.
///
/// `help.netflix.com` becomes `netflix.com`, `shop.bbc.co.uk` becomes
/// `bbc.co.uk`. IP addresses are returned unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }
    let labels: Vec<&str> = host.split('.').filter(|label| !label.is_empty()).collect();
    let suffix_labels = if labels.len() >= 3
        && TWO_LABEL_SUFFIXES.contains(&labels[labels.len() - 2..].join(".").as_str())
    {
        2
    } else {
        1
    };
    let keep = (suffix_labels + 1).min(labels.len());
    labels[labels.len() - keep..].join(".")
}

/// Registrable domain of a URL's host
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    Some(registrable_domain(parsed.host_str()?))
}

/// Edit distance between the product name and the registrable label of
/// the host (`netflix` in `help.netflix.com`).
fn host_distance(name: &str, host: &str) -> Option<usize> {
    if host.parse::<IpAddr>().is_ok() {
        return None;
    }
    let domain = registrable_domain(host);
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    let label = alnum_lower(labels[0]);
    if label.is_empty() {
        return None;
    }
    Some(levenshtein(name, &label))
}

/// Choose the registrable domain that most resembles the product name.
///
/// Hosts are reduced to their registrable domain first. Minimum distance
/// wins, the first host encountered breaks ties, and the winner is only
/// accepted within `max_distance`.
pub fn pick_official_host(product_name: &str, hosts: &[String], max_distance: usize) -> Option<String> {
    let name = alnum_lower(product_name);
    if name.is_empty() {
        return None;
    }

    let mut best: Option<(usize, String)> = None;
    for host in hosts {
        let Some(distance) = host_distance(&name, host) else {
            continue;
        };
        if best.as_ref().map(|(d, _)| distance < *d).unwrap_or(true) {
            best = Some((distance, registrable_domain(host)));
        }
    }

    best.filter(|(distance, _)| *distance <= max_distance)
        .map(|(_, host)| host)
}

/// Home page and well-known sub-pages of an official host
pub fn official_candidates(host: &str) -> Vec<String> {
    OFFICIAL_PATHS
        .iter()
        .map(|path| format!("https://{host}{path}"))
        .collect()
}

/// Keep first occurrences only, by exact string equality
fn push_unique(target: &mut Vec<String>, seen: &mut HashSet<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if seen.insert(item.clone()) {
            target.push(item);
        }
    }
}

/// Web search + scrape + encyclopedia pipeline
pub struct WebSearchAggregator {
    backends: Vec<Box<dyn SearchBackend>>,
    fetcher: PageFetcher,
    wikipedia: WikipediaClient,
    limits: EvidenceLimits,
}

impl WebSearchAggregator {
    /// Aggregator over both DuckDuckGo frontends and Wikipedia
    pub fn new(endpoints: &Endpoints, limits: EvidenceLimits) -> Self {
        Self::with_parts(
            vec![
                Box::new(DuckDuckGoHtml::new(&endpoints.duckduckgo_html)),
                Box::new(DuckDuckGoLite::new(&endpoints.duckduckgo_lite)),
            ],
            PageFetcher::new(&endpoints.readability_proxy, &limits),
            WikipediaClient::new(&endpoints.wikipedia),
            limits,
        )
    }

    pub fn with_parts(
        backends: Vec<Box<dyn SearchBackend>>,
        fetcher: PageFetcher,
        wikipedia: WikipediaClient,
        limits: EvidenceLimits,
    ) -> Self {
        Self {
            backends,
            fetcher,
            wikipedia,
            limits,
        }
    }

    async fn collect_results(&self, query: &str) -> Vec<String> {
        let mut results = Vec::new();
        let mut seen = HashSet::new();
        for backend in &self.backends {
            match backend.search(query).await {
                Ok(urls) => {
                    debug!(backend = backend.name(), count = urls.len(), "Search backend answered");
                    push_unique(&mut results, &mut seen, urls);
                }
                Err(e) => warn!(backend = backend.name(), error = %e, "Search backend failed"),
            }
        }
        results
    }

    /// Ordered fetch list: official candidates first, then search results
    fn candidate_urls(&self, product_name: &str, results: Vec<String>) -> Vec<String> {
        let mut hosts = Vec::new();
        let mut seen_hosts = HashSet::new();
        push_unique(&mut hosts, &mut seen_hosts, results.iter().filter_map(|u| host_of(u)));

        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        match pick_official_host(product_name, &hosts, self.limits.official_max_distance) {
            Some(host) => {
                info!(host = %host, "Official host guessed");
                push_unique(&mut candidates, &mut seen, official_candidates(&host));
            }
            None => debug!(product = product_name, "No official host within distance"),
        }
        push_unique(&mut candidates, &mut seen, results);
        candidates.truncate(self.limits.max_pages);
        candidates
    }

    async fn append_encyclopedia(&self, product_name: &str, bundle: &mut EvidenceBundle) {
        match self.wikipedia.lookup(product_name).await {
            Ok(Some(article)) if article.extract.chars().count() >= self.limits.encyclopedia_min_chars => {
                debug!(title = %article.title, "Appending encyclopedia extract");
                let text = truncate_chars(&article.extract, self.limits.page_chars).to_string();
                bundle.push(article.url, text);
            }
            Ok(_) => debug!(product = product_name, "Encyclopedia had nothing useful"),
            Err(e) => warn!(error = %e, "Encyclopedia lookup failed"),
        }
    }

    /// Build the evidence bundle for a product.
    ///
    /// Best-effort throughout: failing backends and pages are skipped and
    /// the result may be empty. The output never exceeds
    /// `limits.bundle_chars` characters.
    pub async fn search_web_for_product(&self, product_name: &str, plan: &str) -> String {
        let query = build_query(product_name, plan);
        info!(query = %query, "Searching the web for evidence");

        let results = self.collect_results(&query).await;
        let candidates = self.candidate_urls(product_name, results);

        let mut bundle = EvidenceBundle::default();
        for url in &candidates {
            let page = self.fetcher.fetch_page(url).await;
            if page.text.chars().count() > self.limits.min_page_chars {
                bundle.push(url.clone(), truncate_chars(&page.text, self.limits.page_chars));
            }
        }

        if bundle.combined_chars() < self.limits.thin_bundle_chars && !product_name.trim().is_empty() {
            self.append_encyclopedia(product_name, &mut bundle).await;
        }

        let combined = bundle.combined_text();
        let capped = truncate_chars(&combined, self.limits.bundle_chars).to_string();
        info!(
            sources = bundle.source_chunks.len(),
            chars = capped.chars().count(),
            "Evidence gathered"
        );
        capped
    }
}

#[async_trait]
impl EvidenceSource for WebSearchAggregator {
    async fn search_web_for_product(&self, product_name: &str, plan: &str) -> String {
        WebSearchAggregator::search_web_for_product(self, product_name, plan).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_query_shape() {
        assert_eq!(
            build_query("Netflix", "Premium"),
            "Netflix Premium price features premium plan"
        );
        assert_eq!(build_query("Canva", ""), "Canva price features premium plan");
    }

    #[test]
    fn test_host_of_reduces_to_registrable_domain() {
        assert_eq!(host_of("https://www.Netflix.com/in/").as_deref(), Some("netflix.com"));
        assert_eq!(host_of("https://help.netflix.com/node/1").as_deref(), Some("netflix.com"));
        assert_eq!(host_of("https://shop.bbc.co.uk/a").as_deref(), Some("bbc.co.uk"));
        assert_eq!(host_of("http://127.0.0.1:8080/x").as_deref(), Some("127.0.0.1"));
        assert_eq!(host_of("https://localhost/").as_deref(), Some("localhost"));
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn test_subdomain_listed_first_still_picks_main_site() {
        let candidates = hosts(&["help.netflix.com", "netflix.com"]);
        assert_eq!(
            pick_official_host("Netflix", &candidates, 3).as_deref(),
            Some("netflix.com")
        );
        assert_eq!(
            pick_official_host("Netflix", &hosts(&["help.netflix.com"]), 3).as_deref(),
            Some("netflix.com")
        );
    }

    #[test]
    fn test_short_name_ignores_subdomain_labels() {
        let candidates = hosts(&["en.wikipedia.org", "www2.reddit.com", "help.youtube.com"]);
        assert_eq!(pick_official_host("Max", &candidates, 3), None);

        let candidates = hosts(&["en.wikipedia.org", "play.max.com"]);
        assert_eq!(pick_official_host("Max", &candidates, 3).as_deref(), Some("max.com"));
    }

    #[test]
    fn test_candidates_target_registrable_host() {
        let aggregator = WebSearchAggregator::with_parts(
            Vec::new(),
            PageFetcher::new("http://127.0.0.1:9/", &EvidenceLimits::default()),
            WikipediaClient::new("http://127.0.0.1:9"),
            EvidenceLimits::default(),
        );
        let urls = aggregator.candidate_urls(
            "Netflix",
            vec![
                "https://help.netflix.com/node/1".to_string(),
                "https://www.netflix.com/in/".to_string(),
            ],
        );
        assert_eq!(urls[0], "https://netflix.com");
        assert_eq!(urls[1], "https://netflix.com/pricing");
        assert!(urls.iter().all(|url| !url.starts_with("https://help.netflix.com/pricing")));
        assert!(urls.contains(&"https://help.netflix.com/node/1".to_string()));
    }

    #[test]
    fn test_official_host_for_netflix() {
        let candidates = hosts(&["en.wikipedia.org", "netflix.com", "help.netflix.com", "reddit.com"]);
        assert_eq!(
            pick_official_host("Netflix", &candidates, 3).as_deref(),
            Some("netflix.com")
        );
    }

    #[test]
    fn test_official_host_rejected_when_too_far() {
        let candidates = hosts(&["reddit.com", "quora.com"]);
        assert_eq!(pick_official_host("Crunchyroll", &candidates, 3), None);
        assert_eq!(pick_official_host("", &candidates, 3), None);
    }

    #[test]
    fn test_first_host_breaks_ties() {
        let candidates = hosts(&["canva.com", "canva.net"]);
        assert_eq!(pick_official_host("Canva", &candidates, 3).as_deref(), Some("canva.com"));
    }

    #[test]
    fn test_official_candidates() {
        let urls = official_candidates("spotify.com");
        assert_eq!(urls.len(), OFFICIAL_PATHS.len());
        assert_eq!(urls[0], "https://spotify.com");
        assert_eq!(urls[1], "https://spotify.com/pricing");
    }
}
